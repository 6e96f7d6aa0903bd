use std::path::PathBuf;

use anyhow::{Result, anyhow};

use footlens::config;
use footlens::sample_data::{self, SampleSpec};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let out = config::parse_named_arg(&args, "out")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(sample_data::DEFAULT_SAMPLE_FILE));
    let force = config::has_flag(&args, "force");
    let seed = parse_num(&args, "seed")?.unwrap_or(2024);

    let mut spec = SampleSpec::default();
    if let Some(teams) = parse_num(&args, "teams")? {
        spec.teams = usize::try_from(teams)?.clamp(1, 20);
    }
    if let Some(days) = parse_num(&args, "days")? {
        spec.match_days = usize::try_from(days)?.clamp(1, 200);
    }

    let rows = sample_data::generate(&spec, seed);
    sample_data::write_csv(&out, &rows, force)?;
    log::info!("wrote {} rows for {} teams to {}", rows.len(), spec.teams, out.display());
    println!("{}", out.display());
    Ok(())
}

fn parse_num(args: &[String], name: &str) -> Result<Option<u64>> {
    match config::parse_named_arg(args, name) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| anyhow!("--{name} expects a whole number, got {raw:?}")),
        None => Ok(None),
    }
}
