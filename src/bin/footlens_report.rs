use std::path::PathBuf;

use anyhow::{Context, Result};

use footlens::config::{self, Settings};
use footlens::dashboard::{DashboardSnapshot, Panel};
use footlens::dataset;
use footlens::export::{self, ReportJson};
use footlens::filter::Selection;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = Settings::load();
    let args = std::env::args().skip(1).collect::<Vec<_>>();

    let ds = dataset::load_path(&settings.data_path)
        .with_context(|| format!("load {}", settings.data_path.display()))?;
    let snapshot = DashboardSnapshot::build(&ds, &Selection::default(), settings.params());

    if config::has_flag(&args, "json") {
        let report = ReportJson::new(&settings.data_path, ds.report(), &snapshot);
        println!("{}", report.to_pretty_json()?);
    } else {
        print_text(&settings, &ds, &snapshot);
    }

    if let Some(path) = config::parse_named_arg(&args, "xlsx") {
        let path = PathBuf::from(path);
        let report = export::export_snapshot_xlsx(&path, &snapshot)?;
        eprintln!(
            "Wrote {} (impact {}, comeback {}, heatmap {}, age vs drop {}, rating columns {})",
            path.display(),
            report.impact_rows,
            report.comeback_rows,
            report.heatmap_rows,
            report.age_vs_drop_rows,
            report.rating_column_rows
        );
    }

    Ok(())
}

fn print_text(settings: &Settings, ds: &dataset::Dataset, snapshot: &DashboardSnapshot) {
    let load = ds.report();
    println!("FootLens report");
    println!("Source: {}", settings.data_path.display());
    println!(
        "Rows: {} kept / {} read (dropped without date: {}, coercion losses: {})",
        load.rows_kept,
        load.rows_read,
        load.dropped_missing_date,
        load.total_coercion_losses()
    );
    println!("Window: {} days", settings.window_days);

    let k = &snapshot.kpis;
    println!(
        "KPIs: observations={} injuries={} matches={} avg_rating={} avg_goal_diff={}",
        k.observations,
        k.injury_count,
        k.match_count,
        k.avg_rating.map(|v| format!("{v:.2}")).unwrap_or_else(|| "n/a".to_string()),
        k.avg_goal_diff.map(|v| format!("{v:.2}")).unwrap_or_else(|| "n/a".to_string())
    );

    println!();
    match &snapshot.impacts {
        Panel::Ready(records) => {
            println!("Top {} performance drops:", records.len());
            for r in records {
                println!(
                    "  {:<20} {:<14} {} -> {}  before={:+.2} during={:+.2} drop={:+.2}",
                    r.player,
                    r.team,
                    r.injury_start,
                    r.injury_end,
                    r.before_perf,
                    r.during_perf,
                    r.performance_drop_index
                );
            }
        }
        Panel::Unavailable(why) => println!("{why}"),
    }

    println!();
    match &snapshot.comebacks {
        Panel::Ready(records) => {
            println!("Comeback leaderboard:");
            for (idx, r) in records.iter().enumerate() {
                println!(
                    "  {:>2}. {:<20} {:<14} {:.2} -> {:.2} ({:+.2})",
                    idx + 1,
                    r.player,
                    r.team,
                    r.rating_before,
                    r.rating_after,
                    r.rating_change
                );
            }
        }
        Panel::Unavailable(why) => println!("{why}"),
    }

    if let Some(points) = snapshot.age_vs_drop.ready() {
        println!();
        println!("Age vs drop:");
        for p in points {
            println!(
                "  {:>3.0}  {:<20} {:<14} drop={:+.2}",
                p.age, p.player, p.team, p.performance_drop_index
            );
        }
    }

    let notices = snapshot
        .notices()
        .into_iter()
        .filter(|n| !n.starts_with("Performance drop") && !n.starts_with("Comeback"))
        .collect::<Vec<_>>();
    if !notices.is_empty() {
        println!();
        for notice in notices {
            println!("note: {notice}");
        }
    }
}
