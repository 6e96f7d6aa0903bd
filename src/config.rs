use std::env;
use std::path::PathBuf;

use crate::dashboard::DashboardParams;
use crate::impact::{DEFAULT_TOP_K, DEFAULT_WINDOW_DAYS};

pub const DEFAULT_DATA_FILE: &str = "player_injuries_impact.csv";

const ENV_DATA: &str = "FOOTLENS_DATA";
const ENV_WINDOW_DAYS: &str = "FOOTLENS_WINDOW_DAYS";
const ENV_TOP_K: &str = "FOOTLENS_TOP_K";

/// Flags whose value may follow as a separate argument.
const VALUE_FLAGS: [&str; 2] = ["--data", "--xlsx"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub data_path: PathBuf,
    pub window_days: u32,
    pub top_k: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_FILE),
            window_days: DEFAULT_WINDOW_DAYS,
            top_k: DEFAULT_TOP_K,
        }
    }
}

impl Settings {
    /// `.env.local` and `.env` first, then process environment, then argv.
    pub fn load() -> Self {
        let _ = dotenvy::from_filename(".env.local");
        let _ = dotenvy::from_filename(".env");
        let args = env::args().skip(1).collect::<Vec<_>>();
        Self::resolve(|key| env::var(key).ok(), &args)
    }

    pub fn resolve(lookup: impl Fn(&str) -> Option<String>, args: &[String]) -> Self {
        let mut settings = Settings::default();
        if let Some(path) = lookup(ENV_DATA).filter(|s| !s.trim().is_empty()) {
            settings.data_path = PathBuf::from(path.trim());
        }
        if let Some(days) = lookup(ENV_WINDOW_DAYS).and_then(|v| v.trim().parse::<u32>().ok()) {
            settings.window_days = clamp_window_days(days);
        }
        if let Some(k) = lookup(ENV_TOP_K).and_then(|v| v.trim().parse::<usize>().ok()) {
            settings.top_k = clamp_top_k(k);
        }
        if let Some(path) = parse_data_arg(args) {
            settings.data_path = path;
        }
        settings
    }

    pub fn params(&self) -> DashboardParams {
        DashboardParams {
            window_days: self.window_days,
            top_k: self.top_k,
        }
    }
}

pub fn clamp_window_days(days: u32) -> u32 {
    days.clamp(1, 365)
}

pub fn clamp_top_k(k: usize) -> usize {
    k.clamp(1, 50)
}

/// `--data=PATH`, `--data PATH`, or the first bare positional argument.
pub fn parse_data_arg(args: &[String]) -> Option<PathBuf> {
    for (idx, arg) in args.iter().enumerate() {
        if let Some(path) = arg.strip_prefix("--data=") {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
        if arg == "--data" {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(PathBuf::from(next));
            }
        }
    }
    let mut skip_next = false;
    for arg in args {
        if skip_next {
            skip_next = false;
            continue;
        }
        if VALUE_FLAGS.contains(&arg.as_str()) {
            skip_next = true;
            continue;
        }
        if !arg.starts_with('-') && !arg.trim().is_empty() {
            return Some(PathBuf::from(arg));
        }
    }
    None
}

/// Value of `--name=VALUE` or `--name VALUE`.
pub fn parse_named_arg(args: &[String], name: &str) -> Option<String> {
    let prefix = format!("--{name}=");
    let flag = format!("--{name}");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            return Some(value.trim().to_string()).filter(|v| !v.is_empty());
        }
        if *arg == flag {
            return args.get(idx + 1).cloned();
        }
    }
    None
}

pub fn has_flag(args: &[String], name: &str) -> bool {
    let flag = format!("--{name}");
    args.iter().any(|a| *a == flag)
}
