use std::fs::OpenOptions;
use std::io;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{Datelike, Days, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

/// Where `gen_sample` writes unless told otherwise. Kept apart from the dashboard's data file.
pub const DEFAULT_SAMPLE_FILE: &str = "sample_injuries.csv";

const CLUBS: [&str; 8] = [
    "Arsenal",
    "Chelsea",
    "Liverpool",
    "Everton",
    "Fulham",
    "Brentford",
    "Wolves",
    "Burnley",
];

const SURNAMES: [&str; 12] = [
    "Smith", "Silva", "Moreno", "Okafor", "Larsen", "Kovac", "Dubois", "Rossi", "Tanaka", "Walker",
    "Mensah", "Novak",
];

const INJURIES: [&str; 5] = ["Hamstring", "Ankle", "Knee", "Groin", "Calf"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleSpec {
    pub teams: usize,
    pub players_per_team: usize,
    pub match_days: usize,
    pub first_match: NaiveDate,
    pub days_between: u64,
    /// Chance that a given player has one injury in the generated span.
    pub injury_rate: f64,
}

impl Default for SampleSpec {
    fn default() -> Self {
        Self {
            teams: 4,
            players_per_team: 6,
            match_days: 40,
            first_match: NaiveDate::from_ymd_opt(2023, 8, 12).unwrap_or_default(),
            days_between: 7,
            injury_rate: 0.4,
        }
    }
}

/// One row in the same shape the loader reads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleRow {
    pub player_name: String,
    pub club: String,
    pub season: String,
    pub match_date: NaiveDate,
    pub goals_for: u32,
    pub goals_against: u32,
    pub rating: f64,
    pub age: u32,
    pub injury: Option<&'static str>,
    pub injury_start: Option<NaiveDate>,
    pub injury_end: Option<NaiveDate>,
}

struct SamplePlayer {
    name: String,
    age: u32,
    base_rating: f64,
    injury: Option<(&'static str, NaiveDate, NaiveDate)>,
}

impl SamplePlayer {
    fn absent_on(&self, date: NaiveDate) -> bool {
        matches!(self.injury, Some((_, start, end)) if start <= date && date <= end)
    }

    fn returned_by(&self, date: NaiveDate) -> bool {
        matches!(self.injury, Some((_, _, end)) if date > end)
    }
}

/// Deterministic synthetic dataset. The same spec and seed always give the same rows.
pub fn generate(spec: &SampleSpec, seed: u64) -> Vec<SampleRow> {
    let mut rng = StdRng::seed_from_u64(seed);
    let span_days = spec.days_between * spec.match_days.saturating_sub(1) as u64;
    let dates: Vec<NaiveDate> = (0..spec.match_days as u64)
        .filter_map(|i| spec.first_match.checked_add_days(Days::new(i * spec.days_between)))
        .collect();

    let mut rows = Vec::new();
    for team_idx in 0..spec.teams {
        let club = club_name(team_idx);
        let squad: Vec<SamplePlayer> = (0..spec.players_per_team)
            .map(|p| {
                let injury = (span_days > 0 && rng.gen_bool(spec.injury_rate.clamp(0.0, 1.0)))
                    .then(|| {
                        let offset = rng.gen_range(0..span_days);
                        let length = rng.gen_range(7..60);
                        let start = spec.first_match.checked_add_days(Days::new(offset))?;
                        let end = start.checked_add_days(Days::new(length))?;
                        Some((INJURIES[rng.gen_range(0..INJURIES.len())], start, end))
                    })
                    .flatten();
                SamplePlayer {
                    name: format!("{} {}", SURNAMES[(team_idx * 5 + p) % SURNAMES.len()], p + 1),
                    age: rng.gen_range(18..36),
                    base_rating: rng.gen_range(5.8..7.6),
                    injury,
                }
            })
            .collect();

        for &date in &dates {
            let missing = squad.iter().filter(|p| p.absent_on(date)).count();
            let goals_for = rng.gen_range(0..4u32).saturating_sub(u32::from(missing > 0 && rng.gen_bool(0.5)));
            let goals_against = rng.gen_range(0..3u32) + u32::from(missing > 1);

            for player in &squad {
                if player.absent_on(date) {
                    continue;
                }
                let mut rating = player.base_rating + rng.gen_range(-0.8..0.8);
                if player.returned_by(date) {
                    rating -= rng.gen_range(-0.3..0.6);
                }
                let (injury, injury_start, injury_end) = match player.injury {
                    Some((label, start, end)) => (Some(label), Some(start), Some(end)),
                    None => (None, None, None),
                };
                rows.push(SampleRow {
                    player_name: player.name.clone(),
                    club: club.clone(),
                    season: season_of(date),
                    match_date: date,
                    goals_for,
                    goals_against,
                    rating: (rating.clamp(3.0, 10.0) * 10.0).round() / 10.0,
                    age: player.age,
                    injury,
                    injury_start,
                    injury_end,
                });
            }
        }
    }
    rows
}

fn club_name(idx: usize) -> String {
    match CLUBS.get(idx) {
        Some(name) => name.to_string(),
        None => format!("Club {}", idx + 1),
    }
}

/// European season label, August to July.
fn season_of(date: NaiveDate) -> String {
    let start = if date.month() >= 8 { date.year() } else { date.year() - 1 };
    format!("{}/{:02}", start, (start + 1) % 100)
}

/// Writes `rows` to `path`. An existing file is only replaced when `overwrite` is set.
pub fn write_csv(path: &Path, rows: &[SampleRow], overwrite: bool) -> Result<()> {
    let mut options = OpenOptions::new();
    options.write(true);
    if overwrite {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }
    let file = match options.open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            bail!("{} already exists; pass --force to overwrite it", path.display())
        }
        Err(e) => return Err(e).with_context(|| format!("create {}", path.display())),
    };
    let mut writer = csv::Writer::from_writer(file);
    for row in rows {
        writer.serialize(row).context("write sample row")?;
    }
    writer.flush().context("flush sample csv")?;
    Ok(())
}

pub fn to_csv_string(rows: &[SampleRow]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row).context("write sample row")?;
    }
    let bytes = writer.into_inner().context("finish sample csv")?;
    String::from_utf8(bytes).context("sample csv is not utf-8")
}
