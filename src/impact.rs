use std::collections::{HashMap, HashSet};

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::dataset::{Dataset, Field, Observation};
use crate::phase::InjuryWindow;

pub const DEFAULT_WINDOW_DAYS: u32 = 30;
pub const DEFAULT_TOP_K: usize = 10;

pub const REQUIRED_FIELDS: [Field; 4] = [
    Field::InjuryStart,
    Field::InjuryEnd,
    Field::GoalsFor,
    Field::GoalsAgainst,
];

pub const RATING_COLUMN_FIELDS: [Field; 2] = [Field::RatingBeforeInjury, Field::RatingAfterInjury];

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InjuryEvent {
    pub player: String,
    pub team: String,
    pub window: InjuryWindow,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InjuryImpactRecord {
    pub player: String,
    pub team: String,
    pub injury_start: NaiveDate,
    pub injury_end: NaiveDate,
    pub before_perf: f64,
    pub during_perf: f64,
    pub performance_drop_index: f64,
    pub matches_before: usize,
    pub matches_during: usize,
}

/// Single-column before/after rating comparison. A simplified stand-in for sources that
/// carry per-injury rating summaries instead of a match schedule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingColumnDrop {
    pub player: String,
    pub team: String,
    pub injury_start: Option<NaiveDate>,
    pub rating_before: f64,
    pub rating_after: f64,
    pub rating_drop: f64,
}

/// Distinct injury events with both bounds present, in order of first appearance.
pub fn injury_events<'a, I>(observations: I) -> Vec<InjuryEvent>
where
    I: IntoIterator<Item = &'a Observation>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for obs in observations {
        let Some(window) = InjuryWindow::new(obs.injury_start, obs.injury_end) else {
            continue;
        };
        let event = InjuryEvent {
            player: obs.player.clone(),
            team: obs.team.clone(),
            window,
        };
        if seen.insert(event.clone()) {
            out.push(event);
        }
    }
    out
}

/// Team goal difference in the trailing window before each injury versus during it.
///
/// Always runs over the whole dataset: the drop index measures a team's full schedule,
/// so callers cannot hand it a filtered view.
pub fn compute_impacts(dataset: &Dataset, window_days: u32) -> Vec<InjuryImpactRecord> {
    let schedules = team_schedules(dataset.observations());
    let mut out = Vec::new();

    for event in injury_events(dataset.observations()) {
        let Some(schedule) = schedules.get(event.team.as_str()) else {
            continue;
        };
        let start = event.window.start;
        let end = event.window.end;
        let window_start = start
            .checked_sub_days(Days::new(u64::from(window_days)))
            .unwrap_or(NaiveDate::MIN);

        let before = slice_between(schedule, |d| d < window_start, |d| d < start);
        let during = slice_between(schedule, |d| d < start, |d| d <= end);

        let (Some(before_perf), Some(during_perf)) = (mean_diff(before), mean_diff(during)) else {
            continue;
        };

        out.push(InjuryImpactRecord {
            player: event.player,
            team: event.team,
            injury_start: start,
            injury_end: end,
            before_perf,
            during_perf,
            performance_drop_index: before_perf - during_perf,
            matches_before: before.len(),
            matches_during: during.len(),
        });
    }

    out
}

/// Largest drop first. Stable, so equal indices keep event order.
pub fn rank_by_drop(records: &mut [InjuryImpactRecord]) {
    records.sort_by(|a, b| b.performance_drop_index.total_cmp(&a.performance_drop_index));
}

pub fn top_impacts(dataset: &Dataset, window_days: u32, k: usize) -> Vec<InjuryImpactRecord> {
    let mut records = compute_impacts(dataset, window_days);
    rank_by_drop(&mut records);
    records.truncate(k);
    records
}

pub fn rating_column_drops(dataset: &Dataset) -> Vec<RatingColumnDrop> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for obs in dataset.iter() {
        let (Some(rating_before), Some(rating_after)) =
            (obs.rating_before_injury, obs.rating_after_injury)
        else {
            continue;
        };
        let key = (
            obs.player.as_str(),
            obs.team.as_str(),
            obs.injury_start,
            obs.injury_end,
        );
        if !seen.insert(key) {
            continue;
        }
        out.push(RatingColumnDrop {
            player: obs.player.clone(),
            team: obs.team.clone(),
            injury_start: obs.injury_start,
            rating_before,
            rating_after,
            rating_drop: rating_before - rating_after,
        });
    }
    out.sort_by(|a, b| b.rating_drop.total_cmp(&a.rating_drop));
    out
}

type Schedule = Vec<(NaiveDate, i32)>;

fn team_schedules(observations: &[Observation]) -> HashMap<&str, Schedule> {
    let mut out: HashMap<&str, Schedule> = HashMap::new();
    for obs in observations {
        let Some(diff) = obs.goal_diff else { continue };
        out.entry(obs.team.as_str())
            .or_default()
            .push((obs.match_date, diff));
    }
    for schedule in out.values_mut() {
        schedule.sort_by_key(|(date, _)| *date);
    }
    out
}

fn slice_between(
    schedule: &[(NaiveDate, i32)],
    below_lo: impl Fn(NaiveDate) -> bool,
    below_hi: impl Fn(NaiveDate) -> bool,
) -> &[(NaiveDate, i32)] {
    let lo = schedule.partition_point(|(d, _)| below_lo(*d));
    let hi = schedule.partition_point(|(d, _)| below_hi(*d));
    if hi <= lo { &[] } else { &schedule[lo..hi] }
}

fn mean_diff(rows: &[(NaiveDate, i32)]) -> Option<f64> {
    if rows.is_empty() {
        return None;
    }
    let sum: i64 = rows.iter().map(|(_, diff)| i64::from(*diff)).sum();
    Some(sum as f64 / rows.len() as f64)
}
