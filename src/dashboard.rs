use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDate;
use serde::Serialize;

use crate::comeback::{self, ComebackRecord};
use crate::dataset::{Capabilities, Dataset, Field, Observation};
use crate::error::{InsufficientData, Reason, View};
use crate::filter::{self, Selection};
use crate::impact::{self, InjuryImpactRecord, RatingColumnDrop};
use crate::phase::Phase;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DashboardParams {
    pub window_days: u32,
    pub top_k: usize,
}

impl Default for DashboardParams {
    fn default() -> Self {
        Self {
            window_days: impact::DEFAULT_WINDOW_DAYS,
            top_k: impact::DEFAULT_TOP_K,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Panel<T> {
    Ready(T),
    Unavailable(InsufficientData),
}

impl<T> Panel<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            Panel::Ready(v) => Some(v),
            Panel::Unavailable(_) => None,
        }
    }

    pub fn unavailable(&self) -> Option<&InsufficientData> {
        match self {
            Panel::Ready(_) => None,
            Panel::Unavailable(why) => Some(why),
        }
    }

    fn requiring(view: View, caps: &Capabilities, required: &[Field]) -> Option<Self> {
        let missing = caps.missing(required);
        if missing.is_empty() {
            None
        } else {
            Some(Panel::Unavailable(InsufficientData::missing(view, missing)))
        }
    }
}

impl<T> Panel<Vec<T>> {
    fn non_empty(view: View, rows: Vec<T>) -> Self {
        if rows.is_empty() {
            Panel::Unavailable(InsufficientData::no_rows(view))
        } else {
            Panel::Ready(rows)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Kpis {
    pub observations: usize,
    pub injury_count: usize,
    pub match_count: usize,
    pub avg_rating: Option<f64>,
    pub avg_goal_diff: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelinePoint {
    pub match_date: NaiveDate,
    pub rating: Option<f64>,
    pub goal_diff: Option<i32>,
    pub phase: Phase,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeatCell {
    pub club: String,
    pub month: String,
    pub injury_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgeDropPoint {
    pub player: String,
    pub team: String,
    pub age: f64,
    pub performance_drop_index: f64,
}

/// Everything one render pass needs, recomputed on each filter change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub selection: Selection,
    pub params: DashboardParams,
    pub kpis: Kpis,
    pub impacts: Panel<Vec<InjuryImpactRecord>>,
    pub comebacks: Panel<Vec<ComebackRecord>>,
    pub timeline: Panel<Vec<TimelinePoint>>,
    pub heatmap: Panel<Vec<HeatCell>>,
    pub age_vs_drop: Panel<Vec<AgeDropPoint>>,
    pub rating_columns: Panel<Vec<RatingColumnDrop>>,
}

impl DashboardSnapshot {
    pub fn build(dataset: &Dataset, selection: &Selection, params: DashboardParams) -> Self {
        let caps = dataset.capabilities();
        let view = filter::apply(dataset, selection);

        // Impact and everything derived from it look at the whole table, never `view`.
        let all_impacts = Panel::requiring(View::Impact, caps, &impact::REQUIRED_FIELDS)
            .unwrap_or_else(|| {
                let mut records = impact::compute_impacts(dataset, params.window_days);
                impact::rank_by_drop(&mut records);
                Panel::non_empty(View::Impact, records)
            });

        let age_vs_drop = Panel::requiring(View::AgeVsDrop, caps, &[Field::Age])
            .unwrap_or_else(|| match &all_impacts {
                Panel::Ready(records) => Panel::non_empty(View::AgeVsDrop, age_vs_drop(dataset, records)),
                Panel::Unavailable(why) => Panel::Unavailable(InsufficientData {
                    view: View::AgeVsDrop,
                    reason: why.reason.clone(),
                }),
            });

        let impacts = match all_impacts {
            Panel::Ready(mut records) => {
                records.truncate(params.top_k);
                Panel::Ready(records)
            }
            other => other,
        };

        let comebacks = Panel::requiring(View::Comeback, caps, &comeback::REQUIRED_FIELDS)
            .unwrap_or_else(|| Panel::non_empty(View::Comeback, comeback::leaderboard(dataset, params.top_k)));

        let timeline = match selection.player.value() {
            None => Panel::Unavailable(InsufficientData {
                view: View::Timeline,
                reason: Reason::NoSelection,
            }),
            Some(player) => Panel::requiring(View::Timeline, caps, &[Field::Rating])
                .unwrap_or_else(|| Panel::non_empty(View::Timeline, player_timeline(&view, player))),
        };

        let heatmap = Panel::requiring(View::Heatmap, caps, &[Field::InjuryStart])
            .unwrap_or_else(|| Panel::non_empty(View::Heatmap, injury_heatmap(dataset)));

        let rating_columns =
            Panel::requiring(View::RatingColumns, caps, &impact::RATING_COLUMN_FIELDS)
                .unwrap_or_else(|| {
                    Panel::non_empty(View::RatingColumns, impact::rating_column_drops(dataset))
                });

        Self {
            selection: selection.clone(),
            params,
            kpis: compute_kpis(&view),
            impacts,
            comebacks,
            timeline,
            heatmap,
            age_vs_drop,
            rating_columns,
        }
    }

    /// Empty-state messages for every panel that could not be computed.
    pub fn notices(&self) -> Vec<String> {
        [
            self.impacts.unavailable(),
            self.comebacks.unavailable(),
            self.timeline.unavailable(),
            self.heatmap.unavailable(),
            self.age_vs_drop.unavailable(),
            self.rating_columns.unavailable(),
        ]
        .into_iter()
        .flatten()
        .filter(|why| why.reason != Reason::NoSelection)
        .map(|why| why.to_string())
        .collect()
    }
}

pub fn compute_kpis(view: &[&Observation]) -> Kpis {
    let mut injuries: HashSet<(&str, &str, NaiveDate)> = HashSet::new();
    let mut matches: HashSet<(&str, NaiveDate)> = HashSet::new();
    let mut rating = (0.0, 0usize);
    let mut diff = (0i64, 0usize);

    for obs in view {
        if let Some(start) = obs.injury_start {
            injuries.insert((obs.player.as_str(), obs.team.as_str(), start));
        }
        matches.insert((obs.team.as_str(), obs.match_date));
        if let Some(r) = obs.rating {
            rating.0 += r;
            rating.1 += 1;
        }
        if let Some(d) = obs.goal_diff {
            diff.0 += i64::from(d);
            diff.1 += 1;
        }
    }

    Kpis {
        observations: view.len(),
        injury_count: injuries.len(),
        match_count: matches.len(),
        avg_rating: (rating.1 > 0).then(|| rating.0 / rating.1 as f64),
        avg_goal_diff: (diff.1 > 0).then(|| diff.0 as f64 / diff.1 as f64),
    }
}

pub fn player_timeline(view: &[&Observation], player: &str) -> Vec<TimelinePoint> {
    let mut points: Vec<TimelinePoint> = view
        .iter()
        .filter(|o| o.player == player)
        .map(|o| TimelinePoint {
            match_date: o.match_date,
            rating: o.rating,
            goal_diff: o.goal_diff,
            phase: o.phase,
        })
        .collect();
    points.sort_by_key(|p| p.match_date);
    points
}

/// Distinct injury events per club and calendar month of injury start.
pub fn injury_heatmap(dataset: &Dataset) -> Vec<HeatCell> {
    let mut seen: HashSet<(&str, &str, NaiveDate)> = HashSet::new();
    let mut counts: BTreeMap<(&str, String), usize> = BTreeMap::new();
    for obs in dataset.iter() {
        let Some(start) = obs.injury_start else { continue };
        if !seen.insert((obs.player.as_str(), obs.team.as_str(), start)) {
            continue;
        }
        *counts
            .entry((obs.team.as_str(), start.format("%Y-%m").to_string()))
            .or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|((club, month), injury_count)| HeatCell {
            club: club.to_string(),
            month,
            injury_count,
        })
        .collect()
}

/// Joins impact records with the first known age of each player.
pub fn age_vs_drop(dataset: &Dataset, impacts: &[InjuryImpactRecord]) -> Vec<AgeDropPoint> {
    let mut ages: HashMap<&str, f64> = HashMap::new();
    for obs in dataset.iter() {
        if let Some(age) = obs.age {
            ages.entry(obs.player.as_str()).or_insert(age);
        }
    }
    impacts
        .iter()
        .filter_map(|r| {
            let age = *ages.get(r.player.as_str())?;
            Some(AgeDropPoint {
                player: r.player.clone(),
                team: r.team.clone(),
                age,
                performance_drop_index: r.performance_drop_index,
            })
        })
        .collect()
}
