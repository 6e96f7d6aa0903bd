use std::collections::HashMap;

use serde::Serialize;

use crate::dataset::{Dataset, Field};
use crate::phase::Phase;

pub const REQUIRED_FIELDS: [Field; 3] = [Field::Rating, Field::InjuryStart, Field::InjuryEnd];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComebackRecord {
    pub player: String,
    pub team: String,
    pub rating_before: f64,
    pub rating_after: f64,
    pub rating_change: f64,
}

#[derive(Debug, Default)]
struct PlayerPhases<'a> {
    team: Option<&'a str>,
    before: RunningMean,
    after: RunningMean,
}

#[derive(Debug, Default, Clone, Copy)]
struct RunningMean {
    sum: f64,
    n: usize,
}

impl RunningMean {
    fn push(&mut self, v: f64) {
        self.sum += v;
        self.n += 1;
    }

    fn mean(self) -> Option<f64> {
        (self.n > 0).then(|| self.sum / self.n as f64)
    }
}

/// Mean rating before injury vs after return, per player. Players missing either side
/// are left out. Output follows player first appearance.
pub fn compute_comebacks(dataset: &Dataset) -> Vec<ComebackRecord> {
    let mut order: Vec<&str> = Vec::new();
    let mut by_player: HashMap<&str, PlayerPhases<'_>> = HashMap::new();

    for obs in dataset.iter() {
        let entry = by_player.entry(obs.player.as_str()).or_insert_with(|| {
            order.push(obs.player.as_str());
            PlayerPhases::default()
        });
        match obs.phase {
            Phase::BeforeInjury => {
                entry.team.get_or_insert(obs.team.as_str());
                if let Some(r) = obs.rating {
                    entry.before.push(r);
                }
            }
            Phase::AfterReturn => {
                if let Some(r) = obs.rating {
                    entry.after.push(r);
                }
            }
            Phase::DuringAbsence | Phase::NoRecordedInjury => {}
        }
    }

    order
        .into_iter()
        .filter_map(|player| {
            let phases = by_player.get(player)?;
            let rating_before = phases.before.mean()?;
            let rating_after = phases.after.mean()?;
            Some(ComebackRecord {
                player: player.to_string(),
                team: phases.team.unwrap_or_default().to_string(),
                rating_before,
                rating_after,
                rating_change: rating_after - rating_before,
            })
        })
        .collect()
}

/// Biggest improvement first; stable for equal changes.
pub fn rank_comebacks(records: &mut [ComebackRecord]) {
    records.sort_by(|a, b| b.rating_change.total_cmp(&a.rating_change));
}

pub fn leaderboard(dataset: &Dataset, k: usize) -> Vec<ComebackRecord> {
    let mut records = compute_comebacks(dataset);
    rank_comebacks(&mut records);
    records.truncate(k);
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_mean_empty_is_none() {
        assert_eq!(RunningMean::default().mean(), None);
        let mut m = RunningMean::default();
        m.push(6.0);
        m.push(7.0);
        assert_eq!(m.mean(), Some(6.5));
    }
}
