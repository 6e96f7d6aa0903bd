use chrono::NaiveDate;
use serde::Serialize;

use crate::dataset::Observation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Phase {
    BeforeInjury,
    DuringAbsence,
    AfterReturn,
    NoRecordedInjury,
}

impl Phase {
    pub const ALL: [Phase; 4] = [
        Phase::BeforeInjury,
        Phase::DuringAbsence,
        Phase::AfterReturn,
        Phase::NoRecordedInjury,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Phase::BeforeInjury => "Before injury",
            Phase::DuringAbsence => "During unfit/absence",
            Phase::AfterReturn => "After return",
            Phase::NoRecordedInjury => "No recorded injury",
        }
    }
}

/// Closed interval `[start, end]` during which a player was unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InjuryWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl InjuryWindow {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Option<Self> {
        Some(Self {
            start: start?,
            end: end?,
        })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn classify(&self, match_date: NaiveDate) -> Phase {
        if match_date < self.start {
            Phase::BeforeInjury
        } else if self.contains(match_date) {
            Phase::DuringAbsence
        } else {
            Phase::AfterReturn
        }
    }
}

pub fn label_phase(
    match_date: NaiveDate,
    injury_start: Option<NaiveDate>,
    injury_end: Option<NaiveDate>,
) -> Phase {
    match InjuryWindow::new(injury_start, injury_end) {
        Some(window) => window.classify(match_date),
        None => Phase::NoRecordedInjury,
    }
}

pub fn phase_of(obs: &Observation) -> Phase {
    label_phase(obs.match_date, obs.injury_start, obs.injury_end)
}
