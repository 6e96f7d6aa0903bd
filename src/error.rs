use std::fmt;
use std::path::PathBuf;

use crate::dataset::Field;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Structural problems with the source table. Nothing downstream can run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("missing required identity columns: {}", .missing.join(", "))]
    MissingIdentityColumns { missing: Vec<&'static str> },

    #[error("source has no header row")]
    NoHeader,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum View {
    Kpis,
    Impact,
    Comeback,
    Timeline,
    Heatmap,
    AgeVsDrop,
    RatingColumns,
}

impl View {
    pub fn title(self) -> &'static str {
        match self {
            View::Kpis => "KPIs",
            View::Impact => "Performance drop",
            View::Comeback => "Comeback leaderboard",
            View::Timeline => "Player timeline",
            View::Heatmap => "Injury heatmap",
            View::AgeVsDrop => "Age vs drop",
            View::RatingColumns => "Rating columns",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub enum Reason {
    MissingFields(Vec<Field>),
    NoRows,
    NoSelection,
}

/// A single view could not be computed. Other views are unaffected.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct InsufficientData {
    pub view: View,
    pub reason: Reason,
}

impl InsufficientData {
    pub fn missing(view: View, fields: Vec<Field>) -> Self {
        Self {
            view,
            reason: Reason::MissingFields(fields),
        }
    }

    pub fn no_rows(view: View) -> Self {
        Self {
            view,
            reason: Reason::NoRows,
        }
    }
}

impl fmt::Display for InsufficientData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            Reason::MissingFields(fields) => {
                let names: Vec<&str> = fields.iter().map(|f| f.label()).collect();
                write!(
                    f,
                    "{} unavailable: missing columns ({})",
                    self.view.title(),
                    names.join(", ")
                )
            }
            Reason::NoRows => write!(f, "Not enough data to compute {}.", self.view.title().to_lowercase()),
            Reason::NoSelection => write!(f, "Select a player to view the {}.", self.view.title().to_lowercase()),
        }
    }
}
