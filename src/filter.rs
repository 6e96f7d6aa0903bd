use std::collections::BTreeSet;

use serde::Serialize;

use crate::dataset::{Dataset, Observation};

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub enum Selector {
    #[default]
    All,
    Only(String),
}

impl Selector {
    /// "All", "None" and blank mean no constraint, matching the sidebar sentinels.
    pub fn parse(raw: &str) -> Self {
        let s = raw.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("all") || s.eq_ignore_ascii_case("none") {
            Selector::All
        } else {
            Selector::Only(s.to_string())
        }
    }

    pub fn matches(&self, value: &str) -> bool {
        match self {
            Selector::All => true,
            Selector::Only(want) => want == value,
        }
    }

    fn matches_opt(&self, value: Option<&str>) -> bool {
        match self {
            Selector::All => true,
            Selector::Only(want) => value == Some(want.as_str()),
        }
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            Selector::All => None,
            Selector::Only(v) => Some(v.as_str()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub club: Selector,
    pub season: Selector,
    pub player: Selector,
}

impl Selection {
    pub fn club(mut self, club: &str) -> Self {
        self.club = Selector::parse(club);
        self
    }

    pub fn season(mut self, season: &str) -> Self {
        self.season = Selector::parse(season);
        self
    }

    pub fn player(mut self, player: &str) -> Self {
        self.player = Selector::parse(player);
        self
    }

    pub fn matches(&self, obs: &Observation) -> bool {
        self.club.matches(&obs.team)
            && self.season.matches_opt(obs.season.as_deref())
            && self.player.matches(&obs.player)
    }
}

/// Observations matching every selector, in source order.
pub fn apply<'a>(dataset: &'a Dataset, selection: &Selection) -> Vec<&'a Observation> {
    dataset.iter().filter(|o| selection.matches(o)).collect()
}

/// Distinct, sorted, non-empty values offered by each selector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub clubs: Vec<String>,
    pub seasons: Vec<String>,
    pub players: Vec<String>,
}

impl FilterOptions {
    pub fn from_dataset(dataset: &Dataset) -> Self {
        let mut clubs = BTreeSet::new();
        let mut seasons = BTreeSet::new();
        let mut players = BTreeSet::new();
        for obs in dataset.iter() {
            if !obs.team.is_empty() {
                clubs.insert(obs.team.as_str());
            }
            if let Some(season) = obs.season.as_deref() {
                seasons.insert(season);
            }
            if !obs.player.is_empty() {
                players.insert(obs.player.as_str());
            }
        }
        let owned = |set: BTreeSet<&str>| -> Vec<String> {
            set.into_iter().map(str::to_string).collect()
        };
        Self {
            clubs: owned(clubs),
            seasons: owned(seasons),
            players: owned(players),
        }
    }
}
