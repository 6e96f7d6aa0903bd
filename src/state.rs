use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{self, Settings};
use crate::dashboard::{DashboardParams, DashboardSnapshot};
use crate::dataset::Dataset;
use crate::filter::{FilterOptions, Selection, Selector};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Overview,
    Impact,
    Comeback,
    Timeline,
    Heatmap,
    Age,
}

impl Screen {
    pub const ALL: [Screen; 6] = [
        Screen::Overview,
        Screen::Impact,
        Screen::Comeback,
        Screen::Timeline,
        Screen::Heatmap,
        Screen::Age,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Screen::Overview => "Overview",
            Screen::Impact => "Impact",
            Screen::Comeback => "Comeback",
            Screen::Timeline => "Timeline",
            Screen::Heatmap => "Heatmap",
            Screen::Age => "Age",
        }
    }

    pub fn index(self) -> usize {
        Screen::ALL.iter().position(|s| *s == self).unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterFocus {
    Club,
    Season,
    Player,
}

impl FilterFocus {
    pub fn label(self) -> &'static str {
        match self {
            FilterFocus::Club => "Club",
            FilterFocus::Season => "Season",
            FilterFocus::Player => "Player",
        }
    }
}

pub const WINDOW_STEP_DAYS: u32 = 7;

pub struct AppState {
    pub screen: Screen,
    pub focus: FilterFocus,
    pub data_path: PathBuf,
    pub dataset: Option<Arc<Dataset>>,
    pub options: FilterOptions,
    /// Index into the focused option list; 0 means "All".
    pub club_idx: usize,
    pub season_idx: usize,
    pub player_idx: usize,
    pub params: DashboardParams,
    pub snapshot: Option<DashboardSnapshot>,
    pub logs: VecDeque<String>,
    pub help_overlay: bool,
    pub last_export: Option<PathBuf>,
}

impl AppState {
    pub fn new(settings: &Settings) -> Self {
        Self {
            screen: Screen::Overview,
            focus: FilterFocus::Club,
            data_path: settings.data_path.clone(),
            dataset: None,
            options: FilterOptions::default(),
            club_idx: 0,
            season_idx: 0,
            player_idx: 0,
            params: settings.params(),
            snapshot: None,
            logs: VecDeque::new(),
            help_overlay: false,
            last_export: None,
        }
    }

    /// Replaces the dataset, keeping current selections whose values still exist.
    pub fn set_dataset(&mut self, dataset: Arc<Dataset>) {
        let previous = self.selection();
        self.options = FilterOptions::from_dataset(&dataset);
        self.club_idx = index_of(&self.options.clubs, &previous.club);
        self.season_idx = index_of(&self.options.seasons, &previous.season);
        self.player_idx = index_of(&self.options.players, &previous.player);

        let report = dataset.report();
        self.push_log(format!(
            "[INFO] Loaded {} of {} rows from {}",
            report.rows_kept,
            report.rows_read,
            self.data_path.display()
        ));
        if report.dropped_missing_date > 0 {
            self.push_log(format!(
                "[WARN] Dropped {} rows without a usable match date",
                report.dropped_missing_date
            ));
        }
        for (field, lost) in &report.coercion_losses {
            self.push_log(format!("[WARN] {lost} unparseable {} values", field.label()));
        }
        self.dataset = Some(dataset);
        self.recompute();
    }

    pub fn selection(&self) -> Selection {
        Selection {
            club: selector_at(&self.options.clubs, self.club_idx),
            season: selector_at(&self.options.seasons, self.season_idx),
            player: selector_at(&self.options.players, self.player_idx),
        }
    }

    pub fn recompute(&mut self) {
        let Some(dataset) = self.dataset.as_ref() else {
            self.snapshot = None;
            return;
        };
        let snapshot = DashboardSnapshot::build(dataset, &self.selection(), self.params);
        for notice in snapshot.notices() {
            if !self.logs.iter().any(|l| l.ends_with(&notice)) {
                self.push_log(format!("[INFO] {notice}"));
            }
        }
        self.snapshot = Some(snapshot);
    }

    pub fn cycle_screen_next(&mut self) {
        let idx = (self.screen.index() + 1) % Screen::ALL.len();
        self.screen = Screen::ALL[idx];
    }

    pub fn cycle_screen_prev(&mut self) {
        let idx = (self.screen.index() + Screen::ALL.len() - 1) % Screen::ALL.len();
        self.screen = Screen::ALL[idx];
    }

    pub fn cycle_focus(&mut self) {
        self.focus = match self.focus {
            FilterFocus::Club => FilterFocus::Season,
            FilterFocus::Season => FilterFocus::Player,
            FilterFocus::Player => FilterFocus::Club,
        };
    }

    pub fn next_value(&mut self) {
        self.step_value(true);
    }

    pub fn prev_value(&mut self) {
        self.step_value(false);
    }

    fn step_value(&mut self, forward: bool) {
        let (idx, len) = match self.focus {
            FilterFocus::Club => (&mut self.club_idx, self.options.clubs.len()),
            FilterFocus::Season => (&mut self.season_idx, self.options.seasons.len()),
            FilterFocus::Player => (&mut self.player_idx, self.options.players.len()),
        };
        // One extra slot for "All".
        let slots = len + 1;
        *idx = if forward {
            (*idx + 1) % slots
        } else {
            (*idx + slots - 1) % slots
        };
        self.recompute();
    }

    pub fn adjust_window(&mut self, grow: bool) {
        let days = if grow {
            self.params.window_days.saturating_add(WINDOW_STEP_DAYS)
        } else {
            self.params.window_days.saturating_sub(WINDOW_STEP_DAYS)
        };
        let days = config::clamp_window_days(days);
        if days != self.params.window_days {
            self.params.window_days = days;
            self.push_log(format!("[INFO] Trailing window set to {days} days"));
            self.recompute();
        }
    }

    pub fn focused_value(&self, focus: FilterFocus) -> &str {
        let (values, idx) = match focus {
            FilterFocus::Club => (&self.options.clubs, self.club_idx),
            FilterFocus::Season => (&self.options.seasons, self.season_idx),
            FilterFocus::Player => (&self.options.players, self.player_idx),
        };
        idx.checked_sub(1)
            .and_then(|i| values.get(i))
            .map(String::as_str)
            .unwrap_or("All")
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        const MAX_LOGS: usize = 200;
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }
}

fn selector_at(values: &[String], idx: usize) -> Selector {
    match idx.checked_sub(1).and_then(|i| values.get(i)) {
        Some(v) => Selector::Only(v.clone()),
        None => Selector::All,
    }
}

fn index_of(values: &[String], selector: &Selector) -> usize {
    selector
        .value()
        .and_then(|want| values.iter().position(|v| v == want))
        .map(|i| i + 1)
        .unwrap_or(0)
}
