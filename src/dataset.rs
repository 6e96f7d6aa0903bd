use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Read;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use log::{debug, info};
use serde::Serialize;

use crate::error::{LoadError, SchemaError};
use crate::phase::{self, Phase};

const PLAYER_ALIASES: &[&str] = &["player_name", "name", "player"];
const TEAM_ALIASES: &[&str] = &["club", "team_name", "team"];

const DATE_FORMATS: [&str; 7] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d.%m.%Y",
    "%m/%d/%Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d %b %Y",
];

const DATETIME_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Optional columns the normalizer knows about. Player and team are not listed here:
/// they are required and their absence is a schema error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Field {
    MatchDate,
    GoalsFor,
    GoalsAgainst,
    Rating,
    Age,
    Season,
    InjuryStart,
    InjuryEnd,
    InjuryLabel,
    RatingBeforeInjury,
    RatingAfterInjury,
}

impl Field {
    pub const ALL: [Field; 11] = [
        Field::MatchDate,
        Field::GoalsFor,
        Field::GoalsAgainst,
        Field::Rating,
        Field::Age,
        Field::Season,
        Field::InjuryStart,
        Field::InjuryEnd,
        Field::InjuryLabel,
        Field::RatingBeforeInjury,
        Field::RatingAfterInjury,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Field::MatchDate => "match date",
            Field::GoalsFor => "goals for",
            Field::GoalsAgainst => "goals against",
            Field::Rating => "rating",
            Field::Age => "age",
            Field::Season => "season",
            Field::InjuryStart => "injury start",
            Field::InjuryEnd => "injury end",
            Field::InjuryLabel => "injury",
            Field::RatingBeforeInjury => "rating before injury",
            Field::RatingAfterInjury => "rating after injury",
        }
    }

    fn aliases(self) -> &'static [&'static str] {
        match self {
            Field::MatchDate => &["match_date", "date"],
            Field::GoalsFor => &["goals_for", "score_for"],
            Field::GoalsAgainst => &["goals_against", "score_against"],
            Field::Rating => &["rating", "player_rating"],
            Field::Age => &["age"],
            Field::Season => &["season"],
            Field::InjuryStart => &["injury_start", "date_of_injury"],
            Field::InjuryEnd => &["injury_end", "date_of_return"],
            Field::InjuryLabel => &["injury", "injury_type"],
            Field::RatingBeforeInjury => &["rating_before_injury"],
            Field::RatingAfterInjury => &["rating_after_injury"],
        }
    }
}

/// The set of optional fields present in the source header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    present: BTreeSet<Field>,
}

impl Capabilities {
    pub fn from_fields(fields: impl IntoIterator<Item = Field>) -> Self {
        Self {
            present: fields.into_iter().collect(),
        }
    }

    pub fn has(&self, field: Field) -> bool {
        self.present.contains(&field)
    }

    /// Fields from `required` that the source does not carry, in declaration order.
    pub fn missing(&self, required: &[Field]) -> Vec<Field> {
        required
            .iter()
            .copied()
            .filter(|f| !self.present.contains(f))
            .collect()
    }

    pub fn present(&self) -> impl Iterator<Item = Field> + '_ {
        self.present.iter().copied()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub rows_read: usize,
    pub rows_kept: usize,
    pub dropped_missing_date: usize,
    pub coercion_losses: BTreeMap<Field, usize>,
    pub delimiter: char,
}

impl LoadReport {
    pub fn total_coercion_losses(&self) -> usize {
        self.coercion_losses.values().sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    /// 1-based data row in the source, header excluded.
    pub row: usize,
    pub player: String,
    pub team: String,
    pub match_date: NaiveDate,
    pub goals_for: Option<i32>,
    pub goals_against: Option<i32>,
    pub goal_diff: Option<i32>,
    pub rating: Option<f64>,
    pub age: Option<f64>,
    pub season: Option<String>,
    pub injury: Option<String>,
    pub injury_start: Option<NaiveDate>,
    pub injury_end: Option<NaiveDate>,
    pub rating_before_injury: Option<f64>,
    pub rating_after_injury: Option<f64>,
    pub phase: Phase,
}

/// Normalized, read-only table of observations in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    observations: Vec<Observation>,
    capabilities: Capabilities,
    report: LoadReport,
}

impl Dataset {
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Observation> {
        self.observations.iter()
    }
}

pub fn load_path(path: &Path) -> Result<Dataset, LoadError> {
    let raw = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let dataset = load_str(&raw)?;
    info!(
        "loaded {}: {} of {} rows kept, {} without match date, {} cells coerced to absent",
        path.display(),
        dataset.report.rows_kept,
        dataset.report.rows_read,
        dataset.report.dropped_missing_date,
        dataset.report.total_coercion_losses()
    );
    Ok(dataset)
}

pub fn load_reader<R: Read>(mut rdr: R) -> Result<Dataset, LoadError> {
    let mut raw = String::new();
    rdr.read_to_string(&mut raw).map_err(|source| LoadError::Io {
        path: "<stream>".into(),
        source,
    })?;
    load_str(&raw)
}

pub fn load_str(raw: &str) -> Result<Dataset, LoadError> {
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    let delimiter = sniff_delimiter(raw.lines().next().unwrap_or_default());

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(raw.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(normalize_header).collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(SchemaError::NoHeader.into());
    }
    let columns = ColumnMap::resolve(&headers)?;

    let mut report = LoadReport {
        delimiter,
        ..Default::default()
    };
    let mut observations = Vec::new();

    for (idx, record) in reader.records().enumerate() {
        let record = record?;
        report.rows_read += 1;
        let mut cells = RowReader {
            record: &record,
            columns: &columns,
            report: &mut report,
            row: idx + 1,
        };
        if let Some(obs) = cells.observation() {
            observations.push(obs);
        } else {
            report.dropped_missing_date += 1;
        }
    }
    report.rows_kept = observations.len();

    Ok(Dataset {
        observations,
        capabilities: Capabilities::from_fields(columns.fields()),
        report,
    })
}

struct ColumnMap {
    player: usize,
    team: usize,
    optional: BTreeMap<Field, usize>,
    /// Numbered per-match rating columns, averaged when no single summary column exists.
    match_ratings: BTreeMap<Field, Vec<usize>>,
}

impl ColumnMap {
    fn resolve(headers: &[String]) -> Result<Self, SchemaError> {
        let player = find_column(headers, PLAYER_ALIASES);
        let team = find_column(headers, TEAM_ALIASES);
        let (Some(player), Some(team)) = (player, team) else {
            let mut missing = Vec::new();
            if player.is_none() {
                missing.push("player name");
            }
            if team.is_none() {
                missing.push("team name");
            }
            return Err(SchemaError::MissingIdentityColumns { missing });
        };

        let optional = Field::ALL
            .iter()
            .filter_map(|f| find_column(headers, f.aliases()).map(|idx| (*f, idx)))
            .collect();

        let mut match_ratings: BTreeMap<Field, Vec<usize>> = BTreeMap::new();
        for (idx, header) in headers.iter().enumerate() {
            if let Some(field) = match_rating_side(header) {
                match_ratings.entry(field).or_default().push(idx);
            }
        }

        Ok(Self {
            player,
            team,
            optional,
            match_ratings,
        })
    }

    fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.optional
            .keys()
            .chain(self.match_ratings.keys())
            .copied()
    }
}

/// `match<N>_before_injury_..._rating` and `match<N>_after_injury_..._rating`, after
/// header normalization.
fn match_rating_side(header: &str) -> Option<Field> {
    let rest = header.strip_prefix("match")?;
    let digits = rest.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 || !header.ends_with("rating") {
        return None;
    }
    let rest = &rest[digits..];
    if rest.starts_with("_before_injury_") {
        Some(Field::RatingBeforeInjury)
    } else if rest.starts_with("_after_injury_") {
        Some(Field::RatingAfterInjury)
    } else {
        None
    }
}

struct RowReader<'a> {
    record: &'a csv::StringRecord,
    columns: &'a ColumnMap,
    report: &'a mut LoadReport,
    row: usize,
}

impl RowReader<'_> {
    fn observation(&mut self) -> Option<Observation> {
        let match_date = self.parsed(Field::MatchDate, parse_date)?;

        let goals_for = self.parsed(Field::GoalsFor, parse_score);
        let goals_against = self.parsed(Field::GoalsAgainst, parse_score);
        let goal_diff = match (goals_for, goals_against) {
            (Some(f), Some(a)) => f.checked_sub(a),
            _ => None,
        };
        let injury_start = self.parsed(Field::InjuryStart, parse_date);
        let injury_end = self.parsed(Field::InjuryEnd, parse_date);

        Some(Observation {
            row: self.row,
            player: self.identity(self.columns.player),
            team: self.identity(self.columns.team),
            match_date,
            goals_for,
            goals_against,
            goal_diff,
            rating: self.parsed(Field::Rating, parse_number),
            age: self.parsed(Field::Age, parse_number),
            season: self.text(Field::Season),
            injury: self.text(Field::InjuryLabel),
            injury_start,
            injury_end,
            rating_before_injury: self.rating_summary(Field::RatingBeforeInjury),
            rating_after_injury: self.rating_summary(Field::RatingAfterInjury),
            phase: phase::label_phase(match_date, injury_start, injury_end),
        })
    }

    fn identity(&self, idx: usize) -> String {
        self.record.get(idx).unwrap_or_default().to_string()
    }

    fn cell(&self, field: Field) -> Option<&str> {
        let idx = *self.columns.optional.get(&field)?;
        self.cell_at(idx)
    }

    fn cell_at(&self, idx: usize) -> Option<&str> {
        self.record.get(idx).filter(|raw| !is_blank(raw))
    }

    fn text(&self, field: Field) -> Option<String> {
        self.cell(field).map(|s| s.to_string())
    }

    fn parsed<T>(&mut self, field: Field, parse: fn(&str) -> Option<T>) -> Option<T> {
        let idx = *self.columns.optional.get(&field)?;
        self.parsed_at(field, idx, parse)
    }

    /// The summary column when present, otherwise the mean of the per-match columns.
    fn rating_summary(&mut self, field: Field) -> Option<f64> {
        if self.columns.optional.contains_key(&field) {
            return self.parsed(field, parse_number);
        }
        let columns = self.columns;
        let idxs = columns.match_ratings.get(&field)?;
        let mut sum = 0.0;
        let mut n = 0usize;
        for &idx in idxs {
            if let Some(v) = self.parsed_at(field, idx, parse_number) {
                sum += v;
                n += 1;
            }
        }
        (n > 0).then(|| sum / n as f64)
    }

    fn parsed_at<T>(&mut self, field: Field, idx: usize, parse: fn(&str) -> Option<T>) -> Option<T> {
        let raw = self.cell_at(idx)?;
        if let Some(value) = parse(raw) {
            return Some(value);
        }
        debug!(
            "row {}: {} value {:?} coerced to absent",
            self.row,
            field.label(),
            raw
        );
        *self.report.coercion_losses.entry(field).or_insert(0) += 1;
        None
    }
}

fn find_column(headers: &[String], aliases: &[&str]) -> Option<usize> {
    aliases
        .iter()
        .find_map(|alias| headers.iter().position(|h| h == alias))
}

/// Lowercases and collapses every run of non-alphanumerics to `_`, so "Team Name" and
/// "team-name" both resolve to `team_name`.
pub fn normalize_header(input: &str) -> String {
    let lower = input.trim().to_ascii_lowercase();
    let mut out = String::with_capacity(lower.len());
    let mut prev_us = false;
    for ch in lower.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch);
            prev_us = false;
        } else if !prev_us && !out.is_empty() {
            out.push('_');
            prev_us = true;
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}

fn sniff_delimiter(header_line: &str) -> char {
    let mut best = (',', header_line.matches(',').count());
    for candidate in [';', '\t'] {
        let n = header_line.matches(candidate).count();
        if n > best.1 {
            best = (candidate, n);
        }
    }
    best.0
}

fn is_blank(raw: &str) -> bool {
    let s = raw.trim();
    s.is_empty()
        || s == "-"
        || ["n/a", "n.a.", "n.a", "na", "nan", "null", "none"]
            .iter()
            .any(|m| s.eq_ignore_ascii_case(m))
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    // Timestamps with fractional seconds or a zone suffix: keep the ISO date prefix.
    if s.len() > 10 && s.is_char_boundary(10) && matches!(s.as_bytes()[10], b'T' | b' ') {
        return NaiveDate::parse_from_str(&s[..10], "%Y-%m-%d").ok();
    }
    None
}

pub fn parse_number(raw: &str) -> Option<f64> {
    let s = raw.trim();
    let parsed = s.parse::<f64>().ok().or_else(|| {
        // Decimal comma ("7,4") as exported by some spreadsheet locales.
        if s.contains(',') && !s.contains('.') {
            s.replace(',', ".").parse::<f64>().ok()
        } else {
            None
        }
    })?;
    parsed.is_finite().then_some(parsed)
}

/// Highest goal count a single side is taken to score in one match.
const MAX_GOALS: f64 = 99.0;

/// A goal count: a whole number in `0..=MAX_GOALS`.
fn parse_score(raw: &str) -> Option<i32> {
    let v = parse_number(raw)?;
    if v.fract() != 0.0 || !(0.0..=MAX_GOALS).contains(&v) {
        return None;
    }
    Some(v as i32)
}
