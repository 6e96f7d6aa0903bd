use std::fs;
use std::path::PathBuf;

use chrono::NaiveDate;

use footlens::dataset::{self, Field};
use footlens::error::{LoadError, SchemaError};
use footlens::phase::{self, Phase};

fn fixture_path(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    path
}

fn read_fixture(name: &str) -> String {
    fs::read_to_string(fixture_path(name)).expect("fixture file should be readable")
}

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

#[test]
fn loads_fixture_and_reports_drops() {
    let ds = dataset::load_path(&fixture_path("injuries_small.csv")).expect("fixture should load");
    let report = ds.report();
    assert_eq!(report.rows_read, 16);
    assert_eq!(report.rows_kept, 15);
    assert_eq!(report.dropped_missing_date, 1);
    assert_eq!(report.delimiter, ',');
    // "n/a" is a blank marker, "not-a-date" is a real loss.
    assert_eq!(report.coercion_losses.get(&Field::MatchDate), Some(&1));
    assert_eq!(report.coercion_losses.get(&Field::Rating), None);
    assert!(ds.iter().all(|o| o.player != "V"));
}

#[test]
fn derives_goal_diff_and_phase() {
    let ds = dataset::load_str(&read_fixture("injuries_small.csv")).unwrap();
    let p: Vec<_> = ds.iter().filter(|o| o.player == "P").collect();
    assert_eq!(p[0].goal_diff, Some(2));
    assert_eq!(p[4].goal_diff, Some(-2));
    assert_eq!(p[0].phase, Phase::BeforeInjury);
    assert_eq!(p[3].phase, Phase::DuringAbsence);
    assert_eq!(p[5].phase, Phase::AfterReturn);
    assert_eq!(p[6].phase, Phase::NoRecordedInjury);
    assert!(p.iter().all(|o| phase::phase_of(o) == o.phase));
    assert_eq!(p[0].injury.as_deref(), Some("Hamstring"));
    assert_eq!(p[0].match_date, d(2023, 12, 10));
}

#[test]
fn start_absent_end_present_is_no_recorded_injury() {
    let ds = dataset::load_str(&read_fixture("injuries_small.csv")).unwrap();
    let u = ds.iter().find(|o| o.player == "U").unwrap();
    assert_eq!(u.injury_start, None);
    assert_eq!(u.injury_end, Some(d(2024, 2, 10)));
    assert_eq!(u.phase, Phase::NoRecordedInjury);
}

#[test]
fn loading_twice_is_identical() {
    let raw = read_fixture("injuries_small.csv");
    let a = dataset::load_str(&raw).unwrap();
    let b = dataset::load_str(&raw).unwrap();
    let c = dataset::load_reader(raw.as_bytes()).unwrap();
    assert_eq!(a, b);
    assert_eq!(a, c);
}

#[test]
fn byte_order_mark_is_ignored() {
    let ds = dataset::load_str("\u{feff}player,team,match_date\nA,X,2024-01-01\n").unwrap();
    assert_eq!(ds.len(), 1);
    assert_eq!(ds.observations()[0].player, "A");
}

#[test]
fn missing_identity_columns_is_schema_error() {
    let err = dataset::load_str("player_name,match_date\nA,2024-01-01\n").unwrap_err();
    match err {
        LoadError::Schema(SchemaError::MissingIdentityColumns { missing }) => {
            assert_eq!(missing, vec!["team name"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn capabilities_follow_header() {
    let ds = dataset::load_str(
        "Player Name;Team Name;Date;Score For;Score Against\nA;X;2024-01-01;1;0\n",
    )
    .unwrap();
    assert_eq!(ds.report().delimiter, ';');
    let caps = ds.capabilities();
    assert!(caps.has(Field::MatchDate));
    assert!(caps.has(Field::GoalsFor));
    assert!(!caps.has(Field::Rating));
    assert_eq!(
        caps.missing(&[Field::Rating, Field::GoalsAgainst, Field::InjuryStart]),
        vec![Field::Rating, Field::InjuryStart]
    );
    assert_eq!(ds.observations()[0].goal_diff, Some(1));
}

#[test]
fn unparseable_numbers_become_absent() {
    let ds = dataset::load_str(
        "player,team,match_date,goals_for,goals_against,rating\n\
         A,X,2024-01-01,two,0,seven\n\
         A,X,2024-01-08,1.5,0,\"7,4\"\n",
    )
    .unwrap();
    let rows = ds.observations();
    assert_eq!(rows[0].goals_for, None);
    assert_eq!(rows[0].goal_diff, None);
    assert_eq!(rows[0].rating, None);
    assert_eq!(rows[1].goals_for, None);
    assert_eq!(rows[1].rating, Some(7.4));
    assert_eq!(ds.report().coercion_losses.get(&Field::GoalsFor), Some(&2));
    assert_eq!(ds.report().total_coercion_losses(), 3);
}

#[test]
fn missing_match_date_column_drops_every_row() {
    let ds = dataset::load_str("player,team,rating\nA,X,7.0\nB,Y,6.0\n").unwrap();
    assert!(ds.is_empty());
    assert_eq!(ds.report().dropped_missing_date, 2);
}

#[test]
fn out_of_range_scores_are_coercion_losses() {
    let ds = dataset::load_str(
        "player,team,match_date,goals_for,goals_against\n\
         A,X,2024-01-01,2147483647,-5\n\
         A,X,2024-01-08,-3,1\n\
         A,X,2024-01-15,4,1\n",
    )
    .expect("bad scores must not abort the load");
    let rows = ds.observations();
    assert_eq!(rows.len(), 3);
    assert_eq!((rows[0].goals_for, rows[0].goals_against), (None, None));
    assert_eq!(rows[0].goal_diff, None);
    assert_eq!(rows[1].goals_for, None);
    assert_eq!(rows[1].goal_diff, None);
    assert_eq!(rows[2].goal_diff, Some(3));
    let losses = &ds.report().coercion_losses;
    assert_eq!(losses.get(&Field::GoalsFor), Some(&2));
    assert_eq!(losses.get(&Field::GoalsAgainst), Some(&1));
}
