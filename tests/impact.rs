use std::fs;
use std::path::PathBuf;

use chrono::NaiveDate;

use footlens::dashboard::{DashboardParams, DashboardSnapshot};
use footlens::dataset::{self, Dataset, Field};
use footlens::filter::Selection;
use footlens::impact::{self, DEFAULT_WINDOW_DAYS};

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

fn fixture() -> Dataset {
    dataset::load_str(&read_fixture("injuries_small.csv")).expect("fixture should load")
}

#[test]
fn hamstring_absence_drops_two_and_a_half() {
    let ds = fixture();
    let records = impact::top_impacts(&ds, DEFAULT_WINDOW_DAYS, 10);
    assert_eq!(records.len(), 2);

    let p = &records[0];
    assert_eq!((p.player.as_str(), p.team.as_str()), ("P", "T"));
    assert_eq!(p.injury_start, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    assert_eq!(p.before_perf, 1.0);
    assert_eq!(p.during_perf, -1.5);
    assert_eq!(p.performance_drop_index, 2.5);
    assert_eq!((p.matches_before, p.matches_during), (3, 2));

    let q = &records[1];
    assert_eq!(q.player, "Q");
    assert_eq!(q.performance_drop_index, 1.0);
    // Both Arsenal rows on each date count towards the team mean.
    assert_eq!((q.matches_before, q.matches_during), (2, 2));
}

#[test]
fn drop_is_exact_difference() {
    let ds = fixture();
    for window in [7, 10, 30, 90] {
        for r in impact::compute_impacts(&ds, window) {
            assert_eq!(r.performance_drop_index, r.before_perf - r.during_perf);
            assert!(r.matches_before > 0 && r.matches_during > 0);
        }
    }
}

#[test]
fn events_without_matches_in_window_are_skipped() {
    let ds = fixture();
    // Chelsea has no match between 1 and 20 March.
    let records = impact::compute_impacts(&ds, DEFAULT_WINDOW_DAYS);
    assert!(records.iter().all(|r| r.player != "S"));

    // A one-week window leaves nothing before the hamstring injury.
    let short = impact::compute_impacts(&ds, 7);
    assert!(short.iter().all(|r| r.player != "P"));
}

#[test]
fn window_length_moves_the_baseline() {
    let ds = fixture();
    let records = impact::compute_impacts(&ds, 10);
    let p = records.iter().find(|r| r.player == "P").unwrap();
    assert_eq!(p.before_perf, 0.0);
    assert_eq!(p.performance_drop_index, 1.5);
}

#[test]
fn equal_drops_keep_event_order() {
    let ds = dataset::load_str(
        "player,team,match_date,goals_for,goals_against,injury_start,injury_end\n\
         B,Y,2024-01-05,1,0,2024-01-10,2024-01-20\n\
         A,X,2024-01-05,1,0,2024-01-10,2024-01-20\n\
         B,Y,2024-01-15,0,0,2024-01-10,2024-01-20\n\
         A,X,2024-01-15,0,0,2024-01-10,2024-01-20\n",
    )
    .unwrap();
    let records = impact::top_impacts(&ds, DEFAULT_WINDOW_DAYS, 10);
    let players: Vec<&str> = records.iter().map(|r| r.player.as_str()).collect();
    assert_eq!(players, vec!["B", "A"]);
    assert!(records.iter().all(|r| r.performance_drop_index == 1.0));
}

#[test]
fn top_k_truncates() {
    let ds = fixture();
    let records = impact::top_impacts(&ds, DEFAULT_WINDOW_DAYS, 1);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].player, "P");
}

#[test]
fn club_filter_does_not_change_impacts() {
    let ds = fixture();
    let params = DashboardParams::default();
    let all = DashboardSnapshot::build(&ds, &Selection::default(), params);
    let arsenal = DashboardSnapshot::build(&ds, &Selection::default().club("Arsenal"), params);
    assert_eq!(all.impacts, arsenal.impacts);
    assert_ne!(all.kpis, arsenal.kpis);
}

#[test]
fn rating_columns_rank_by_drop() {
    let ds = dataset::load_str(
        "player,team,match_date,injury_start,rating_before_injury,rating_after_injury\n\
         A,X,2024-01-01,2023-12-01,7.0,6.0\n\
         A,X,2024-01-08,2023-12-01,7.0,6.0\n\
         B,Y,2024-01-01,2023-11-01,6.5,7.0\n\
         C,Z,2024-01-01,2023-10-01,7.2,\n",
    )
    .unwrap();
    let drops = impact::rating_column_drops(&ds);
    assert_eq!(drops.len(), 2);
    assert_eq!(drops[0].player, "A");
    assert_eq!(drops[0].rating_drop, 1.0);
    assert_eq!(drops[1].rating_drop, -0.5);
}

#[test]
fn per_match_rating_columns_are_averaged() {
    let ds = dataset::load_str(&read_fixture("match_ratings.csv")).expect("fixture should load");
    let caps = ds.capabilities();
    assert!(caps.has(Field::RatingBeforeInjury));
    assert!(caps.has(Field::RatingAfterInjury));
    assert!(caps.has(Field::InjuryStart));
    assert_eq!(
        ds.report().coercion_losses.get(&Field::RatingBeforeInjury),
        Some(&1)
    );

    let drops = impact::rating_column_drops(&ds);
    let names: Vec<&str> = drops.iter().map(|d| d.player.as_str()).collect();
    assert_eq!(names, vec!["Xavi", "Wes", "Yann"]);
    assert_eq!((drops[0].rating_before, drops[0].rating_after), (7.5, 6.25));
    assert_eq!(drops[0].rating_drop, 1.25);
    assert_eq!(drops[1].rating_before, 6.0);
    assert_eq!(drops[2].rating_drop, -1.0);

    let snap = DashboardSnapshot::build(&ds, &Selection::default(), DashboardParams::default());
    assert_eq!(snap.rating_columns.ready().map(Vec::len), Some(3));
}
