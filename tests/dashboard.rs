use std::fs;
use std::path::PathBuf;

use footlens::dashboard::{DashboardParams, DashboardSnapshot, HeatCell};
use footlens::dataset::{self, Dataset, Field};
use footlens::error::{Reason, View};
use footlens::filter::{self, FilterOptions, Selection};
use footlens::phase::Phase;

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
fn arsenal_kpis() {
    let ds = fixture();
    let snap = DashboardSnapshot::build(
        &ds,
        &Selection::default().club("Arsenal"),
        DashboardParams::default(),
    );
    let k = &snap.kpis;
    assert_eq!(k.observations, 6);
    assert_eq!(k.injury_count, 1);
    assert_eq!(k.match_count, 3);
    assert!((k.avg_rating.unwrap() - 6.95).abs() < 1e-9);
    assert!((k.avg_goal_diff.unwrap() - 1.0 / 3.0).abs() < 1e-9);
}

#[test]
fn heatmap_counts_events_per_club_month() {
    let ds = fixture();
    let snap = DashboardSnapshot::build(&ds, &Selection::default(), DashboardParams::default());
    let cells = snap.heatmap.ready().expect("heatmap ready");
    let cell = |club: &str, month: &str| HeatCell {
        club: club.to_string(),
        month: month.to_string(),
        injury_count: 1,
    };
    assert_eq!(
        cells,
        &vec![
            cell("Arsenal", "2024-02"),
            cell("Chelsea", "2024-03"),
            cell("T", "2024-01"),
        ]
    );
}

#[test]
fn timeline_needs_a_player() {
    let ds = fixture();
    let params = DashboardParams::default();
    let none = DashboardSnapshot::build(&ds, &Selection::default(), params);
    let why = none.timeline.unavailable().expect("no player selected");
    assert_eq!(why.reason, Reason::NoSelection);
    assert!(none.notices().iter().all(|n| !n.contains("timeline")));

    let p = DashboardSnapshot::build(&ds, &Selection::default().player("P"), params);
    let points = p.timeline.ready().expect("timeline ready");
    assert_eq!(points.len(), 7);
    assert!(points.windows(2).all(|w| w[0].match_date <= w[1].match_date));
    assert_eq!(points[0].phase, Phase::NoRecordedInjury);
    assert_eq!(points[1].phase, Phase::BeforeInjury);
}

#[test]
fn age_vs_drop_joins_first_known_age() {
    let ds = fixture();
    let snap = DashboardSnapshot::build(&ds, &Selection::default(), DashboardParams::default());
    let points = snap.age_vs_drop.ready().expect("age panel ready");
    assert_eq!(points.len(), 2);
    assert_eq!(points[0].player, "P");
    assert_eq!(points[0].age, 27.0);
    assert_eq!(points[1].age, 24.0);
}

#[test]
fn missing_rating_disables_only_rating_views() {
    let ds = dataset::load_str(
        "player,team,match_date,goals_for,goals_against,injury_start,injury_end\n\
         A,X,2024-01-05,1,0,2024-01-10,2024-01-20\n\
         A,X,2024-01-15,0,0,2024-01-10,2024-01-20\n",
    )
    .unwrap();
    let snap = DashboardSnapshot::build(
        &ds,
        &Selection::default().player("A"),
        DashboardParams::default(),
    );
    assert!(snap.impacts.ready().is_some());
    assert!(snap.heatmap.ready().is_some());

    let comeback = snap.comebacks.unavailable().expect("comeback needs rating");
    assert_eq!(comeback.view, View::Comeback);
    assert_eq!(comeback.reason, Reason::MissingFields(vec![Field::Rating]));
    let timeline = snap.timeline.unavailable().expect("timeline needs rating");
    assert_eq!(timeline.reason, Reason::MissingFields(vec![Field::Rating]));
    assert_eq!(snap.kpis.avg_rating, None);

    let notices = snap.notices();
    assert!(notices.iter().any(|n| n == "Comeback leaderboard unavailable: missing columns (rating)"));
}

#[test]
fn missing_injury_columns_disable_impact_and_dependents() {
    let ds = dataset::load_str(
        "player,team,match_date,goals_for,goals_against,rating,age\nA,X,2024-01-05,1,0,7.0,25\n",
    )
    .unwrap();
    let snap = DashboardSnapshot::build(&ds, &Selection::default(), DashboardParams::default());
    let why = snap.impacts.unavailable().expect("impact needs injury dates");
    assert_eq!(
        why.reason,
        Reason::MissingFields(vec![Field::InjuryStart, Field::InjuryEnd])
    );
    assert_eq!(snap.age_vs_drop.unavailable().unwrap().view, View::AgeVsDrop);
    assert!(snap.heatmap.unavailable().is_some());
    assert_eq!(snap.kpis.observations, 1);
    assert_eq!(snap.kpis.avg_rating, Some(7.0));
}

#[test]
fn no_events_is_no_rows() {
    let ds = dataset::load_str(
        "player,team,match_date,goals_for,goals_against,injury_start,injury_end\n\
         A,X,2024-01-05,1,0,,\n",
    )
    .unwrap();
    let snap = DashboardSnapshot::build(&ds, &Selection::default(), DashboardParams::default());
    assert_eq!(snap.impacts.unavailable().unwrap().reason, Reason::NoRows);
    assert!(
        snap.notices()
            .contains(&"Not enough data to compute performance drop.".to_string())
    );
}

#[test]
fn filter_options_are_sorted_and_distinct() {
    let ds = fixture();
    let options = FilterOptions::from_dataset(&ds);
    assert_eq!(options.clubs, vec!["Arsenal", "Chelsea", "T"]);
    assert_eq!(options.seasons, vec!["2022/23", "2023/24"]);
    assert_eq!(options.players, vec!["P", "Q", "R", "S", "U"]);
}

#[test]
fn season_filter_narrows_view() {
    let ds = fixture();
    let view = filter::apply(&ds, &Selection::default().season("2022/23"));
    assert_eq!(view.len(), 1);
    assert_eq!(view[0].player, "P");
    let everything = filter::apply(&ds, &Selection::default().season("All"));
    assert_eq!(everything.len(), ds.len());
}

#[test]
fn heatmap_counts_an_injury_once_however_many_rows_it_spans() {
    let ds = dataset::load_str(
        "player,team,match_date,injury_start,injury_end\n\
         A,X,2024-01-01,2024-01-10,2024-01-20\n\
         A,X,2024-01-12,2024-01-10,2024-01-20\n\
         A,X,2024-01-30,2024-01-10,2024-01-20\n\
         B,X,2024-01-30,2024-01-15,2024-01-25\n\
         A,X,2024-03-01,2024-02-20,2024-02-25\n",
    )
    .unwrap();
    let snap = DashboardSnapshot::build(&ds, &Selection::default(), DashboardParams::default());
    let cells = snap.heatmap.ready().expect("heatmap ready");
    let counts: Vec<(&str, usize)> = cells
        .iter()
        .map(|c| (c.month.as_str(), c.injury_count))
        .collect();
    assert_eq!(counts, vec![("2024-01", 2), ("2024-02", 1)]);
}
