use std::fs;
use std::path::PathBuf;

use footlens::comeback;
use footlens::dataset;

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

#[test]
fn leaderboard_ranks_by_rating_change() {
    let ds = dataset::load_str(&read_fixture("injuries_small.csv")).unwrap();
    let board = comeback::leaderboard(&ds, 10);
    let names: Vec<&str> = board.iter().map(|r| r.player.as_str()).collect();
    assert_eq!(names, vec!["P", "Q"]);

    let p = &board[0];
    assert_eq!(p.team, "T");
    assert_eq!(p.rating_before, 6.5);
    assert_eq!(p.rating_after, 8.0);
    assert_eq!(p.rating_change, 1.5);

    let q = &board[1];
    assert_eq!(q.rating_before, 7.5);
    assert_eq!(q.rating_after, 7.0);
    assert_eq!(q.rating_change, -0.5);
}

#[test]
fn players_without_both_phases_are_left_out() {
    let ds = dataset::load_str(&read_fixture("injuries_small.csv")).unwrap();
    let records = comeback::compute_comebacks(&ds);
    // S never returned, R and U have no injury window.
    for absent in ["S", "R", "U", "V"] {
        assert!(records.iter().all(|r| r.player != absent), "{absent} listed");
    }
}

#[test]
fn absent_ratings_do_not_count() {
    let ds = dataset::load_str(
        "player,team,match_date,rating,injury_start,injury_end\n\
         A,X,2024-01-01,6.0,2024-01-10,2024-01-20\n\
         A,X,2024-01-05,,2024-01-10,2024-01-20\n\
         A,X,2024-01-25,,2024-01-10,2024-01-20\n\
         A,X,2024-01-30,7.0,2024-01-10,2024-01-20\n",
    )
    .unwrap();
    let records = comeback::compute_comebacks(&ds);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].rating_before, 6.0);
    assert_eq!(records[0].rating_after, 7.0);
}

#[test]
fn after_phase_with_only_blank_ratings_is_excluded() {
    let ds = dataset::load_str(
        "player,team,match_date,rating,injury_start,injury_end\n\
         A,X,2024-01-01,6.0,2024-01-10,2024-01-20\n\
         A,X,2024-01-25,,2024-01-10,2024-01-20\n",
    )
    .unwrap();
    assert!(comeback::compute_comebacks(&ds).is_empty());
}
