use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use footlens::comeback;
use footlens::dashboard::{DashboardParams, DashboardSnapshot};
use footlens::dataset::{self, Dataset};
use footlens::filter::Selection;
use footlens::impact;
use footlens::sample_data::{self, SampleSpec};

fn league_spec() -> SampleSpec {
    SampleSpec {
        teams: 8,
        players_per_team: 20,
        match_days: 38,
        ..SampleSpec::default()
    }
}

fn league_csv() -> String {
    let rows = sample_data::generate(&league_spec(), 2024);
    sample_data::to_csv_string(&rows).expect("sample csv")
}

fn league_dataset() -> Dataset {
    dataset::load_str(&league_csv()).expect("sample csv should load")
}

fn bench_load(c: &mut Criterion) {
    let raw = league_csv();
    c.bench_function("load_league_csv", |b| {
        b.iter(|| {
            let ds = dataset::load_str(black_box(&raw)).expect("load");
            black_box(ds.len());
        })
    });
}

fn bench_impacts(c: &mut Criterion) {
    let ds = league_dataset();
    c.bench_function("compute_impacts_30d", |b| {
        b.iter(|| {
            let records = impact::compute_impacts(black_box(&ds), 30);
            black_box(records.len());
        })
    });
}

fn bench_comebacks(c: &mut Criterion) {
    let ds = league_dataset();
    c.bench_function("comeback_leaderboard", |b| {
        b.iter(|| {
            let board = comeback::leaderboard(black_box(&ds), 10);
            black_box(board.len());
        })
    });
}

fn bench_snapshot(c: &mut Criterion) {
    let ds = league_dataset();
    let selection = Selection::default().club("Arsenal");
    c.bench_function("dashboard_snapshot_club", |b| {
        b.iter(|| {
            let snap = DashboardSnapshot::build(
                black_box(&ds),
                black_box(&selection),
                DashboardParams::default(),
            );
            black_box(snap.kpis.observations);
        })
    });
}

criterion_group!(perf, bench_load, bench_impacts, bench_comebacks, bench_snapshot);
criterion_main!(perf);
