use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};
use serde::Serialize;

use crate::comeback::ComebackRecord;
use crate::dashboard::{AgeDropPoint, DashboardParams, DashboardSnapshot, HeatCell, Kpis, Panel};
use crate::dataset::LoadReport;
use crate::filter::Selection;
use crate::impact::{InjuryImpactRecord, RatingColumnDrop};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportReport {
    pub kpi_rows: usize,
    pub impact_rows: usize,
    pub comeback_rows: usize,
    pub heatmap_rows: usize,
    pub age_vs_drop_rows: usize,
    pub rating_column_rows: usize,
    pub notices: Vec<String>,
}

pub fn export_snapshot_xlsx(path: &Path, snapshot: &DashboardSnapshot) -> Result<ExportReport> {
    let kpi_rows = kpi_rows(&snapshot.kpis, snapshot.params, &snapshot.selection);
    let impact_rows = panel_rows(
        &snapshot.impacts,
        &[
            "Player",
            "Team",
            "Injury Start",
            "Injury End",
            "Before Perf",
            "During Perf",
            "Drop Index",
            "Matches Before",
            "Matches During",
        ],
        impact_row,
    );
    let comeback_rows = panel_rows(
        &snapshot.comebacks,
        &["Player", "Team", "Rating Before", "Rating After", "Change"],
        comeback_row,
    );
    let heatmap_rows = panel_rows(
        &snapshot.heatmap,
        &["Club", "Month", "Injuries"],
        heat_row,
    );
    let age_rows = panel_rows(
        &snapshot.age_vs_drop,
        &["Player", "Team", "Age", "Drop Index"],
        age_drop_row,
    );
    let rating_rows = panel_rows(
        &snapshot.rating_columns,
        &["Player", "Team", "Injury Start", "Rating Before", "Rating After", "Drop"],
        rating_column_row,
    );

    let mut workbook = Workbook::new();
    for (name, rows) in [
        ("Kpis", &kpi_rows),
        ("Impact", &impact_rows),
        ("Comeback", &comeback_rows),
        ("Heatmap", &heatmap_rows),
        ("AgeVsDrop", &age_rows),
        ("RatingColumns", &rating_rows),
    ] {
        let sheet = workbook.add_worksheet();
        sheet.set_name(name)?;
        write_rows(sheet, rows).with_context(|| format!("sheet {name}"))?;
    }
    workbook
        .save(path)
        .with_context(|| format!("save workbook {}", path.display()))?;

    Ok(ExportReport {
        kpi_rows: kpi_rows.len().saturating_sub(1),
        impact_rows: data_rows(&snapshot.impacts),
        comeback_rows: data_rows(&snapshot.comebacks),
        heatmap_rows: data_rows(&snapshot.heatmap),
        age_vs_drop_rows: data_rows(&snapshot.age_vs_drop),
        rating_column_rows: data_rows(&snapshot.rating_columns),
        notices: snapshot.notices(),
    })
}

fn data_rows<T>(panel: &Panel<Vec<T>>) -> usize {
    panel.ready().map(Vec::len).unwrap_or(0)
}

/// Header plus one row per record, or a single message row for an unavailable panel.
fn panel_rows<T>(
    panel: &Panel<Vec<T>>,
    header: &[&str],
    to_row: impl Fn(&T) -> Vec<String>,
) -> Vec<Vec<String>> {
    match panel {
        Panel::Ready(records) => {
            let mut rows = vec![header.iter().map(|h| h.to_string()).collect::<Vec<_>>()];
            rows.extend(records.iter().map(to_row));
            rows
        }
        Panel::Unavailable(why) => vec![vec![why.to_string()]],
    }
}

fn kpi_rows(kpis: &Kpis, params: DashboardParams, selection: &Selection) -> Vec<Vec<String>> {
    let pair = |k: &str, v: String| vec![k.to_string(), v];
    vec![
        pair("Metric", "Value".to_string()),
        pair("Club", selection.club.value().unwrap_or("All").to_string()),
        pair("Season", selection.season.value().unwrap_or("All").to_string()),
        pair("Player", selection.player.value().unwrap_or("All").to_string()),
        pair("Window (days)", params.window_days.to_string()),
        pair("Observations", kpis.observations.to_string()),
        pair("Injuries", kpis.injury_count.to_string()),
        pair("Matches", kpis.match_count.to_string()),
        pair("Avg Rating", fmt_opt(kpis.avg_rating)),
        pair("Avg Goal Diff", fmt_opt(kpis.avg_goal_diff)),
    ]
}

fn impact_row(r: &InjuryImpactRecord) -> Vec<String> {
    vec![
        r.player.clone(),
        r.team.clone(),
        r.injury_start.to_string(),
        r.injury_end.to_string(),
        format!("{:.3}", r.before_perf),
        format!("{:.3}", r.during_perf),
        format!("{:.3}", r.performance_drop_index),
        r.matches_before.to_string(),
        r.matches_during.to_string(),
    ]
}

fn comeback_row(r: &ComebackRecord) -> Vec<String> {
    vec![
        r.player.clone(),
        r.team.clone(),
        format!("{:.2}", r.rating_before),
        format!("{:.2}", r.rating_after),
        format!("{:+.2}", r.rating_change),
    ]
}

fn heat_row(c: &HeatCell) -> Vec<String> {
    vec![c.club.clone(), c.month.clone(), c.injury_count.to_string()]
}

fn age_drop_row(p: &AgeDropPoint) -> Vec<String> {
    vec![
        p.player.clone(),
        p.team.clone(),
        format!("{:.0}", p.age),
        format!("{:.3}", p.performance_drop_index),
    ]
}

fn rating_column_row(r: &RatingColumnDrop) -> Vec<String> {
    vec![
        r.player.clone(),
        r.team.clone(),
        r.injury_start.map(|d| d.to_string()).unwrap_or_default(),
        format!("{:.2}", r.rating_before),
        format!("{:.2}", r.rating_after),
        format!("{:.2}", r.rating_drop),
    ]
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.2}")).unwrap_or_else(|| "-".to_string())
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32, col_idx as u16, value)
                .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}

/// Machine-readable summary printed by the headless report.
#[derive(Debug, Serialize)]
pub struct ReportJson<'a> {
    pub source: String,
    pub load: &'a LoadReport,
    pub params: DashboardParams,
    pub kpis: &'a Kpis,
    pub impacts: &'a [InjuryImpactRecord],
    pub comebacks: &'a [ComebackRecord],
    pub age_vs_drop: &'a [AgeDropPoint],
    pub notices: Vec<String>,
}

impl<'a> ReportJson<'a> {
    pub fn new(source: &Path, load: &'a LoadReport, snapshot: &'a DashboardSnapshot) -> Self {
        Self {
            source: source.display().to_string(),
            load,
            params: snapshot.params,
            kpis: &snapshot.kpis,
            impacts: snapshot.impacts.ready().map(Vec::as_slice).unwrap_or(&[]),
            comebacks: snapshot.comebacks.ready().map(Vec::as_slice).unwrap_or(&[]),
            age_vs_drop: snapshot.age_vs_drop.ready().map(Vec::as_slice).unwrap_or(&[]),
            notices: snapshot.notices(),
        }
    }

    pub fn to_pretty_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("serialize report")
    }
}
