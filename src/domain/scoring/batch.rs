//! Batch output - the scored table and its on-screen summary

use std::collections::BTreeMap;

use serde::Serialize;

use super::{ProbabilitySource, ScoreOutcome};
use crate::domain::feature::DataTable;

pub const PREDICTION_COLUMN: &str = "prediction";
pub const RISK_PERCENT_COLUMN: &str = "risk_percent";

/// Smallest top-N view the summary will produce
pub const MIN_TOP_N: usize = 5;

/// Clamp a requested top-N to `MIN_TOP_N..=max`
pub fn clamp_top_n(requested: usize, max: usize) -> usize {
    requested.clamp(MIN_TOP_N, max.max(MIN_TOP_N))
}

/// Copy of the uploaded table with `prediction` and `risk_percent` appended
///
/// All rows are kept; thresholds only affect the summary view.
pub fn annotate(table: &DataTable, outcome: &ScoreOutcome) -> DataTable {
    let mut out = table.clone();

    let predictions = outcome.results.iter().map(|r| r.label.to_string()).collect();
    let risks = outcome
        .results
        .iter()
        .map(|r| {
            r.risk_percent()
                .map(|p| format!("{:.2}", p))
                .unwrap_or_else(|| "NA".to_string())
        })
        .collect();

    out.set_column(PREDICTION_COLUMN, predictions);
    out.set_column(RISK_PERCENT_COLUMN, risks);
    out
}

/// One row of the high-risk view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedRow {
    /// Zero-based index in the uploaded table
    pub row: usize,
    pub prediction: u8,
    pub risk_percent: f64,
    /// Original cells keyed by column name
    pub record: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub rows: usize,
    pub probability_source: ProbabilitySource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub mean_risk_percent: Option<f64>,
    pub max_risk_percent: Option<f64>,
    pub min_risk_percent: Option<f64>,
    pub threshold: f64,
    pub high_risk_count: usize,
    pub top: Vec<RankedRow>,
    pub label_counts: BTreeMap<u8, usize>,
}

impl BatchSummary {
    /// Summarise a scored table; `threshold` is in percent and `top_n` is used as given
    pub fn compute(table: &DataTable, outcome: &ScoreOutcome, threshold: f64, top_n: usize) -> Self {
        let risks: Vec<(usize, f64)> = outcome
            .results
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.risk_percent().map(|p| (i, p)))
            .collect();

        let mean = (!risks.is_empty())
            .then(|| risks.iter().map(|(_, p)| p).sum::<f64>() / risks.len() as f64);
        let max = risks.iter().map(|(_, p)| *p).reduce(f64::max);
        let min = risks.iter().map(|(_, p)| *p).reduce(f64::min);

        let mut high: Vec<(usize, f64)> = risks.iter().copied().filter(|(_, p)| *p >= threshold).collect();
        let high_risk_count = high.len();
        high.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        let top = high
            .into_iter()
            .take(top_n)
            .map(|(row, risk)| RankedRow {
                row,
                prediction: outcome.results[row].label,
                risk_percent: round2(risk),
                record: record_json(table, row),
            })
            .collect();

        let mut label_counts = BTreeMap::new();
        for result in &outcome.results {
            *label_counts.entry(result.label).or_insert(0) += 1;
        }

        Self {
            rows: outcome.results.len(),
            probability_source: outcome.source,
            note: outcome.source.note().map(str::to_string),
            mean_risk_percent: mean.map(round2),
            max_risk_percent: max.map(round2),
            min_risk_percent: min.map(round2),
            threshold,
            high_risk_count,
            top,
            label_counts,
        }
    }
}

fn record_json(table: &DataTable, row: usize) -> serde_json::Map<String, serde_json::Value> {
    table
        .headers()
        .iter()
        .enumerate()
        .map(|(col, header)| {
            let value = table.cell(row, col).unwrap_or_default().to_string();
            (header.clone(), serde_json::Value::String(value))
        })
        .collect()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
