//! Terminal and JSON renderings of datasets and summaries.
//!
//! Output depends only on the input values, so unchanged input renders to
//! identical bytes.

pub mod table;

use crate::dataset::Dataset;
use crate::errors::Diagnostics;
use crate::stats::SummaryTable;
use serde::Serialize;

pub use table::TextTable;

const NULL: &str = "-";

pub fn dataset_text(dataset: &Dataset) -> String {
    let mut headers = vec!["Phase", "System", "Nodes", "Workload", "Try"];
    let metrics = crate::model::MetricField::ALL;
    headers.extend(metrics.iter().map(|m| m.column()));

    let mut table = TextTable::new(headers);
    for r in dataset {
        let mut row = vec![
            r.phase.to_string(),
            r.system.clone(),
            r.nodes.to_string(),
            r.workload.to_string(),
            r.trial.to_string(),
        ];
        row.extend(
            metrics
                .iter()
                .map(|m| r.metric(*m).map_or_else(|| NULL.to_string(), |v| v.to_string())),
        );
        table.push(row);
    }
    table.render()
}

pub fn summary_text(summary: &SummaryTable) -> String {
    let mut headers: Vec<&str> = summary.group_by.iter().map(|g| g.as_str()).collect();
    headers.extend(["Metric", "mean", "ci", "n"]);

    let mut table = TextTable::new(headers);
    for row in &summary.rows {
        let mut cells: Vec<String> = row
            .group
            .entries()
            .iter()
            .map(|(_, v)| v.to_string())
            .collect();
        cells.push(row.metric.column().to_string());
        cells.push(fixed(row.stat.mean));
        cells.push(fixed(row.stat.half_width));
        cells.push(row.stat.n.to_string());
        table.push(cells);
    }

    let mut out = format!(
        "confidence: {}  groups by: {}\n",
        summary.confidence,
        if summary.group_by.is_empty() {
            "(none)".to_string()
        } else {
            summary
                .group_by
                .iter()
                .map(|g| g.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        }
    );
    out.push_str(&table.render());
    out
}

fn fixed(v: Option<f64>) -> String {
    v.map_or_else(|| NULL.to_string(), |v| format!("{v:.4}"))
}

pub fn to_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    let mut s = serde_json::to_string_pretty(value)?;
    s.push('\n');
    Ok(s)
}

/// One-line count per diagnostic kind, `None` when there is nothing to report.
pub fn diagnostics_summary(diags: &Diagnostics) -> Option<String> {
    let counts = diags.count_by_kind();
    if counts.is_empty() {
        return None;
    }
    let parts: Vec<String> = counts
        .iter()
        .map(|(kind, n)| format!("{}={}", kind.code(), n))
        .collect();
    Some(format!(
        "{} diagnostic(s), {} warning(s): {}",
        diags.len(),
        diags.warning_count(),
        parts.join(", ")
    ))
}
