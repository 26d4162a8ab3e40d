//! Per-run summary statistics over a scalar series.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::domain::ScalarSeries;
use crate::logstore::LogReader;

/// Number of trailing points averaged into [`RunSummary::trailing_average`].
pub const TRAILING_WINDOW: usize = 100;

/// Summary of one run's primary metric.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    pub run_label: String,
    pub max_value: f64,

    /// Mean of the last [`TRAILING_WINDOW`] points, or of all points when
    /// fewer were recorded.
    pub trailing_average: f64,
    pub sample_count: usize,
}

/// Summarize `tag` for one run, or `None` when the store has no data for it.
pub fn summarize(
    reader: &dyn LogReader,
    run_label: &str,
    log_location: &Path,
    tag: &str,
) -> Option<RunSummary> {
    let series = reader.read_series(log_location, tag);
    summarize_series(run_label, &series)
}

/// Summarize an already-loaded series.
pub fn summarize_series(run_label: &str, series: &ScalarSeries) -> Option<RunSummary> {
    if series.is_empty() {
        return None;
    }

    let max_value = series.values().fold(f64::NEG_INFINITY, f64::max);
    let window = &series.points[series.len().saturating_sub(TRAILING_WINDOW)..];
    let trailing_average = window.iter().map(|p| p.value).sum::<f64>() / window.len() as f64;

    Some(RunSummary {
        run_label: run_label.to_string(),
        max_value,
        trailing_average,
        sample_count: series.len(),
    })
}
