//! Export of a single scalar series to CSV.

use std::fmt::Write as _;
use std::path::Path;

use crate::domain::{Result, RlbatchError, ScalarSeries};
use crate::logstore::LogReader;

pub const CSV_HEADER: &str = "wall_time,step,value";

/// Render a series as CSV with a header row.
pub fn render_csv(series: &ScalarSeries) -> String {
    let mut out = String::with_capacity(32 * (series.len() + 1));
    out.push_str(CSV_HEADER);
    out.push('\n');
    for p in &series.points {
        let _ = writeln!(out, "{},{},{}", p.wall_time, p.step, p.value);
    }
    out
}

/// Export every point of `tag` at `log_location` to `output`.
///
/// Returns the number of data rows written. A missing tag still produces a
/// header-only file.
pub fn export_scalars(
    reader: &dyn LogReader,
    log_location: &Path,
    tag: &str,
    output: &Path,
) -> Result<usize> {
    let series = reader.read_series(log_location, tag);
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| RlbatchError::report_write(parent, e))?;
    }
    std::fs::write(output, render_csv(&series))
        .map_err(|e| RlbatchError::report_write(output, e))?;
    tracing::info!(
        event = "series.exported",
        tag = %tag,
        rows = series.len(),
        output = ?output,
    );
    Ok(series.len())
}
