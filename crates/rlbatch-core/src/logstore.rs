//! Reading scalar time-series from a run's log store.
//!
//! A log location is either a single event file or a directory of event
//! files. Event files hold one JSON object per line:
//!
//! ```text
//! {"wall_time": 1718000000.5, "step": 12, "tag": "Reward", "value": -87.25}
//! ```
//!
//! Files in a directory are read in lexicographic name order and their lines
//! in file order, so the returned points follow the order in which the
//! trainer appended them. Nothing is sorted or de-duplicated.
//!
//! Every failure (missing location, unreadable file, malformed line) yields an
//! empty series: not every run emits every metric, and one broken store must
//! not block aggregation of the rest.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::domain::{ScalarPoint, ScalarSeries};
use crate::metrics::{Counter, METRICS};

/// File extension of scalar event files.
pub const EVENT_FILE_EXTENSION: &str = "jsonl";

/// Source of scalar time-series, keyed by log location and tag.
pub trait LogReader: Send + Sync {
    /// Read every point recorded under `tag`, or an empty series if there is
    /// no usable data.
    fn read_series(&self, log_location: &Path, tag: &str) -> ScalarSeries;
}

/// Reader for JSON Lines scalar event stores.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonlLogReader;

impl LogReader for JsonlLogReader {
    fn read_series(&self, log_location: &Path, tag: &str) -> ScalarSeries {
        read_series(log_location, tag)
    }
}

/// Read the series for `tag` from the store at `log_location`.
pub fn read_series(log_location: &Path, tag: &str) -> ScalarSeries {
    match load_points(log_location, tag) {
        Ok(points) => {
            if points.is_empty() {
                METRICS.inc(Counter::SeriesMissing);
                debug!(location = ?log_location, tag = %tag, "tag not present in log store");
            } else {
                METRICS.inc(Counter::SeriesLoaded);
            }
            ScalarSeries {
                tag: tag.to_string(),
                points,
            }
        }
        Err(StoreError::NotFound(path)) => {
            METRICS.inc(Counter::SeriesMissing);
            debug!(location = ?path, tag = %tag, "log location does not exist");
            ScalarSeries::empty(tag)
        }
        Err(e) => {
            METRICS.inc(Counter::SeriesMissing);
            warn!(location = ?log_location, tag = %tag, error = %e, "unreadable log store");
            ScalarSeries::empty(tag)
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum StoreError {
    #[error("log location not found: {0:?}")]
    NotFound(PathBuf),

    #[error("io error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed event in {path:?} at line {line}: {source}")]
    Malformed {
        path: PathBuf,
        line: usize,
        source: serde_json::Error,
    },
}

#[derive(Debug, Deserialize)]
struct ScalarEvent {
    wall_time: f64,
    step: i64,
    tag: String,
    value: f64,
}

fn load_points(log_location: &Path, tag: &str) -> Result<Vec<ScalarPoint>, StoreError> {
    let mut points = Vec::new();
    for file in event_files(log_location)? {
        parse_event_file(&file, tag, &mut points)?;
    }
    Ok(points)
}

fn event_files(log_location: &Path) -> Result<Vec<PathBuf>, StoreError> {
    let io_err = |source| StoreError::Io {
        path: log_location.to_path_buf(),
        source,
    };

    let meta = match std::fs::metadata(log_location) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(StoreError::NotFound(log_location.to_path_buf()))
        }
        Err(e) => return Err(io_err(e)),
    };

    if meta.is_file() {
        return Ok(vec![log_location.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(log_location).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        let path = entry.path();
        if path.is_file() && is_event_file(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Only `.jsonl` files are event files; binary TensorBoard records and other
/// artifacts sharing the run directory are skipped.
fn is_event_file(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(EVENT_FILE_EXTENSION)
}

fn parse_event_file(
    path: &Path,
    tag: &str,
    points: &mut Vec<ScalarPoint>,
) -> Result<(), StoreError> {
    let content = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    for (idx, chunk) in content.split_inclusive('\n').enumerate() {
        // A writer may still be appending: the last line is only complete
        // once its newline is on disk.
        if !chunk.ends_with('\n') {
            debug!(file = ?path, line = idx + 1, "skipping incomplete trailing line");
            break;
        }
        let line = chunk.trim();
        if line.is_empty() {
            continue;
        }
        let event: ScalarEvent =
            serde_json::from_str(line).map_err(|source| StoreError::Malformed {
                path: path.to_path_buf(),
                line: idx + 1,
                source,
            })?;
        if event.tag == tag {
            points.push(ScalarPoint {
                wall_time: event.wall_time,
                step: event.step,
                value: event.value,
            });
        }
    }
    Ok(())
}
