//! Process-wide counters for job outcomes and log-store reads.
//!
//! Call sites bump a [`Counter`]; batch and report boundaries call
//! [`Metrics::flush`], which logs every value in one `info!` event and hands
//! back the [`MetricsSnapshot`] it logged.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

pub static METRICS: Metrics = Metrics::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    JobsSucceeded,
    JobsFailed,
    /// A series read returned at least one point.
    SeriesLoaded,
    /// A series read came back empty: missing store, missing tag or unreadable.
    SeriesMissing,
}

impl Counter {
    const COUNT: usize = 4;

    fn slot(self) -> usize {
        match self {
            Counter::JobsSucceeded => 0,
            Counter::JobsFailed => 1,
            Counter::SeriesLoaded => 2,
            Counter::SeriesMissing => 3,
        }
    }
}

/// Counter values at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub jobs_succeeded: u64,
    pub jobs_failed: u64,
    pub series_loaded: u64,
    pub series_missing: u64,
}

pub struct Metrics {
    slots: [AtomicU64; Counter::COUNT],
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            slots: [const { AtomicU64::new(0) }; Counter::COUNT],
        }
    }

    pub fn inc(&self, counter: Counter) {
        self.slots[counter.slot()].fetch_add(1, Ordering::Relaxed);
        tracing::trace!(counter = ?counter, "counter incremented");
    }

    pub fn get(&self, counter: Counter) -> u64 {
        self.slots[counter.slot()].load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            jobs_succeeded: self.get(Counter::JobsSucceeded),
            jobs_failed: self.get(Counter::JobsFailed),
            series_loaded: self.get(Counter::SeriesLoaded),
            series_missing: self.get(Counter::SeriesMissing),
        }
    }

    /// Log the current values, tagged with the boundary that triggered the
    /// flush (`"batch"`, `"report"`).
    pub fn flush(&self, boundary: &'static str) -> MetricsSnapshot {
        let snapshot = self.snapshot();
        tracing::info!(
            event = "metrics.flush",
            boundary = boundary,
            jobs_succeeded = snapshot.jobs_succeeded,
            jobs_failed = snapshot.jobs_failed,
            series_loaded = snapshot.series_loaded,
            series_missing = snapshot.series_missing,
        );
        snapshot
    }
}
