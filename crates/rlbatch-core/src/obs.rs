//! Structured observability hooks for batch and job lifecycle events.
//!
//! This module provides:
//! - A batch-scoped tracing span via [`batch_span`]
//! - Emission functions for key lifecycle events: batch start/finish, job
//!   start/finish, report written
//!
//! Events are emitted at `info!` level (filter with `RUST_LOG`).

use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Span that scopes every event of one batch to its id and digest.
///
/// # Example
///
/// ```ignore
/// run_jobs().instrument(batch_span(&batch_id, &digest)).await;
/// ```
pub fn batch_span(batch_id: &str, batch_digest: &str) -> tracing::Span {
    tracing::info_span!("rlbatch.batch", batch_id = %batch_id, batch_digest = %batch_digest)
}

pub fn emit_batch_started(batch_id: &str, total_jobs: usize) {
    info!(event = "batch.started", batch_id = %batch_id, total_jobs = total_jobs);
}

pub fn emit_batch_finished(batch_id: &str, succeeded: usize, failed: usize, duration: Duration) {
    info!(
        event = "batch.finished",
        batch_id = %batch_id,
        succeeded = succeeded,
        failed = failed,
        duration_ms = duration.as_millis() as u64,
    );
}

/// Emit event: job started with its position in the batch.
pub fn emit_job_started(index: usize, total: usize, name: &str, agent: &str) {
    info!(
        event = "job.started",
        index = index,
        total = total,
        name = %name,
        agent = %agent,
    );
}

/// Emit event: job finished with exit code and duration.
pub fn emit_job_finished(name: &str, exit_code: i32, duration: Duration, success: bool) {
    info!(
        event = "job.finished",
        name = %name,
        exit_code = exit_code,
        duration_ms = duration.as_millis() as u64,
        success = success,
    );
}

/// Emit event: job could not be spawned (warning level).
pub fn emit_job_spawn_failed(name: &str, error: &dyn std::fmt::Display) {
    tracing::warn!(event = "job.spawn_failed", name = %name, error = %error);
}

pub fn emit_report_written(path: &Path, families: usize, rows: usize) {
    info!(
        event = "report.written",
        path = %path.display(),
        families = families,
        rows = rows,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_span_create() {
        let span = batch_span("test-batch-id", "digest");
        let _entered = span.enter();
        emit_batch_started("test-batch-id", 2);
    }
}
