//! Batch orchestration: sequential job execution followed by reporting.

use rlbatch_core::{
    build_report, compute_batch_digest, obs, AgentKind, ComparisonReport, JobDescriptor,
    JobOutcome, LogReader, MetricTags, ReportRequest, Result, RunRef, METRICS,
};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, Instrument};
use uuid::Uuid;

use crate::runner::{ConsoleSink, JobExecutor};

/// Result of a complete batch.
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub batch_id: String,

    /// Digest of the ordered job definitions.
    pub batch_digest: String,

    /// One outcome per submitted job, in submission order.
    pub outcomes: Vec<JobOutcome>,
    pub duration: Duration,
}

impl BatchResult {
    pub fn succeeded_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.succeeded()).count()
    }

    /// Report request covering every job of the batch.
    ///
    /// Failed jobs are passed without a log location so the report lists them
    /// as unavailable instead of summarizing a partial store.
    pub fn report_request(
        &self,
        output_dir: impl Into<PathBuf>,
        metric_tags: BTreeMap<AgentKind, MetricTags>,
    ) -> ReportRequest {
        let runs = self
            .outcomes
            .iter()
            .map(|o| RunRef {
                label: o.descriptor.display_name.clone(),
                agent_kind: o.descriptor.agent_kind,
                log_location: if o.succeeded() {
                    o.descriptor.log_dir.clone()
                } else {
                    None
                },
            })
            .collect();

        let mut request = ReportRequest::new(runs, output_dir);
        request.metric_tags = metric_tags;
        request.batch_digest = Some(self.batch_digest.clone());
        request
    }
}

/// Drives a declared sequence of jobs through an executor, one at a time.
pub struct BatchOrchestrator<E: JobExecutor> {
    executor: E,
    sink: Arc<dyn ConsoleSink>,
}

impl<E: JobExecutor> BatchOrchestrator<E> {
    pub fn new(executor: E, sink: Arc<dyn ConsoleSink>) -> Self {
        Self { executor, sink }
    }

    /// Run every job in order, pausing `inter_job_delay` between jobs.
    ///
    /// A failed job never stops the batch.
    pub async fn run_batch(
        &self,
        descriptors: &[JobDescriptor],
        inter_job_delay: Duration,
    ) -> BatchResult {
        let batch_id = Uuid::new_v4().to_string();
        let batch_digest = compute_batch_digest(descriptors);
        let span = obs::batch_span(&batch_id, &batch_digest);
        self.execute(batch_id, batch_digest, descriptors, inter_job_delay)
            .instrument(span)
            .await
    }

    async fn execute(
        &self,
        batch_id: String,
        batch_digest: String,
        descriptors: &[JobDescriptor],
        inter_job_delay: Duration,
    ) -> BatchResult {
        let start = Instant::now();
        let total = descriptors.len();
        obs::emit_batch_started(&batch_id, total);
        self.sink.line("Starting experiment batch...");
        self.sink.line(&format!("Total jobs: {total}"));

        let mut outcomes = Vec::with_capacity(total);
        for (idx, descriptor) in descriptors.iter().enumerate() {
            let position = idx + 1;
            self.sink.line("");
            self.sink.line(&format!("Job {position}/{total}"));
            obs::emit_job_started(
                position,
                total,
                &descriptor.display_name,
                descriptor.agent_kind.selector(),
            );

            let outcome = self.executor.run(descriptor).await;
            outcomes.push(outcome);

            if position < total && !inter_job_delay.is_zero() {
                self.sink.line("");
                self.sink.line(&format!(
                    "Waiting {} seconds before the next job...",
                    inter_job_delay.as_secs_f64()
                ));
                tokio::time::sleep(inter_job_delay).await;
            }
        }

        let result = BatchResult {
            batch_id,
            batch_digest,
            outcomes,
            duration: start.elapsed(),
        };

        let banner = "=".repeat(60);
        self.sink.line("");
        self.sink.line(&banner);
        self.sink.line("ALL JOBS FINISHED");
        self.sink.line(&banner);
        self.sink.line(&format!(
            "Succeeded: {}  Failed: {}",
            result.succeeded_count(),
            result.failed_count()
        ));

        obs::emit_batch_finished(
            &result.batch_id,
            result.succeeded_count(),
            result.failed_count(),
            result.duration,
        );
        METRICS.flush("batch");
        result
    }

    /// Build the comparison report for a finished batch.
    pub fn report(
        &self,
        reader: &dyn LogReader,
        result: &BatchResult,
        output_dir: impl Into<PathBuf>,
        metric_tags: BTreeMap<AgentKind, MetricTags>,
    ) -> Result<ComparisonReport> {
        let request = result.report_request(output_dir, metric_tags);
        info!(
            batch_id = %result.batch_id,
            runs = request.runs.len(),
            output = ?request.output_dir,
            "Building comparison report"
        );
        let report = build_report(reader, &request)?;
        self.sink.line("");
        self.sink.line(&format!(
            "Report written to {}",
            report.report_path.display()
        ));
        for plot in &report.plot_paths {
            self.sink.line(&format!("Plot written to {}", plot.display()));
        }
        Ok(report)
    }
}
