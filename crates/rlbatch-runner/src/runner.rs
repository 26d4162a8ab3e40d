//! Trainer job execution with live output streaming.

use async_trait::async_trait;
use rlbatch_core::{
    obs, Counter, JobDescriptor, JobOutcome, JobStatus, METRICS, SPAWN_FAILURE_CODE,
};
use std::io::{BufRead, BufReader, Read, Write};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::trainer::TrainerCommand;

/// Width of the narration banners.
const BANNER_WIDTH: usize = 60;

/// Destination for console lines. Every line must be delivered (and flushed)
/// before `line` returns.
pub trait ConsoleSink: Send + Sync {
    fn line(&self, line: &str);
}

/// Writes each line to stdout and flushes immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutSink;

impl ConsoleSink for StdoutSink {
    fn line(&self, line: &str) {
        let mut out = std::io::stdout().lock();
        // A closed stdout must not abort the batch.
        let _ = writeln!(out, "{line}");
        let _ = out.flush();
    }
}

/// Keeps every line in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the lines received so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }
}

impl ConsoleSink for MemorySink {
    fn line(&self, line: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line.to_string());
        }
    }
}

/// Executes one job and reports its outcome.
#[async_trait]
pub trait JobExecutor: Send + Sync {
    /// Run `descriptor` once. Failures are reported in the outcome, never
    /// returned as errors.
    async fn run(&self, descriptor: &JobDescriptor) -> JobOutcome;
}

/// Spawns the trainer for each job and streams its output to a sink.
pub struct JobRunner {
    trainer: TrainerCommand,
    sink: Arc<dyn ConsoleSink>,
}

impl JobRunner {
    pub fn new(trainer: TrainerCommand, sink: Arc<dyn ConsoleSink>) -> Self {
        Self { trainer, sink }
    }

    pub fn trainer(&self) -> &TrainerCommand {
        &self.trainer
    }

    /// Run one trainer process to completion.
    ///
    /// stdout and stderr share one pipe; its lines are forwarded to the sink
    /// as they arrive and collected into the outcome's console log.
    pub async fn run_job(&self, descriptor: &JobDescriptor) -> JobOutcome {
        let sink = self.sink.as_ref();
        sink.line("");
        sink.line(&"=".repeat(BANNER_WIDTH));
        sink.line(&format!("Starting job: {}", descriptor.display_name));
        sink.line(&format!("Agent: {}", descriptor.agent_kind));
        sink.line(&format!(
            "Config: {}",
            descriptor.config_reference.display()
        ));
        sink.line(&"=".repeat(BANNER_WIDTH));
        sink.line(&format!("Running: {}", self.trainer.display(descriptor)));

        let start = Instant::now();
        let mut console_log = Vec::new();

        let spawned = std::io::pipe().and_then(|(reader, writer)| {
            let child = self.trainer.build(descriptor, &writer)?.spawn()?;
            // Only the child may hold the write end, or the reader never sees EOF.
            drop(writer);
            Ok((child, reader))
        });
        let (mut child, output) = match spawned {
            Ok(spawned) => spawned,
            Err(e) => {
                let duration = start.elapsed();
                obs::emit_job_spawn_failed(&descriptor.display_name, &e);
                let message = format!("failed to start trainer: {e}");
                sink.line(&format!("Job failed to start: {e}"));
                console_log.push(message);
                return self.finish(descriptor, SPAWN_FAILURE_CODE, duration, console_log);
            }
        };

        let (tx, mut rx) = mpsc::unbounded_channel();
        tokio::task::spawn_blocking(move || forward_lines(output, tx));

        while let Some(line) = rx.recv().await {
            sink.line(&line);
            console_log.push(line);
        }

        let exit_code = match child.wait().await {
            Ok(status) => exit_code_of(status),
            Err(e) => {
                warn!(job = %descriptor.display_name, error = %e, "failed to wait for trainer");
                console_log.push(format!("failed to wait for trainer: {e}"));
                SPAWN_FAILURE_CODE
            }
        };
        let duration = start.elapsed();

        sink.line(&format!(
            "Job finished in {:.2} seconds",
            duration.as_secs_f64()
        ));
        self.finish(descriptor, exit_code, duration, console_log)
    }

    fn finish(
        &self,
        descriptor: &JobDescriptor,
        exit_code: i32,
        duration: std::time::Duration,
        console_log: Vec<String>,
    ) -> JobOutcome {
        let exit_status = JobStatus::from_code(exit_code);
        let success = exit_status == JobStatus::Success;
        if success {
            METRICS.inc(Counter::JobsSucceeded);
            self.sink.line("Job succeeded");
        } else {
            METRICS.inc(Counter::JobsFailed);
            self.sink
                .line(&format!("Job failed (exit code: {exit_code})"));
        }
        obs::emit_job_finished(&descriptor.display_name, exit_code, duration, success);

        JobOutcome {
            descriptor: descriptor.clone(),
            exit_status,
            duration,
            console_log,
        }
    }
}

#[async_trait]
impl JobExecutor for JobRunner {
    async fn run(&self, descriptor: &JobDescriptor) -> JobOutcome {
        self.run_job(descriptor).await
    }
}

/// Forward newline-terminated lines from `stream` until EOF.
///
/// Bytes that are not valid UTF-8 are replaced rather than dropped.
fn forward_lines(stream: impl Read, tx: mpsc::UnboundedSender<String>) {
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end_matches(['\n', '\r']).to_string();
                if tx.send(line).is_err() {
                    break;
                }
            }
            Err(e) => {
                debug!(error = %e, "trainer output stream closed with error");
                break;
            }
        }
    }
}

/// Exit code of a finished process; signals map to `128 + signal`.
fn exit_code_of(status: std::process::ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    SPAWN_FAILURE_CODE
}
