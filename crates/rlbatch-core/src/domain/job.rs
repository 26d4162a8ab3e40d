//! Job descriptors and outcomes.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::agent::AgentKind;

/// Exit code recorded when the trainer process could not be started.
pub const SPAWN_FAILURE_CODE: i32 = -1;

/// One unit of orchestrated work: a trainer invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobDescriptor {
    /// Agent family passed to the trainer.
    pub agent_kind: AgentKind,

    /// Configuration source handed to the trainer as-is.
    pub config_reference: PathBuf,

    /// Human-readable label used in narration and reports.
    pub display_name: String,

    /// Where the trainer persists this run's scalar log store.
    pub log_dir: Option<PathBuf>,
}

impl JobDescriptor {
    pub fn new(
        agent_kind: AgentKind,
        config_reference: impl Into<PathBuf>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            agent_kind,
            config_reference: config_reference.into(),
            display_name: display_name.into(),
            log_dir: None,
        }
    }

    /// Attach the run's log store location.
    pub fn with_log_dir(mut self, log_dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(log_dir.into());
        self
    }
}

/// Final status of a trainer process.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobStatus {
    Success,
    Failed { code: i32 },
}

impl JobStatus {
    /// Map a process exit code onto a status.
    pub fn from_code(code: i32) -> Self {
        if code == 0 {
            JobStatus::Success
        } else {
            JobStatus::Failed { code }
        }
    }
}

/// Result of running one job. Created once by the job runner, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobOutcome {
    pub descriptor: JobDescriptor,
    pub exit_status: JobStatus,
    pub duration: Duration,

    /// Combined console output, in the order it was received.
    pub console_log: Vec<String>,
}

impl JobOutcome {
    /// Whether the trainer exited with code 0.
    pub fn succeeded(&self) -> bool {
        self.exit_status == JobStatus::Success
    }

    /// Exit code, with 0 for success.
    pub fn exit_code(&self) -> i32 {
        match self.exit_status {
            JobStatus::Success => 0,
            JobStatus::Failed { code } => code,
        }
    }
}
