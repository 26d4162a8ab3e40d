//! Domain-level error taxonomy for rlbatch.
//!
//! Job failures and missing metric data are not errors: they surface as
//! `JobOutcome` values and absent summaries. Only faults that prevent a batch
//! or a report from being produced at all are represented here.

use std::path::PathBuf;

/// rlbatch domain errors.
#[derive(Debug, thiserror::Error)]
pub enum RlbatchError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid batch: {0}")]
    InvalidBatch(String),

    #[error("failed to write report artifact {path:?}: {source}")]
    ReportWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("toml parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl RlbatchError {
    /// Wrap an I/O failure on a report artifact with its path.
    pub fn report_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RlbatchError::ReportWrite {
            path: path.into(),
            source,
        }
    }
}

/// Result type for rlbatch domain operations.
pub type Result<T> = std::result::Result<T, RlbatchError>;
