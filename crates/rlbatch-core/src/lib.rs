//! rlbatch core library
//!
//! Domain types and the analysis side of an experiment batch:
//! - reading scalar series from per-run log stores
//! - per-run summary statistics
//! - cross-run comparison reports (SVG plots, markdown, JSON)
//! - CSV export of a single series
//! - batch file configuration, tracing setup and counters

pub mod aggregate;
pub mod config;
pub mod domain;
pub mod export;
pub mod logstore;
pub mod metrics;
pub mod obs;
pub mod plot;
pub mod reporting;
pub mod telemetry;

pub use aggregate::{summarize, summarize_series, RunSummary, TRAILING_WINDOW};
pub use config::{compute_batch_digest, BatchConfig, JobEntry, TrainerConfig, DEFAULT_BATCH_TOML};
pub use domain::{
    AgentKind, AgentProfile, JobDescriptor, JobOutcome, JobStatus, MetricTags, Result,
    RlbatchError, ScalarPoint, ScalarSeries, SPAWN_FAILURE_CODE,
};
pub use export::{export_scalars, render_csv};
pub use logstore::{read_series, JsonlLogReader, LogReader};
pub use metrics::{Counter, MetricsSnapshot, METRICS};
pub use obs::batch_span;
pub use reporting::{
    build_report, collect_results, render_console_summary, render_report_md, ComparisonReport,
    FamilyResults, ReportRequest, RunRef, UnavailableReason,
};
pub use telemetry::init_tracing;
