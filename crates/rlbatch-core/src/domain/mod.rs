//! rlbatch domain model: agent families, jobs and scalar series.

pub mod agent;
pub mod error;
pub mod job;
pub mod series;

pub use agent::{AgentKind, AgentProfile, MetricTags};
pub use error::{Result, RlbatchError};
pub use job::{JobDescriptor, JobOutcome, JobStatus, SPAWN_FAILURE_CODE};
pub use series::{ScalarPoint, ScalarSeries};
