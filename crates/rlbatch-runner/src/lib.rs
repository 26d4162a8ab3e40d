//! rlbatch runner - sequential training batches
//!
//! Provides a batch orchestrator that:
//! - Launches one trainer process per job, strictly in order
//! - Streams trainer output to the console line by line
//! - Records success/failure and timing per job
//! - Hands the finished batch to the report builder

pub mod orchestrator;
pub mod runner;
pub mod trainer;

// Re-export key types
pub use orchestrator::{BatchOrchestrator, BatchResult};
pub use runner::{ConsoleSink, JobExecutor, JobRunner, MemorySink, StdoutSink};
pub use trainer::TrainerCommand;
