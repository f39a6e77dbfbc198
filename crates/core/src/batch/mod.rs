//! Batch orchestration: runs many conversion jobs with bounded parallelism.
//!
//! A batch is a list of [`JobDescriptor`](crate::job::JobDescriptor)s. Every
//! job gets exactly one [`JobOutcome`](crate::job::JobOutcome) in the result,
//! at the same index it was submitted at. One job failing never affects the
//! others. Only an empty batch, an oversized batch or unusable storage fail the
//! batch as a whole.

mod config;
mod orchestrator;
mod types;

pub use config::BatchConfig;
pub use orchestrator::BatchOrchestrator;
pub use types::{BatchError, PoolStatus};
