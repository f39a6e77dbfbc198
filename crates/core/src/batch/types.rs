//! Types for the batch orchestrator.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::StorageError;

/// Batch-fatal errors. Per-job problems never surface here; they become
/// failure outcomes instead.
#[derive(Debug, Error)]
pub enum BatchError {
    /// No jobs were submitted.
    #[error("batch contains no jobs")]
    EmptyBatch,

    /// More jobs than the configured maximum.
    #[error("batch contains {count} jobs, the maximum is {max}")]
    TooManyJobs { count: usize, max: usize },

    /// Scratch storage cannot be used at all.
    #[error("storage unavailable: {0}")]
    Storage(#[from] StorageError),
}

/// Snapshot of the orchestrator's worker pool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStatus {
    /// Jobs currently converting.
    pub active_jobs: usize,
    /// Jobs waiting for a free slot.
    pub queued_jobs: usize,
    /// Default concurrency limit.
    pub max_concurrent: usize,
    /// Jobs finished since startup (success or failure).
    pub total_processed: u64,
    /// Jobs that ended in failure since startup.
    pub total_failed: u64,
    /// Scratch pairs currently held.
    pub active_scratch: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(BatchError::EmptyBatch.to_string(), "batch contains no jobs");
        assert_eq!(
            BatchError::TooManyJobs { count: 11, max: 10 }.to_string(),
            "batch contains 11 jobs, the maximum is 10"
        );
    }

    #[test]
    fn test_pool_status_serialization() {
        let status = PoolStatus {
            active_jobs: 2,
            queued_jobs: 3,
            max_concurrent: 2,
            total_processed: 10,
            total_failed: 1,
            active_scratch: 2,
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["active_jobs"], 2);
        assert_eq!(json["queued_jobs"], 3);
    }
}
