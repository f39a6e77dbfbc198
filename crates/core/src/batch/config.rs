//! Configuration for the batch orchestrator.

use serde::{Deserialize, Serialize};

/// Limits applied to every batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Maximum files accepted in one batch.
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    /// Jobs allowed to run at the same time.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Whole-batch deadline in seconds. Jobs still queued or running when it
    /// passes are cancelled.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_max_files() -> usize {
    10
}

fn default_concurrency() -> usize {
    2
}

fn default_timeout() -> u64 {
    1800 // 30 minutes
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_files: default_max_files(),
            concurrency: default_concurrency(),
            timeout_secs: default_timeout(),
        }
    }
}

impl BatchConfig {
    /// Sets the concurrency limit.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Sets the batch deadline in seconds.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}
