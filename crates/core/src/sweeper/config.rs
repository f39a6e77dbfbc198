//! Configuration for the retention sweeper.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// When and how aggressively leftover scratch files are reaped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweeperConfig {
    /// Whether the background sweeper runs at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Seconds between sweeps.
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Files older than this many seconds are removed.
    #[serde(default = "default_retention")]
    pub retention_secs: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_interval() -> u64 {
    3600 // hourly
}

fn default_retention() -> u64 {
    86400 // 24 hours
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            interval_secs: default_interval(),
            retention_secs: default_retention(),
        }
    }
}

impl SweeperConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }
}
