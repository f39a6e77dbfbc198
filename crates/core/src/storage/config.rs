//! Configuration for scratch storage.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where scratch and published files live.
///
/// The three working directories are fixed subdirectories of `root`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory shared by all batches and the retention sweeper.
    #[serde(default = "default_root")]
    pub root: PathBuf,
}

fn default_root() -> PathBuf {
    std::env::temp_dir().join("reelforge")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
        }
    }
}

impl StorageConfig {
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Inbound staging: uploaded payloads waiting for conversion.
    pub fn inbound_dir(&self) -> PathBuf {
        self.root.join("inbound")
    }

    /// Outbound staging: engine output and intermediate files.
    pub fn outbound_dir(&self) -> PathBuf {
        self.root.join("outbound")
    }

    /// Published outputs served as download links.
    pub fn downloads_dir(&self) -> PathBuf {
        self.root.join("downloads")
    }

    /// Every directory the retention sweeper should inspect.
    pub fn sweep_roots(&self) -> Vec<PathBuf> {
        vec![self.inbound_dir(), self.outbound_dir(), self.downloads_dir()]
    }
}
