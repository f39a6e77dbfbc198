//! Types for the converter module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::job::TargetFormat;

/// Result of a successful conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// Format that was produced.
    pub format: TargetFormat,
    /// Where the engine wrote the output (inside the job's scratch pair).
    pub output_path: PathBuf,
    /// Size of the output file.
    pub size_bytes: u64,
    /// Wall-clock time spent in the engine.
    pub duration_ms: u64,
}
