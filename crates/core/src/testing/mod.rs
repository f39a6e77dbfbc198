//! Testing utilities and mock implementations.
//!
//! The mock converter lets batch and HTTP tests run without an `ffmpeg`
//! binary on the machine.
//!
//! # Example
//!
//! ```rust,ignore
//! use reelforge_core::testing::{fixtures, MockConverter};
//!
//! let converter = Arc::new(MockConverter::new());
//! let jobs = fixtures::jobs(&["a.mp4", "b.mov"], "gif");
//! let result = orchestrator.run_batch(jobs, 2).await?;
//! ```

mod mock_converter;

pub use mock_converter::{MockConverter, RecordedConversion};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::job::JobDescriptor;

    /// Bytes used as a stand-in for an uploaded video.
    pub const SAMPLE_VIDEO: &[u8] = b"\x00\x00\x00\x18ftypmp42sample-video";

    /// Create a job with reasonable defaults (quality 80, full scale).
    pub fn job(name: &str, format: &str) -> JobDescriptor {
        JobDescriptor::new(name, SAMPLE_VIDEO.to_vec(), format, 80, 100)
    }

    /// Create one job per name, all with the same target format.
    pub fn jobs(names: &[&str], format: &str) -> Vec<JobDescriptor> {
        names.iter().map(|name| job(name, format)).collect()
    }
}
