//! Error types for the converter module.

use std::path::PathBuf;
use thiserror::Error;

use crate::job::ErrorKind;

/// Errors that can occur during conversion.
#[derive(Debug, Error)]
pub enum ConverterError {
    /// Requested output format is not one we can produce.
    #[error("Unsupported output format: {format}")]
    UnsupportedFormat { format: String },

    /// Quality or scale out of range.
    #[error("Invalid parameters: {reason}")]
    InvalidParameters { reason: String },

    /// FFmpeg binary not found.
    #[error("FFmpeg not found at path: {path}")]
    EngineNotFound { path: PathBuf },

    /// The engine ran and reported failure.
    #[error("FFmpeg failed ({status}): {detail}")]
    EngineFailed { status: String, detail: String },

    /// The engine did not finish in time and was killed.
    #[error("Conversion timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// The engine reported success but produced nothing usable.
    #[error("Output file missing or empty: {path}")]
    EmptyOutput { path: PathBuf },

    /// I/O error while running the engine.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConverterError {
    /// Creates an invalid parameters error.
    pub fn invalid_parameters(reason: impl Into<String>) -> Self {
        Self::InvalidParameters {
            reason: reason.into(),
        }
    }

    /// The per-job failure kind this error reports as.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedFormat { .. } => ErrorKind::UnsupportedFormat,
            Self::InvalidParameters { .. } => ErrorKind::ValidationError,
            Self::EngineNotFound { .. } | Self::EngineFailed { .. } | Self::Io(_) => {
                ErrorKind::EngineError
            }
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::EmptyOutput { .. } => ErrorKind::EmptyOutput,
        }
    }
}
