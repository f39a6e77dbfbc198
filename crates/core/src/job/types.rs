//! Types shared by the orchestrator, the converter and the storage layer.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Output formats the converter knows how to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    Gif,
    Mp4,
    Webm,
}

impl TargetFormat {
    /// File extension for the output container.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Gif => "gif",
            Self::Mp4 => "mp4",
            Self::Webm => "webm",
        }
    }

    /// Muxer name passed to ffmpeg with `-f`.
    pub fn muxer(&self) -> &'static str {
        match self {
            Self::Gif => "gif",
            Self::Mp4 => "mp4",
            Self::Webm => "webm",
        }
    }

    /// MIME type of the produced file.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Gif => "image/gif",
            Self::Mp4 => "video/mp4",
            Self::Webm => "video/webm",
        }
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Returned when a format string names no known [`TargetFormat`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported output format: {0}")]
pub struct ParseFormatError(pub String);

impl FromStr for TargetFormat {
    type Err = ParseFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gif" => Ok(Self::Gif),
            "mp4" => Ok(Self::Mp4),
            "webm" => Ok(Self::Webm),
            _ => Err(ParseFormatError(s.to_string())),
        }
    }
}

/// Source data for a job.
#[derive(Debug, Clone)]
pub enum JobPayload {
    /// Uploaded bytes held in memory.
    Bytes(Bytes),
    /// A readable file on local disk. The file is copied into scratch space,
    /// never converted in place.
    Path(PathBuf),
}

impl JobPayload {
    /// Size of the payload if known without touching the filesystem.
    pub fn len_hint(&self) -> Option<usize> {
        match self {
            Self::Bytes(b) => Some(b.len()),
            Self::Path(_) => None,
        }
    }
}

impl From<Vec<u8>> for JobPayload {
    fn from(data: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(data))
    }
}

impl From<Bytes> for JobPayload {
    fn from(data: Bytes) -> Self {
        Self::Bytes(data)
    }
}

/// One file's conversion request.
///
/// `format` keeps the string the caller asked for. It is parsed by the
/// converter so that an unknown format fails that job alone instead of the
/// whole request.
#[derive(Debug, Clone)]
pub struct JobDescriptor {
    original_name: String,
    payload: JobPayload,
    format: String,
    quality: u8,
    scale_percent: u32,
}

impl JobDescriptor {
    pub fn new(
        original_name: impl Into<String>,
        payload: impl Into<JobPayload>,
        format: impl Into<String>,
        quality: u8,
        scale_percent: u32,
    ) -> Self {
        Self {
            original_name: original_name.into(),
            payload: payload.into(),
            format: format.into(),
            quality,
            scale_percent,
        }
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn payload(&self) -> &JobPayload {
        &self.payload
    }

    /// The requested format string, unparsed.
    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    pub fn scale_percent(&self) -> u32 {
        self.scale_percent
    }

    /// Parses the requested format.
    pub fn target_format(&self) -> Result<TargetFormat, ParseFormatError> {
        self.format.parse()
    }
}

/// Classification of a per-job failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnsupportedFormat,
    EngineError,
    EmptyOutput,
    StorageError,
    ValidationError,
    Timeout,
    Cancelled,
    Internal,
}

impl ErrorKind {
    /// Stable label used in responses and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat => "unsupported_format",
            Self::EngineError => "engine_error",
            Self::EmptyOutput => "empty_output",
            Self::StorageError => "storage_error",
            Self::ValidationError => "validation_error",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one job.
#[derive(Debug, Clone)]
pub enum JobOutcome {
    Success {
        original_name: String,
        output_name: String,
        format: TargetFormat,
        /// Converted file contents, read before scratch space was released.
        data: Bytes,
        size_bytes: u64,
        duration_ms: u64,
    },
    Failure {
        original_name: String,
        kind: ErrorKind,
        message: String,
    },
}

impl JobOutcome {
    pub fn failure(
        original_name: impl Into<String>,
        kind: ErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self::Failure {
            original_name: original_name.into(),
            kind,
            message: message.into(),
        }
    }

    pub fn original_name(&self) -> &str {
        match self {
            Self::Success { original_name, .. } | Self::Failure { original_name, .. } => {
                original_name
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The failure kind, if this outcome is a failure.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { kind, .. } => Some(*kind),
        }
    }
}

/// Outcomes of a batch, in the order the jobs were submitted.
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    outcomes: Vec<JobOutcome>,
}

impl BatchResult {
    pub fn new(outcomes: Vec<JobOutcome>) -> Self {
        Self { outcomes }
    }

    pub fn outcomes(&self) -> &[JobOutcome] {
        &self.outcomes
    }

    pub fn into_outcomes(self) -> Vec<JobOutcome> {
        self.outcomes
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &JobOutcome> {
        self.outcomes.iter().filter(|o| o.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &JobOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn success_count(&self) -> usize {
        self.succeeded().count()
    }

    pub fn failure_count(&self) -> usize {
        self.failed().count()
    }
}
