//! Error types for the storage module.

use std::path::PathBuf;
use thiserror::Error;

use crate::job::ErrorKind;

/// Errors raised while managing scratch space.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A storage directory could not be created or accessed.
    #[error("storage root unavailable: {path}: {source}")]
    RootUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing a payload into its input slot failed.
    #[error("failed to stage input at {path}: {source}")]
    Stage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading engine output back failed.
    #[error("failed to read output at {path}: {source}")]
    ReadOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Removing a scratch file failed.
    #[error("failed to release {path}: {source}")]
    Release {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing a file into the downloads area failed.
    #[error("failed to publish {path}: {source}")]
    Publish {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::StorageError
    }
}
