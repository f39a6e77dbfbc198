//! Scratch space allocation with guaranteed release.

use bytes::Bytes;
use chrono::Utc;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};
use uuid::Uuid;

use super::config::StorageConfig;
use super::error::StorageError;
use super::sanitize::{sanitize_name, split_stem};
use crate::job::JobPayload;

/// Paths owned by one job while it runs.
///
/// All three share the same identifier, so no two jobs ever see the same
/// path. The palette slot is only written by two-pass GIF encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScratchPair {
    pub id: String,
    pub input: PathBuf,
    pub output: PathBuf,
    pub palette: PathBuf,
    /// User-facing name of the converted file, e.g. `clip.gif`.
    pub output_name: String,
}

impl ScratchPair {
    fn paths(&self) -> [&Path; 3] {
        [&self.input, &self.output, &self.palette]
    }
}

/// A converted file written to the downloads area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedFile {
    /// File name inside the downloads directory.
    pub file_name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
}

struct StorageInner {
    config: StorageConfig,
    counter: AtomicU64,
    active: Mutex<HashSet<String>>,
}

impl StorageInner {
    fn active_set(&self) -> MutexGuard<'_, HashSet<String>> {
        // A panic while holding the lock cannot leave the set half-updated.
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Removes the id from the active set. Returns false if it was not there.
    fn take_active(&self, id: &str) -> bool {
        self.active_set().remove(id)
    }

    fn next_id(&self) -> String {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        let nonce = Uuid::new_v4().simple().to_string();
        format!("{}-{:06}-{}", Utc::now().timestamp_millis(), seq, &nonce[..8])
    }
}

/// Allocates and reclaims per-job scratch files.
///
/// Cheap to clone; clones share the same active set.
#[derive(Clone)]
pub struct StorageManager {
    inner: Arc<StorageInner>,
}

impl std::fmt::Debug for StorageManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageManager")
            .field("config", &self.inner.config)
            .field("active", &self.active_count())
            .finish()
    }
}

impl StorageManager {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            inner: Arc::new(StorageInner {
                config,
                counter: AtomicU64::new(0),
                active: Mutex::new(HashSet::new()),
            }),
        }
    }

    pub fn config(&self) -> &StorageConfig {
        &self.inner.config
    }

    /// Creates the inbound, outbound and downloads directories.
    pub async fn ensure_roots(&self) -> Result<(), StorageError> {
        for dir in self.inner.config.sweep_roots() {
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|source| StorageError::RootUnavailable {
                    path: dir.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Number of scratch pairs currently acquired and not yet released.
    pub fn active_count(&self) -> usize {
        self.inner.active_set().len()
    }

    /// Reserves a fresh scratch pair for `original_name`.
    ///
    /// The output slot gets `extension`. No files are created yet.
    pub fn acquire(&self, original_name: &str, extension: &str) -> ScratchGuard {
        let id = self.inner.next_id();
        let safe_name = sanitize_name(original_name);
        let (stem, _) = split_stem(&safe_name);
        let output_name = format!("{}.{}", stem, extension);

        let config = &self.inner.config;
        let pair = ScratchPair {
            input: config.inbound_dir().join(format!("{}_{}", id, safe_name)),
            output: config.outbound_dir().join(format!("{}_{}", id, output_name)),
            palette: config.outbound_dir().join(format!("{}_palette.png", id)),
            output_name,
            id,
        };

        self.inner.active_set().insert(pair.id.clone());
        debug!(id = %pair.id, input = ?pair.input, "Acquired scratch pair");

        ScratchGuard {
            inner: Arc::clone(&self.inner),
            pair,
        }
    }

    /// Writes the job payload into the input slot. Returns the staged size.
    pub async fn stage(&self, pair: &ScratchPair, payload: &JobPayload) -> Result<u64, StorageError> {
        let stage_err = |source| StorageError::Stage {
            path: pair.input.clone(),
            source,
        };

        match payload {
            JobPayload::Bytes(data) => {
                tokio::fs::write(&pair.input, data).await.map_err(stage_err)?;
                Ok(data.len() as u64)
            }
            JobPayload::Path(source_path) => tokio::fs::copy(source_path, &pair.input)
                .await
                .map_err(stage_err),
        }
    }

    /// Reads the engine output back into memory.
    pub async fn read_output(&self, pair: &ScratchPair) -> Result<Bytes, StorageError> {
        tokio::fs::read(&pair.output)
            .await
            .map(Bytes::from)
            .map_err(|source| StorageError::ReadOutput {
                path: pair.output.clone(),
                source,
            })
    }

    /// Deletes the pair's files and forgets it.
    ///
    /// Idempotent: returns `Ok(false)` without touching the filesystem if the
    /// pair was already released. Missing files are not an error.
    pub async fn release(&self, pair: &ScratchPair) -> Result<bool, StorageError> {
        release_pair(&self.inner, pair).await
    }

    /// Copies a converted output into the downloads area under a fresh id.
    pub async fn publish(&self, output_name: &str, data: &[u8]) -> Result<PublishedFile, StorageError> {
        let file_name = format!("{}_{}", self.inner.next_id(), sanitize_name(output_name));
        let path = self.inner.config.downloads_dir().join(&file_name);

        tokio::fs::write(&path, data)
            .await
            .map_err(|source| StorageError::Publish {
                path: path.clone(),
                source,
            })?;

        Ok(PublishedFile {
            file_name,
            path,
            size_bytes: data.len() as u64,
        })
    }
}

async fn release_pair(inner: &StorageInner, pair: &ScratchPair) -> Result<bool, StorageError> {
    if !inner.take_active(&pair.id) {
        return Ok(false);
    }

    let mut first_error = None;
    for path in pair.paths() {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => {
                warn!(path = ?path, error = %source, "Failed to remove scratch file");
                first_error.get_or_insert(StorageError::Release {
                    path: path.to_path_buf(),
                    source,
                });
            }
        }
    }

    debug!(id = %pair.id, "Released scratch pair");
    match first_error {
        Some(e) => Err(e),
        None => Ok(true),
    }
}

/// Scoped ownership of a [`ScratchPair`].
///
/// Call [`ScratchGuard::release`] on the normal path. If the guard is dropped
/// without it (task cancelled, panic) the files are removed synchronously.
pub struct ScratchGuard {
    inner: Arc<StorageInner>,
    pair: ScratchPair,
}

impl ScratchGuard {
    pub fn pair(&self) -> &ScratchPair {
        &self.pair
    }

    /// Releases the pair, consuming the guard.
    pub async fn release(self) -> Result<bool, StorageError> {
        release_pair(&self.inner, &self.pair).await
    }
}

impl std::ops::Deref for ScratchGuard {
    type Target = ScratchPair;

    fn deref(&self) -> &ScratchPair {
        &self.pair
    }
}

impl Drop for ScratchGuard {
    fn drop(&mut self) {
        if !self.inner.take_active(&self.pair.id) {
            return;
        }

        warn!(id = %self.pair.id, "Scratch pair dropped without release, cleaning up");
        for path in self.pair.paths() {
            if let Err(e) = std::fs::remove_file(path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = ?path, error = %e, "Failed to remove scratch file on drop");
                }
            }
        }
    }
}
