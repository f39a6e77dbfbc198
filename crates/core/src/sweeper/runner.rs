//! Retention sweeper implementation.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::config::SweeperConfig;
use crate::metrics::{SWEEPER_FAILURES, SWEEPER_REMOVED};

/// Totals from one pass over the scratch roots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Regular files inspected.
    pub scanned: usize,
    /// Files removed because they were past retention.
    pub removed: usize,
    /// Files that could not be inspected or removed.
    pub failed: usize,
}

/// Periodically deletes scratch files older than the retention window.
///
/// The sweeper knows nothing about batches. Storage ids start with a
/// timestamp and the retention window is far longer than any single job, so a
/// file still in use is never old enough to be reaped.
#[derive(Debug, Clone)]
pub struct RetentionSweeper {
    roots: Vec<PathBuf>,
    retention: Duration,
    interval: Duration,
}

impl RetentionSweeper {
    pub fn new(roots: Vec<PathBuf>, retention: Duration, interval: Duration) -> Self {
        Self {
            roots,
            retention,
            interval,
        }
    }

    /// Creates a sweeper from configuration.
    pub fn from_config(roots: Vec<PathBuf>, config: &SweeperConfig) -> Self {
        Self::new(roots, config.retention(), config.interval())
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Runs one pass using the current time.
    pub async fn sweep(&self) -> SweepReport {
        self.sweep_at(SystemTime::now()).await
    }

    /// Runs one pass as if the current time were `now`.
    pub async fn sweep_at(&self, now: SystemTime) -> SweepReport {
        let mut report = SweepReport::default();
        let Some(cutoff) = now.checked_sub(self.retention) else {
            return report;
        };

        for root in &self.roots {
            self.sweep_root(root, cutoff, &mut report).await;
        }

        SWEEPER_REMOVED.inc_by(report.removed as u64);
        SWEEPER_FAILURES.inc_by(report.failed as u64);
        if report.removed > 0 || report.failed > 0 {
            info!(
                "Sweep finished: scanned {}, removed {}, failed {}",
                report.scanned, report.removed, report.failed
            );
        } else {
            debug!("Sweep finished: scanned {}, nothing expired", report.scanned);
        }
        report
    }

    async fn sweep_root(&self, root: &Path, cutoff: SystemTime, report: &mut SweepReport) {
        let mut entries = match tokio::fs::read_dir(root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Sweep root {:?} does not exist, skipping", root);
                return;
            }
            Err(e) => {
                warn!("Failed to read sweep root {:?}: {}", root, e);
                report.failed += 1;
                return;
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!("Failed to list {:?}: {}", root, e);
                    report.failed += 1;
                    break;
                }
            };
            let path = entry.path();

            let modified = match entry.metadata().await {
                Ok(meta) if meta.is_file() => meta.modified(),
                Ok(_) => continue,
                // Removed between listing and inspection.
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => Err(e),
            };
            report.scanned += 1;

            let modified = match modified {
                Ok(modified) => modified,
                Err(e) => {
                    warn!("Failed to read mtime of {:?}: {}", path, e);
                    report.failed += 1;
                    continue;
                }
            };
            if modified >= cutoff {
                continue;
            }

            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    debug!("Removed expired scratch file {:?}", path);
                    report.removed += 1;
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!("Failed to remove expired scratch file {:?}: {}", path, e);
                    report.failed += 1;
                }
            }
        }
    }

    /// Runs a sweep every interval until `shutdown` is cancelled.
    ///
    /// The first sweep happens one interval after start.
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                "Retention sweeper started (interval {:?}, retention {:?})",
                self.interval, self.retention
            );
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        info!("Retention sweeper received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(self.interval) => {
                        self.sweep().await;
                    }
                }
            }
        })
    }
}
