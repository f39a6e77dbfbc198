//! Batch orchestrator implementation.

use bytes::Bytes;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tokio_util::task::AbortOnDropHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::config::BatchConfig;
use super::types::{BatchError, PoolStatus};
use crate::converter::{ConversionOutput, Converter};
use crate::job::{BatchResult, ErrorKind, JobDescriptor, JobOutcome};
use crate::metrics::{BATCHES_TOTAL, BATCH_SIZE, CONVERSION_DURATION, JOBS_TOTAL};
use crate::storage::{ScratchPair, StorageManager};

/// Tracks statistics for the worker pool.
#[derive(Default)]
struct PoolStats {
    active: AtomicU64,
    queued: AtomicU64,
    total_processed: AtomicU64,
    total_failed: AtomicU64,
}

/// Counts a job as queued from spawn until it starts, or until its task is
/// dropped without ever running.
struct QueuedJob(Arc<PoolStats>);

impl QueuedJob {
    fn new(stats: Arc<PoolStats>) -> Self {
        stats.queued.fetch_add(1, Ordering::Relaxed);
        Self(stats)
    }
}

impl Drop for QueuedJob {
    fn drop(&mut self) {
        self.0.queued.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Counts a job as active for as long as it is alive, panics included.
struct ActiveJob<'a>(&'a PoolStats);

impl<'a> ActiveJob<'a> {
    fn enter(stats: &'a PoolStats) -> Self {
        stats.active.fetch_add(1, Ordering::Relaxed);
        Self(stats)
    }
}

impl Drop for ActiveJob<'_> {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Runs batches of conversion jobs with bounded parallelism.
///
/// Each job goes through acquire → stage → convert → read → release while
/// holding one of `concurrency_limit` permits. Outcomes are stored by input
/// index, so completion order never affects result order.
pub struct BatchOrchestrator {
    config: BatchConfig,
    converter: Arc<dyn Converter>,
    storage: StorageManager,
    stats: Arc<PoolStats>,
}

impl BatchOrchestrator {
    /// Creates a new orchestrator.
    pub fn new(config: BatchConfig, converter: Arc<dyn Converter>, storage: StorageManager) -> Self {
        Self {
            config,
            converter,
            storage,
            stats: Arc::new(PoolStats::default()),
        }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    pub fn storage(&self) -> &StorageManager {
        &self.storage
    }

    /// Returns the current pool status.
    pub fn status(&self) -> PoolStatus {
        PoolStatus {
            active_jobs: self.stats.active.load(Ordering::Relaxed) as usize,
            queued_jobs: self.stats.queued.load(Ordering::Relaxed) as usize,
            max_concurrent: self.config.concurrency,
            total_processed: self.stats.total_processed.load(Ordering::Relaxed),
            total_failed: self.stats.total_failed.load(Ordering::Relaxed),
            active_scratch: self.storage.active_count(),
        }
    }

    /// Runs a batch with the configured concurrency limit.
    pub async fn run(&self, jobs: Vec<JobDescriptor>) -> Result<BatchResult, BatchError> {
        self.run_batch(jobs, self.config.concurrency).await
    }

    /// Runs a batch with at most `concurrency_limit` jobs active at once.
    ///
    /// A limit of 0 is treated as 1.
    pub async fn run_batch(
        &self,
        jobs: Vec<JobDescriptor>,
        concurrency_limit: usize,
    ) -> Result<BatchResult, BatchError> {
        self.run_batch_with_cancel(jobs, concurrency_limit, CancellationToken::new())
            .await
    }

    /// Runs a batch that stops early when `cancel` fires or the configured
    /// batch timeout passes.
    ///
    /// Jobs that never started and jobs interrupted mid-conversion report
    /// `Cancelled`. Interrupted jobs have their engine process killed and
    /// their scratch pair released.
    pub async fn run_batch_with_cancel(
        &self,
        jobs: Vec<JobDescriptor>,
        concurrency_limit: usize,
        cancel: CancellationToken,
    ) -> Result<BatchResult, BatchError> {
        if jobs.is_empty() {
            BATCHES_TOTAL.with_label_values(&["rejected"]).inc();
            return Err(BatchError::EmptyBatch);
        }
        if jobs.len() > self.config.max_files {
            BATCHES_TOTAL.with_label_values(&["rejected"]).inc();
            return Err(BatchError::TooManyJobs {
                count: jobs.len(),
                max: self.config.max_files,
            });
        }
        if let Err(e) = self.storage.ensure_roots().await {
            BATCHES_TOTAL.with_label_values(&["failed"]).inc();
            return Err(e.into());
        }

        let limit = concurrency_limit.max(1);
        let total = jobs.len();
        let batch_id = Uuid::new_v4().simple().to_string()[..8].to_string();
        info!(
            "Starting batch {} with {} jobs (concurrency {})",
            batch_id, total, limit
        );
        BATCH_SIZE.observe(total as f64);

        let cancel = cancel.child_token();
        let deadline = self.spawn_deadline(&batch_id, cancel.clone());

        let semaphore = Arc::new(Semaphore::new(limit));
        let names: Vec<String> = jobs.iter().map(|j| j.original_name().to_string()).collect();
        let mut slots: Vec<Option<JobOutcome>> = vec![None; total];
        let mut tasks = JoinSet::new();

        for (index, job) in jobs.into_iter().enumerate() {
            let worker = JobWorker {
                converter: Arc::clone(&self.converter),
                storage: self.storage.clone(),
                stats: Arc::clone(&self.stats),
                semaphore: Arc::clone(&semaphore),
                cancel: cancel.clone(),
            };
            let queued = QueuedJob::new(Arc::clone(&self.stats));
            tasks.spawn(async move { (index, worker.run(job, queued).await) });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => slots[index] = Some(outcome),
                // The slot stays empty and is reported as an internal failure below.
                Err(e) => error!("Batch {}: conversion task aborted: {}", batch_id, e),
            }
        }
        drop(deadline);

        let outcomes: Vec<JobOutcome> = slots
            .into_iter()
            .zip(names)
            .map(|(slot, name)| {
                slot.unwrap_or_else(|| {
                    self.stats.total_processed.fetch_add(1, Ordering::Relaxed);
                    self.stats.total_failed.fetch_add(1, Ordering::Relaxed);
                    JOBS_TOTAL
                        .with_label_values(&[ErrorKind::Internal.as_str()])
                        .inc();
                    JobOutcome::failure(
                        name,
                        ErrorKind::Internal,
                        "conversion task aborted unexpectedly",
                    )
                })
            })
            .collect();
        let result = BatchResult::new(outcomes);

        let label = match (result.success_count(), result.failure_count()) {
            (_, 0) => "completed",
            (0, _) => "failed",
            _ => "partial",
        };
        BATCHES_TOTAL.with_label_values(&[label]).inc();
        info!(
            "Batch {} finished: {} succeeded, {} failed",
            batch_id,
            result.success_count(),
            result.failure_count()
        );

        Ok(result)
    }

    /// The returned handle aborts the timer when dropped, so an abandoned
    /// batch does not leave it running.
    fn spawn_deadline(&self, batch_id: &str, cancel: CancellationToken) -> AbortOnDropHandle<()> {
        let timeout = Duration::from_secs(self.config.timeout_secs);
        let batch_id = batch_id.to_string();
        AbortOnDropHandle::new(tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(timeout) => {
                    warn!("Batch {} exceeded {:?}, cancelling remaining jobs", batch_id, timeout);
                    cancel.cancel();
                }
            }
        }))
    }
}

/// Everything one job needs, detached from the orchestrator's lifetime.
struct JobWorker {
    converter: Arc<dyn Converter>,
    storage: StorageManager,
    stats: Arc<PoolStats>,
    semaphore: Arc<Semaphore>,
    cancel: CancellationToken,
}

/// Failure reported from inside a job, before it becomes an outcome.
type JobFailure = (ErrorKind, String);

impl JobWorker {
    async fn run(self, job: JobDescriptor, queued: QueuedJob) -> JobOutcome {
        let name = job.original_name().to_string();

        let permit = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            permit = Arc::clone(&self.semaphore).acquire_owned() => permit.ok(),
        };
        drop(queued);
        let Some(permit) = permit else {
            return self.finish(JobOutcome::failure(
                name,
                ErrorKind::Cancelled,
                "batch cancelled before the job started",
            ));
        };

        let outcome = {
            let _active = ActiveJob::enter(&self.stats);
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => JobOutcome::failure(
                    name,
                    ErrorKind::Cancelled,
                    "batch cancelled while the job was running",
                ),
                outcome = self.execute(&job) => outcome,
            }
        };
        drop(permit);

        self.finish(outcome)
    }

    fn finish(&self, outcome: JobOutcome) -> JobOutcome {
        self.stats.total_processed.fetch_add(1, Ordering::Relaxed);
        match &outcome {
            JobOutcome::Success {
                original_name,
                format,
                duration_ms,
                ..
            } => {
                info!("Converted {} to {} in {} ms", original_name, format, duration_ms);
                JOBS_TOTAL.with_label_values(&["success"]).inc();
                CONVERSION_DURATION
                    .with_label_values(&[format.extension()])
                    .observe(*duration_ms as f64 / 1000.0);
            }
            JobOutcome::Failure {
                original_name,
                kind,
                message,
            } => {
                warn!("Conversion of {} failed ({}): {}", original_name, kind, message);
                self.stats.total_failed.fetch_add(1, Ordering::Relaxed);
                JOBS_TOTAL.with_label_values(&[kind.as_str()]).inc();
            }
        }
        outcome
    }

    /// Full lifecycle of one job. Scratch space is released on every path;
    /// if this future is dropped, the guard releases it instead.
    async fn execute(&self, job: &JobDescriptor) -> JobOutcome {
        let name = job.original_name();
        let format = match job.target_format() {
            Ok(format) => format,
            Err(e) => return JobOutcome::failure(name, ErrorKind::UnsupportedFormat, e.to_string()),
        };

        let scratch = self.storage.acquire(name, format.extension());
        let result = self.convert_in(job, scratch.pair()).await;
        let output_name = scratch.output_name.clone();

        if let Err(e) = scratch.release().await {
            // Leftovers are reclaimed by the retention sweeper.
            warn!("Failed to release scratch space for {}: {}", name, e);
        }

        match result {
            Ok((output, data)) => JobOutcome::Success {
                original_name: name.to_string(),
                output_name,
                format: output.format,
                size_bytes: output.size_bytes,
                duration_ms: output.duration_ms,
                data,
            },
            Err((kind, message)) => JobOutcome::failure(name, kind, message),
        }
    }

    async fn convert_in(
        &self,
        job: &JobDescriptor,
        pair: &ScratchPair,
    ) -> Result<(ConversionOutput, Bytes), JobFailure> {
        let staged = self
            .storage
            .stage(pair, job.payload())
            .await
            .map_err(|e| (e.kind(), e.to_string()))?;
        debug!("Staged {} bytes for {} at {:?}", staged, job.original_name(), pair.input);

        let output = self
            .converter
            .convert(job, pair)
            .await
            .map_err(|e| (e.kind(), e.to_string()))?;

        let data = self
            .storage
            .read_output(pair)
            .await
            .map_err(|e| (e.kind(), e.to_string()))?;

        Ok((output, data))
    }
}
