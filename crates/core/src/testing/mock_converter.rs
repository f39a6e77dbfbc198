//! Mock converter for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::converter::{ConversionOutput, Converter, ConverterError};
use crate::job::{ErrorKind, JobDescriptor};
use crate::storage::{ScratchPair, StorageManager};

/// A recorded conversion for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedConversion {
    pub original_name: String,
    pub format: String,
    pub quality: u8,
    pub scale_percent: u32,
    /// Size of the staged input the mock found on disk.
    pub input_bytes: u64,
    /// Whether the conversion succeeded.
    pub success: bool,
}

/// Mock implementation of the Converter trait.
///
/// Provides controllable behavior for testing:
/// - Per-file failures by original name
/// - Per-file or global simulated conversion time
/// - Peak concurrency and peak scratch usage tracking
///
/// On success it writes [`MockConverter::OUTPUT`] to the scratch output path,
/// so the orchestrator's read-back sees real bytes.
///
/// # Example
///
/// ```rust,ignore
/// use reelforge_core::testing::MockConverter;
/// use reelforge_core::job::ErrorKind;
///
/// let converter = Arc::new(MockConverter::new());
/// converter.fail_for("broken.mp4", ErrorKind::EngineError).await;
///
/// let result = orchestrator.run_batch(jobs, 2).await?;
/// assert_eq!(converter.conversion_count().await, jobs_len);
/// ```
#[derive(Debug)]
pub struct MockConverter {
    conversions: Arc<RwLock<Vec<RecordedConversion>>>,
    /// Original names that fail, with the failure kind to report.
    failures: Arc<RwLock<HashMap<String, ErrorKind>>>,
    /// Per-name simulated durations, overriding the global one.
    delays: Arc<RwLock<HashMap<String, Duration>>>,
    conversion_duration: Arc<RwLock<Duration>>,
    /// If set, `validate` fails with an engine-not-found error.
    unavailable: Arc<RwLock<bool>>,
    storage: Arc<RwLock<Option<StorageManager>>>,
    peak_active_scratch: Arc<RwLock<usize>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl Default for MockConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl MockConverter {
    /// Bytes written as the output of every successful conversion.
    pub const OUTPUT: &'static [u8] = b"GIF89a-mock-output";

    /// Create a new mock converter.
    pub fn new() -> Self {
        Self {
            conversions: Arc::new(RwLock::new(Vec::new())),
            failures: Arc::new(RwLock::new(HashMap::new())),
            delays: Arc::new(RwLock::new(HashMap::new())),
            conversion_duration: Arc::new(RwLock::new(Duration::from_millis(10))),
            unavailable: Arc::new(RwLock::new(false)),
            storage: Arc::new(RwLock::new(None)),
            peak_active_scratch: Arc::new(RwLock::new(0)),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Get all recorded conversions.
    pub async fn recorded_conversions(&self) -> Vec<RecordedConversion> {
        self.conversions.read().await.clone()
    }

    /// Get the number of conversions attempted.
    pub async fn conversion_count(&self) -> usize {
        self.conversions.read().await.len()
    }

    /// Make every job with this original name fail with `kind`.
    pub async fn fail_for(&self, original_name: &str, kind: ErrorKind) {
        self.failures
            .write()
            .await
            .insert(original_name.to_string(), kind);
    }

    /// Set the simulated conversion duration for one original name.
    pub async fn set_delay_for(&self, original_name: &str, duration: Duration) {
        self.delays
            .write()
            .await
            .insert(original_name.to_string(), duration);
    }

    /// Set the simulated conversion duration.
    pub async fn set_conversion_duration(&self, duration: Duration) {
        *self.conversion_duration.write().await = duration;
    }

    /// Make `validate` report the engine as missing.
    pub async fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.write().await = unavailable;
    }

    /// Sample the storage manager's active scratch count during each conversion.
    pub async fn observe_storage(&self, storage: StorageManager) {
        *self.storage.write().await = Some(storage);
    }

    /// Highest number of conversions that were running at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Highest active scratch count seen while converting.
    pub async fn peak_active_scratch(&self) -> usize {
        *self.peak_active_scratch.read().await
    }

    async fn record(&self, job: &JobDescriptor, input_bytes: u64, success: bool) {
        self.conversions.write().await.push(RecordedConversion {
            original_name: job.original_name().to_string(),
            format: job.format().to_string(),
            quality: job.quality(),
            scale_percent: job.scale_percent(),
            input_bytes,
            success,
        });
    }

    async fn sample_storage(&self) {
        if let Some(storage) = self.storage.read().await.as_ref() {
            let active = storage.active_count();
            let mut peak = self.peak_active_scratch.write().await;
            *peak = (*peak).max(active);
        }
    }

    fn error_for(kind: ErrorKind, scratch: &ScratchPair) -> ConverterError {
        match kind {
            ErrorKind::UnsupportedFormat => ConverterError::UnsupportedFormat {
                format: "mock".to_string(),
            },
            ErrorKind::ValidationError => ConverterError::invalid_parameters("mock rejection"),
            ErrorKind::EmptyOutput => ConverterError::EmptyOutput {
                path: scratch.output.clone(),
            },
            ErrorKind::Timeout => ConverterError::Timeout { timeout_secs: 0 },
            _ => ConverterError::EngineFailed {
                status: "exit code 1".to_string(),
                detail: "mock engine failure".to_string(),
            },
        }
    }
}

/// Decrements the in-flight counter even when the conversion is dropped.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Converter for MockConverter {
    fn name(&self) -> &str {
        "mock"
    }

    async fn convert(
        &self,
        job: &JobDescriptor,
        scratch: &ScratchPair,
    ) -> Result<ConversionOutput, ConverterError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _in_flight = InFlight(&self.in_flight);
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
        self.sample_storage().await;

        let started = Instant::now();
        let input_bytes = tokio::fs::metadata(&scratch.input)
            .await
            .map(|m| m.len())
            .unwrap_or(0);

        let failure = self.failures.read().await.get(job.original_name()).copied();
        if let Some(kind) = failure {
            self.record(job, input_bytes, false).await;
            return Err(Self::error_for(kind, scratch));
        }

        let format = job
            .target_format()
            .map_err(|e| ConverterError::UnsupportedFormat { format: e.0 })?;
        self.record(job, input_bytes, true).await;

        let delay = match self.delays.read().await.get(job.original_name()) {
            Some(delay) => *delay,
            None => *self.conversion_duration.read().await,
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        tokio::fs::write(&scratch.output, Self::OUTPUT).await?;

        Ok(ConversionOutput {
            format,
            output_path: scratch.output.clone(),
            size_bytes: Self::OUTPUT.len() as u64,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }

    async fn validate(&self) -> Result<(), ConverterError> {
        if *self.unavailable.read().await {
            return Err(ConverterError::EngineNotFound {
                path: "mock-ffmpeg".into(),
            });
        }
        Ok(())
    }
}
