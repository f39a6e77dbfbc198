//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the reelforge server:
//! - HTTP request metrics (latency, counts, in flight)
//! - Uploaded files and bytes accepted by the batch endpoint
//! - Worker pool and scratch storage status (collected dynamically)

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "reelforge_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.005, 0.025, 0.1, 0.5, 1.0, 5.0, 15.0, 60.0, 300.0, 900.0, 1800.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("reelforge_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "reelforge_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Upload Metrics
// =============================================================================

/// Files accepted from multipart uploads.
pub static UPLOADED_FILES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "reelforge_uploaded_files_total",
        "Files accepted by the batch conversion endpoint",
    )
    .unwrap()
});

/// Bytes accepted from multipart uploads.
pub static UPLOADED_BYTES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "reelforge_uploaded_bytes_total",
        "Bytes accepted by the batch conversion endpoint",
    )
    .unwrap()
});

/// Batch requests rejected at the boundary, by reason.
pub static UPLOADS_REJECTED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "reelforge_uploads_rejected_total",
            "Batch requests rejected before conversion",
        ),
        &["reason"],
    )
    .unwrap()
});

// =============================================================================
// Pool Metrics (collected dynamically)
// =============================================================================

/// Conversion pool active jobs.
pub static CONVERSION_POOL_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "reelforge_conversion_pool_active",
        "Number of active conversion jobs",
    )
    .unwrap()
});

/// Conversion pool queued jobs.
pub static CONVERSION_POOL_QUEUED: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "reelforge_conversion_pool_queued",
        "Number of queued conversion jobs",
    )
    .unwrap()
});

/// Scratch pairs currently held.
pub static SCRATCH_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "reelforge_scratch_pairs_active",
        "Number of scratch pairs currently acquired",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // Uploads
    registry
        .register(Box::new(UPLOADED_FILES_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(UPLOADED_BYTES_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(UPLOADS_REJECTED_TOTAL.clone()))
        .unwrap();

    // Pool
    registry
        .register(Box::new(CONVERSION_POOL_ACTIVE.clone()))
        .unwrap();
    registry
        .register(Box::new(CONVERSION_POOL_QUEUED.clone()))
        .unwrap();
    registry.register(Box::new(SCRATCH_ACTIVE.clone())).unwrap();

    // Core metrics (batches, jobs, sweeper)
    for metric in reelforge_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Collect dynamic metrics from current application state.
///
/// This is called before encoding metrics to update gauges with current values
/// from the orchestrator's pool and scratch storage.
pub fn collect_dynamic_metrics(state: &crate::state::AppState) {
    let status = state.pool_status();
    CONVERSION_POOL_ACTIVE.set(status.active_jobs as i64);
    CONVERSION_POOL_QUEUED.set(status.queued_jobs as i64);
    SCRATCH_ACTIVE.set(status.active_scratch as i64);
}

static ID_SEGMENT: Lazy<regex_lite::Regex> = Lazy::new(|| {
    // Storage ids: <millis>-<counter>-<uuid8>_<name>
    regex_lite::Regex::new(r"/\d{10,}-\d+-[0-9a-f]{8}_[^/]*").unwrap()
});

static NUMERIC_SEGMENT: Lazy<regex_lite::Regex> =
    Lazy::new(|| regex_lite::Regex::new(r"/\d+(/|$)").unwrap());

/// Normalize a path for metric labels (replace download ids and numbers
/// with placeholders).
pub fn normalize_path(path: &str) -> String {
    let result = ID_SEGMENT.replace_all(path, "/{file}");
    let result = NUMERIC_SEGMENT.replace_all(&result, "/{id}$1");
    result.to_string()
}
