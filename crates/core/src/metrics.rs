//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Batches (accepted, rejected, partial failures)
//! - Jobs (outcome by kind, engine duration)
//! - Retention sweeper (files removed, failures)

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Batch Metrics
// =============================================================================

/// Batches by result.
pub static BATCHES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("reelforge_batches_total", "Total batches submitted"),
        &["result"], // "completed", "partial", "failed", "rejected"
    )
    .unwrap()
});

/// Jobs per accepted batch.
pub static BATCH_SIZE: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new("reelforge_batch_size", "Number of jobs per batch")
            .buckets(vec![1.0, 2.0, 3.0, 5.0, 8.0, 10.0]),
    )
    .unwrap()
});

// =============================================================================
// Job Metrics
// =============================================================================

/// Job outcomes by result ("success" or an error kind).
pub static JOBS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("reelforge_jobs_total", "Total conversion jobs by outcome"),
        &["result"],
    )
    .unwrap()
});

/// Engine time for successful conversions.
pub static CONVERSION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "reelforge_conversion_duration_seconds",
            "Duration of successful conversions",
        )
        .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0]),
        &["format"],
    )
    .unwrap()
});

// =============================================================================
// Sweeper Metrics
// =============================================================================

/// Files removed by the retention sweeper.
pub static SWEEPER_REMOVED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "reelforge_sweeper_removed_total",
        "Expired scratch files removed by the retention sweeper",
    )
    .unwrap()
});

/// Files the sweeper failed to inspect or remove.
pub static SWEEPER_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "reelforge_sweeper_failures_total",
        "Scratch files the retention sweeper failed to remove",
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Batches
        Box::new(BATCHES_TOTAL.clone()),
        Box::new(BATCH_SIZE.clone()),
        // Jobs
        Box::new(JOBS_TOTAL.clone()),
        Box::new(CONVERSION_DURATION.clone()),
        // Sweeper
        Box::new(SWEEPER_REMOVED.clone()),
        Box::new(SWEEPER_FAILURES.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::Registry;

    #[test]
    fn test_all_metrics_register() {
        let registry = Registry::new();
        for metric in all_metrics() {
            registry.register(metric).unwrap();
        }

        JOBS_TOTAL.with_label_values(&["success"]).inc();
        let families = registry.gather();
        assert!(families
            .iter()
            .any(|f| f.get_name() == "reelforge_jobs_total"));
    }
}
