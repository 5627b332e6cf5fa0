//! Prometheus metrics registry and instruments.
//!
//! The sync is a one-shot process, so instead of serving `/metrics` the
//! registry is dumped to a textfile (node-exporter textfile collector
//! format) when the run finishes.

use std::path::Path;
use std::time::Duration;

use lazy_static::lazy_static;
use prometheus::{Encoder, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

use crate::error::AppError;

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Catalog Metrics
    pub static ref CATALOG_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("exercise_sync_catalog_requests_total", "Total number of catalog page requests"),
        &["status"]
    ).expect("metric can be created");
    pub static ref CATALOG_REQUEST_DURATION_SECONDS: prometheus::Histogram = prometheus::Histogram::with_opts(
        HistogramOpts::new(
            "exercise_sync_catalog_request_duration_seconds",
            "Catalog page request duration in seconds"
        ).buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0])
    ).expect("metric can be created");
    pub static ref RECORDS_FETCHED_TOTAL: IntCounter = IntCounter::new(
        "exercise_sync_records_fetched_total",
        "Total number of exercise records fetched from the catalog"
    ).expect("metric can be created");

    // Storage Metrics
    pub static ref RECORDS_SAVED_TOTAL: IntCounter = IntCounter::new(
        "exercise_sync_records_saved_total",
        "Total number of exercise records inserted or changed"
    ).expect("metric can be created");
    pub static ref UPSERT_BATCHES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("exercise_sync_upsert_batches_total", "Total number of page upserts"),
        &["status"]
    ).expect("metric can be created");
    pub static ref STORED_EXERCISES: IntGauge = IntGauge::new(
        "exercise_sync_stored_exercises",
        "Number of exercises in the store after the last run"
    ).expect("metric can be created");
}

/// Initialize metrics registry.
pub fn init_metrics() {
    REGISTRY
        .register(Box::new(CATALOG_REQUESTS_TOTAL.clone()))
        .expect("CATALOG_REQUESTS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(CATALOG_REQUEST_DURATION_SECONDS.clone()))
        .expect("CATALOG_REQUEST_DURATION_SECONDS can be registered");
    REGISTRY
        .register(Box::new(RECORDS_FETCHED_TOTAL.clone()))
        .expect("RECORDS_FETCHED_TOTAL can be registered");
    REGISTRY
        .register(Box::new(RECORDS_SAVED_TOTAL.clone()))
        .expect("RECORDS_SAVED_TOTAL can be registered");
    REGISTRY
        .register(Box::new(UPSERT_BATCHES_TOTAL.clone()))
        .expect("UPSERT_BATCHES_TOTAL can be registered");
    REGISTRY
        .register(Box::new(STORED_EXERCISES.clone()))
        .expect("STORED_EXERCISES can be registered");

    tracing::debug!("Metrics registry initialized");
}

/// Record the outcome of one catalog page request
pub fn observe_catalog_request(status: &str, elapsed: Duration) {
    CATALOG_REQUESTS_TOTAL.with_label_values(&[status]).inc();
    CATALOG_REQUEST_DURATION_SECONDS.observe(elapsed.as_secs_f64());
}

/// Render every registered metric in Prometheus text format
pub fn render() -> Result<String, AppError> {
    let encoder = TextEncoder::new();
    encoder
        .encode_to_string(&REGISTRY.gather())
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to encode metrics: {}", e)))
}

/// Write the registry to `path`
///
/// The file is written next to its destination first and renamed into
/// place, so a collector never reads a half-written file.
pub fn write_textfile(path: &Path) -> Result<(), AppError> {
    let text = render()?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let staging = path.with_extension("prom.tmp");
    std::fs::write(&staging, text.as_bytes())?;
    std::fs::rename(&staging, path)?;

    tracing::info!(path = %path.display(), "Metrics written");
    Ok(())
}
