//! Prometheus metrics for clip-service
//!
//! Registered on the default registry and exposed on `/metrics`.

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram, register_histogram_vec, register_int_counter, register_int_counter_vec,
    register_int_gauge, Encoder, Histogram, HistogramVec, IntCounter, IntCounterVec, IntGauge,
    TextEncoder,
};

// ======================
// HTTP
// ======================

/// Labels: method, path, status
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "clip_service_http_requests_total",
        "Total HTTP requests handled by clip-service",
        &["method", "path", "status"]
    )
    .expect("failed to register clip_service_http_requests_total")
});

pub static HTTP_REQUEST_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "clip_service_http_request_duration_seconds",
        "HTTP request latencies for clip-service",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 10.0, 60.0]
    )
    .expect("failed to register clip_service_http_request_duration_seconds")
});

// ======================
// Intake
// ======================

/// Labels: outcome=accepted|unauthorized|forbidden|rejected|too_large|failed
pub static UPLOADS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "clip_service_uploads_total",
        "Upload requests by outcome",
        &["outcome"]
    )
    .expect("failed to register clip_service_uploads_total")
});

pub static UPLOAD_BYTES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "clip_service_upload_bytes_total",
        "Bytes persisted as original artifacts"
    )
    .expect("failed to register clip_service_upload_bytes_total")
});

// ======================
// Transcoding
// ======================

/// Labels: result=success|failure
pub static TRANSCODE_ATTEMPTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "clip_service_transcode_attempts_total",
        "Individual converter invocations",
        &["result"]
    )
    .expect("failed to register clip_service_transcode_attempts_total")
});

/// Labels: status=ready|error
pub static TRANSCODE_JOBS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "clip_service_transcode_jobs_total",
        "Transcode jobs by terminal status",
        &["status"]
    )
    .expect("failed to register clip_service_transcode_jobs_total")
});

pub static TRANSCODE_DURATION_SECONDS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "clip_service_transcode_duration_seconds",
        "Wall time of a transcode job including retries",
        vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0, 3600.0]
    )
    .expect("failed to register clip_service_transcode_duration_seconds")
});

pub static TRANSCODE_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "clip_service_transcode_in_flight",
        "Transcode jobs currently running"
    )
    .expect("failed to register clip_service_transcode_in_flight")
});

pub static TRANSCODE_QUEUE_DEPTH: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "clip_service_transcode_queue_depth",
        "Transcode jobs waiting for a worker"
    )
    .expect("failed to register clip_service_transcode_queue_depth")
});

/// A terminal status could not be recorded; the video stays pending until recovery
pub static STATUS_WRITE_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "clip_service_status_write_failures_total",
        "Failed terminal status writes"
    )
    .expect("failed to register clip_service_status_write_failures_total")
});

pub static RECOVERED_JOBS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "clip_service_recovered_jobs_total",
        "Pending videos re-enqueued at startup"
    )
    .expect("failed to register clip_service_recovered_jobs_total")
});

/// Force registration so every series shows up before its first event
pub fn init() {
    Lazy::force(&HTTP_REQUESTS_TOTAL);
    Lazy::force(&HTTP_REQUEST_DURATION_SECONDS);
    Lazy::force(&UPLOADS_TOTAL);
    Lazy::force(&UPLOAD_BYTES_TOTAL);
    Lazy::force(&TRANSCODE_ATTEMPTS_TOTAL);
    Lazy::force(&TRANSCODE_JOBS_TOTAL);
    Lazy::force(&TRANSCODE_DURATION_SECONDS);
    Lazy::force(&TRANSCODE_IN_FLIGHT);
    Lazy::force(&TRANSCODE_QUEUE_DEPTH);
    Lazy::force(&STATUS_WRITE_FAILURES_TOTAL);
    Lazy::force(&RECOVERED_JOBS_TOTAL);
}

/// Text exposition of the default registry
pub fn render() -> Result<(String, String), prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;

    let body = String::from_utf8_lossy(&buffer).into_owned();
    Ok((encoder.format_type().to_string(), body))
}
