//! Prometheus Metrics Module
//!
//! Provides application-wide metrics collection using Prometheus.
//!
//! # Metrics Collected
//! - HTTP request counts by method, path, and status
//! - HTTP request latency histograms
//! - Active WebSocket connection gauge
//! - Fan-out deliveries by event name and outcome
//! - Coordinator failures by operation and error kind
//! - Persistent store operation latency

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

const NAMESPACE: &str = "chat_coordinator";

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// HTTP request counter - tracks total requests by method, path, and status code
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("http_requests_total", "Total number of HTTP requests").namespace(NAMESPACE),
        &["method", "path", "status"],
    )
    .expect("Failed to create HTTP_REQUESTS_TOTAL metric")
});

/// HTTP request latency histogram - tracks request duration in seconds
pub static HTTP_REQUEST_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let buckets = vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];
    HistogramVec::new(
        HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request latency in seconds",
        )
        .namespace(NAMESPACE)
        .buckets(buckets),
        &["method", "path"],
    )
    .expect("Failed to create HTTP_REQUEST_DURATION_SECONDS metric")
});

/// Live WebSocket connections held by this node
pub static WEBSOCKET_CONNECTIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::with_opts(
        Opts::new(
            "websocket_connections_active",
            "Number of live WebSocket connections",
        )
        .namespace(NAMESPACE),
    )
    .expect("Failed to create WEBSOCKET_CONNECTIONS_ACTIVE metric")
});

/// Fan-out deliveries - one increment per (connection, event) attempt
pub static FANOUT_DELIVERIES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("fanout_deliveries_total", "Events pushed to live connections")
            .namespace(NAMESPACE),
        &["event", "outcome"], // outcome: "delivered", "skipped"
    )
    .expect("Failed to create FANOUT_DELIVERIES_TOTAL metric")
});

/// Coordinator operation failures
pub static COORDINATOR_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("coordinator_failures_total", "Failed coordinator operations")
            .namespace(NAMESPACE),
        &["operation", "kind"],
    )
    .expect("Failed to create COORDINATOR_FAILURES_TOTAL metric")
});

/// Persistent store operation latency
pub static STORE_OPERATION_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let buckets = vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5];
    HistogramVec::new(
        HistogramOpts::new(
            "store_operation_duration_seconds",
            "Persistent store operation latency in seconds",
        )
        .namespace(NAMESPACE)
        .buckets(buckets),
        &["operation", "collection"],
    )
    .expect("Failed to create STORE_OPERATION_DURATION_SECONDS metric")
});

/// Register all metrics with the registry
fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .expect("Failed to register HTTP_REQUESTS_TOTAL");
    registry
        .register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()))
        .expect("Failed to register HTTP_REQUEST_DURATION_SECONDS");
    registry
        .register(Box::new(WEBSOCKET_CONNECTIONS_ACTIVE.clone()))
        .expect("Failed to register WEBSOCKET_CONNECTIONS_ACTIVE");
    registry
        .register(Box::new(FANOUT_DELIVERIES_TOTAL.clone()))
        .expect("Failed to register FANOUT_DELIVERIES_TOTAL");
    registry
        .register(Box::new(COORDINATOR_FAILURES_TOTAL.clone()))
        .expect("Failed to register COORDINATOR_FAILURES_TOTAL");
    registry
        .register(Box::new(STORE_OPERATION_DURATION_SECONDS.clone()))
        .expect("Failed to register STORE_OPERATION_DURATION_SECONDS");
}

/// Collect and encode all metrics as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Helper to record HTTP request metrics
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration_secs);
}

/// Helper to record one fan-out attempt
pub fn record_fanout(event: &str, delivered: bool) {
    let outcome = if delivered { "delivered" } else { "skipped" };
    FANOUT_DELIVERIES_TOTAL
        .with_label_values(&[event, outcome])
        .inc();
}

/// Helper to record a failed coordinator operation
pub fn record_failure(operation: &str, kind: &str) {
    COORDINATOR_FAILURES_TOTAL
        .with_label_values(&[operation, kind])
        .inc();
}

/// Helper to record store operation latency
pub fn record_store_operation(operation: &str, collection: &str, duration_secs: f64) {
    STORE_OPERATION_DURATION_SECONDS
        .with_label_values(&[operation, collection])
        .observe(duration_secs);
}

/// Helper to track the WebSocket connection count
pub fn websocket_connected() {
    WEBSOCKET_CONNECTIONS_ACTIVE.inc();
}

pub fn websocket_disconnected() {
    WEBSOCKET_CONNECTIONS_ACTIVE.dec();
}
