//! Health Check API Tests

use axum::http::StatusCode;
use serde_json::Value;

use crate::common::TestApp;

#[tokio::test]
async fn test_health_check_returns_ok() {
    let app = TestApp::new().await;

    let response = app.server.get("/health").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_liveness_probe() {
    let app = TestApp::new().await;

    let response = app.server.get("/health/live").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "alive");
    assert!(body.get("version").is_none());
}

#[tokio::test]
async fn test_readiness_with_in_process_backends() {
    let app = TestApp::new().await;

    let response = app.server.get("/health/ready").await;

    response.assert_status(StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["checks"]["database"]["status"], "healthy");
    assert_eq!(body["checks"]["connection_registry"]["status"], "healthy");
    assert_eq!(body["checks"]["websocket"]["active_connections"], 0);
}

#[tokio::test]
async fn test_metrics_endpoint_exposes_prometheus_text() {
    let app = TestApp::new().await;
    app.server.get("/health").await;

    let response = app.server.get("/metrics").await;

    response.assert_status_ok();
    assert!(response.text().contains("http_requests_total"));
}
