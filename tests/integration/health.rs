//! Health endpoint integration tests
//!
//! Tests for the health check endpoints:
//! - GET /health - Full health check with admission stats
//! - GET /health/ready - Readiness probe
//! - GET /health/live - Liveness probe
//! - GET /metrics - Prometheus text

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::Value;

use crate::common::{client, test_server};

#[tokio::test]
async fn test_health_endpoint_returns_stats() {
    let (server, _state) = test_server();

    let response = server.get("/health").await;
    response.assert_status_ok();

    let json: Value = response.json();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    assert!(json["uptime_seconds"].is_u64());
    assert!(json["timestamp"].is_string());
    assert_eq!(json["admission"]["general"]["burst"], 20);
    assert_eq!(json["admission"]["sensitive"]["burst"], 5);
    assert_eq!(json["admission"]["upload"]["burst"], 2);
}

#[tokio::test]
async fn test_health_counts_tracked_clients() {
    let (server, _state) = test_server();
    let (name, value) = client("203.0.113.40");

    server
        .get("/api/v1/me")
        .add_header(name, value)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    let json: Value = server.get("/health").await.json();
    assert_eq!(json["admission"]["general"]["tracked_clients"], 1);
    assert_eq!(json["admission"]["upload"]["tracked_clients"], 0);
}

#[tokio::test]
async fn test_probes() {
    let (server, _state) = test_server();

    for path in ["/health/ready", "/health/live"] {
        let response = server.get(path).await;
        response.assert_status_ok();
        let json: Value = response.json();
        assert_eq!(json["status"], "healthy");
    }
}

#[tokio::test]
async fn test_health_is_not_rate_limited() {
    let (server, _state) = test_server();
    let (name, value) = client("203.0.113.41");

    for _ in 0..30 {
        server
            .get("/health/live")
            .add_header(name.clone(), value.clone())
            .await
            .assert_status_ok();
    }
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (server, _state) = test_server();
    server.get("/metrics").await.assert_status_ok();
}

#[tokio::test]
async fn test_health_methods_not_allowed() {
    let (server, _state) = test_server();

    let response = server.post("/health").await;
    response.assert_status(StatusCode::METHOD_NOT_ALLOWED);
}
