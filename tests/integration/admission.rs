//! Admission control integration tests
//!
//! Tests for the per-client token buckets in front of the API:
//! - 429 with Retry-After once a client's burst is spent
//! - Informational X-RateLimit headers on admitted requests
//! - Independent budgets per client and per tier

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use crate::common::{client, register_body, test_config, test_server, test_server_with};
use dancemirror::RatePolicy;

#[tokio::test]
async fn test_sensitive_tier_throttles_after_burst() {
    let (server, _state) = test_server();
    let (name, value) = client("198.51.100.10");
    let login = json!({ "phone": "13900000000", "password": "whatever" });

    // Sensitive burst is 5; unknown phone is a 400 but still costs a permit
    for _ in 0..5 {
        server
            .post("/api/v1/login")
            .add_header(name.clone(), value.clone())
            .json(&login)
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    let response = server
        .post("/api/v1/login")
        .add_header(name, value)
        .json(&login)
        .await;

    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = response
        .header("retry-after")
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry_after >= 1);

    let json: Value = response.json();
    assert_eq!(json["error"]["code"], "RATE_LIMIT_EXCEEDED");
    assert_eq!(json["error"]["details"]["limit"], 5);
    assert_eq!(json["error"]["details"]["remaining"], 0);
}

#[tokio::test]
async fn test_other_client_keeps_its_budget() {
    let (server, _state) = test_server();
    let (noisy_name, noisy_value) = client("198.51.100.11");
    let login = json!({ "phone": "13900000000", "password": "whatever" });

    for _ in 0..6 {
        server
            .post("/api/v1/login")
            .add_header(noisy_name.clone(), noisy_value.clone())
            .json(&login)
            .await;
    }

    let (name, value) = client("198.51.100.12");
    server
        .post("/api/v1/login")
        .add_header(name, value)
        .json(&login)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_tiers_are_independent() {
    let (server, _state) = test_server();
    let (name, value) = client("198.51.100.13");

    for i in 0..6 {
        server
            .post("/api/v1/register")
            .add_header(name.clone(), value.clone())
            .json(&register_body(&format!("1370000000{}", i)))
            .await;
    }

    // Sensitive tier is spent, the general tier is not
    server
        .post("/api/v1/login")
        .add_header(name.clone(), value.clone())
        .json(&json!({ "phone": "13700000000", "password": "whatever" }))
        .await
        .assert_status(StatusCode::TOO_MANY_REQUESTS);

    server
        .get("/api/v1/me")
        .add_header(name, value)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admission_runs_before_authentication() {
    let mut config = test_config();
    config.rate_limits.general = RatePolicy::new(1.0, 2).unwrap();
    let (server, _state) = test_server_with(config);
    let (name, value) = client("198.51.100.14");

    for _ in 0..2 {
        server
            .get("/api/v1/videos")
            .add_header(name.clone(), value.clone())
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    // No token either way: the throttle answers before auth is consulted
    server
        .get("/api/v1/videos")
        .add_header(name, value)
        .await
        .assert_status(StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_admitted_response_has_rate_limit_headers() {
    let (server, _state) = test_server();
    let (name, value) = client("198.51.100.15");

    let response = server
        .post("/api/v1/login")
        .add_header(name, value)
        .json(&json!({ "phone": "13900000000", "password": "whatever" }))
        .await;

    // The innermost tier (sensitive) sets the headers
    assert_eq!(response.header("x-ratelimit-limit"), "5");
    assert_eq!(response.header("x-ratelimit-remaining"), "4");
}
