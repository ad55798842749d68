//! Health check endpoints
//!
//! Provides endpoints for monitoring and container orchestration:
//! - `/health` - Full health check with admission stats
//! - `/health/ready` - Readiness probe
//! - `/health/live` - Liveness probe

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::{limiter::Tier, AppState};

/// Health status enum
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Occupancy of one admission tier
#[derive(Debug, Serialize)]
pub struct TierStats {
    pub tracked_clients: usize,
    pub capacity: usize,
    pub rate_per_second: f64,
    pub burst: u32,
}

/// Admission stats per tier
#[derive(Debug, Serialize)]
pub struct AdmissionStats {
    pub general: TierStats,
    pub sensitive: TierStats,
    pub upload: TierStats,
}

/// Full health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub timestamp: String,
    pub admission: AdmissionStats,
}

/// Simple health response for liveness/readiness
#[derive(Debug, Serialize)]
pub struct SimpleHealthResponse {
    pub status: HealthStatus,
}

fn tier_stats(state: &AppState, tier: Tier) -> TierStats {
    let registry = state.limiters.get(tier);
    let policy = registry.policy();
    TierStats {
        tracked_clients: registry.len(),
        capacity: registry.capacity(),
        rate_per_second: policy.rate,
        burst: policy.burst,
    }
}

/// Full health check endpoint
///
/// Everything lives in process memory, so the service is healthy whenever
/// it can answer. The body reports how full each limiter registry is.
pub async fn health_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let response = HealthResponse {
        status: HealthStatus::Healthy,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        admission: AdmissionStats {
            general: tier_stats(&state, Tier::General),
            sensitive: tier_stats(&state, Tier::Sensitive),
            upload: tier_stats(&state, Tier::Upload),
        },
    };

    (StatusCode::OK, Json(response))
}

/// Readiness probe endpoint
pub async fn readiness_check() -> (StatusCode, Json<SimpleHealthResponse>) {
    (
        StatusCode::OK,
        Json(SimpleHealthResponse {
            status: HealthStatus::Healthy,
        }),
    )
}

/// Liveness probe endpoint
pub async fn liveness_check() -> (StatusCode, Json<SimpleHealthResponse>) {
    (
        StatusCode::OK,
        Json(SimpleHealthResponse {
            status: HealthStatus::Healthy,
        }),
    )
}
