//! Prometheus metrics endpoint
//!
//! Exposes admission and authentication counters in Prometheus format.

use anyhow::Context;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// Global Prometheus handle for metrics export
static PROMETHEUS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Initialize metrics (call once at startup)
pub fn init_metrics() -> anyhow::Result<()> {
    PROMETHEUS_HANDLE.get_or_try_init(|| {
        PrometheusBuilder::new()
            .install_recorder()
            .context("Failed to install Prometheus recorder")
    })?;

    register_metrics();
    Ok(())
}

fn register_metrics() {
    metrics::describe_counter!(
        "dancemirror_admission_total",
        "Admission decisions by tier and result"
    );
    metrics::describe_counter!(
        "dancemirror_auth_failures_total",
        "Rejected authentication attempts by reason"
    );
    metrics::describe_counter!(
        "dancemirror_logins_total",
        "Login attempts by result"
    );
}

/// Prometheus metrics endpoint handler
///
/// Renders an empty body when the recorder was never installed.
pub async fn prometheus_metrics() -> impl IntoResponse {
    PROMETHEUS_HANDLE
        .get()
        .map(PrometheusHandle::render)
        .unwrap_or_default()
}

/// Record an admission decision
pub fn record_admission(tier: &'static str, allowed: bool) {
    let result = if allowed { "allowed" } else { "throttled" };
    metrics::counter!("dancemirror_admission_total", "tier" => tier, "result" => result)
        .increment(1);
}

/// Record a rejected authentication attempt
pub fn record_auth_failure(reason: &'static str) {
    metrics::counter!("dancemirror_auth_failures_total", "reason" => reason).increment(1);
}

/// Record a login attempt
pub fn record_login(result: &'static str) {
    metrics::counter!("dancemirror_logins_total", "result" => result).increment(1);
}
