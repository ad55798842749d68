//! Admission control middleware
//!
//! Takes one permit from the client's bucket in the guarded tier before the
//! request goes any further. A request with no permit left gets a 429 and
//! nothing downstream runs.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::{instrument, warn};

use crate::{
    error::AppError,
    limiter::{RateLimitResult, Tier},
    middleware::client_ip::{client_identifier, peer_ip},
    routes::metrics::record_admission,
    AppState,
};

const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");

/// State for one admission layer: which tier it draws permits from
#[derive(Clone)]
pub struct AdmissionGuard {
    state: Arc<AppState>,
    tier: Tier,
}

impl AdmissionGuard {
    pub fn new(state: Arc<AppState>, tier: Tier) -> Self {
        Self { state, tier }
    }
}

impl RateLimitResult {
    /// Informational rate limit headers for an admitted request
    pub fn headers(&self) -> [(HeaderName, HeaderValue); 2] {
        [
            (X_RATELIMIT_LIMIT, HeaderValue::from(self.limit)),
            (X_RATELIMIT_REMAINING, HeaderValue::from(self.remaining)),
        ]
    }
}

/// Admission middleware
///
/// Use with `middleware::from_fn_with_state(AdmissionGuard::new(state, tier), ...)`.
/// When several tiers are stacked, the innermost tier's headers are kept.
#[instrument(skip_all, fields(tier = guard.tier.as_str()))]
pub async fn admission_middleware(
    State(guard): State<AdmissionGuard>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let client = client_identifier(
        request.headers(),
        peer_ip(&request),
        &guard.state.config.proxy_trust,
    );

    let result = guard.state.limiters.get(guard.tier).check(&client);
    record_admission(guard.tier.as_str(), result.allowed);

    if !result.allowed {
        warn!(
            client = %client,
            limit = result.limit,
            retry_after_ms = result.retry_after.as_millis() as u64,
            "Rate limit exceeded"
        );
        return Err(AppError::RateLimitExceeded {
            limit: result.limit,
            retry_after: result.retry_after,
        });
    }

    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    for (name, value) in result.headers() {
        headers.entry(name).or_insert(value);
    }

    Ok(response)
}
