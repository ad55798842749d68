//! Authentication middleware
//!
//! Verifies the bearer token and attaches the caller's identity to the
//! request. Every failure gets the same kind of 401; why a token was refused
//! only shows up in the logs.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};
use tracing::{debug, instrument, warn};

use crate::{error::AppError, routes::metrics::record_auth_failure, AppState};

/// Identity of the caller, established from a verified token
///
/// Handlers take this as an extractor. If the authentication middleware did
/// not run for the route, extraction fails with an internal error rather than
/// falling back to an anonymous caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub subject_id: i64,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .copied()
            .ok_or(AppError::MissingIdentity)
    }
}

/// Extract the Authorization header and return the bearer token
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Short fingerprint of a token for log correlation
pub fn token_fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    hex::encode(&digest[..8])
}

/// Authentication middleware
///
/// This middleware:
/// 1. Extracts the bearer token from the Authorization header
/// 2. Verifies signature and expiry with the process-wide secret
/// 3. Adds AuthenticatedUser to request extensions
#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(extract_bearer_token)
        .ok_or_else(|| {
            debug!("Request without bearer token");
            record_auth_failure("missing");
            AppError::Unauthorized
        })?;

    let subject_id = state.tokens.verify(token).map_err(|e| {
        warn!(
            reason = e.reason(),
            token = %token_fingerprint(token),
            "Token verification failed"
        );
        record_auth_failure(e.reason());
        AppError::InvalidToken
    })?;

    debug!(subject_id, "User authenticated successfully");

    request
        .extensions_mut()
        .insert(AuthenticatedUser { subject_id });

    Ok(next.run(request).await)
}
