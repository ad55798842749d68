//! Account endpoints
//!
//! Registration and login sit behind the sensitive admission tier; `/me`
//! requires a verified token.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::{
    auth::password::{hash_password, verify_password},
    error::{AppError, AppResult},
    middleware::auth::AuthenticatedUser,
    routes::metrics::record_login,
    store::{NewUser, User},
    AppState,
};

static PHONE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{11}$").unwrap());

const PASSWORD_MIN_LEN: usize = 6;
const PASSWORD_MAX_LEN: usize = 130;

const BAD_CREDENTIALS: &str = "invalid phone or password";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub phone: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub phone: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
}

impl RegisterRequest {
    fn validate(&self) -> AppResult<()> {
        if !PHONE_PATTERN.is_match(&self.phone) {
            return Err(AppError::BadRequest(
                "phone must be exactly 11 digits".to_string(),
            ));
        }
        let len = self.password.chars().count();
        if !(PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&len) {
            return Err(AppError::BadRequest(format!(
                "password must be between {} and {} characters",
                PASSWORD_MIN_LEN, PASSWORD_MAX_LEN
            )));
        }
        if self.first_name.trim().is_empty() || self.last_name.trim().is_empty() {
            return Err(AppError::BadRequest("name must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Unwrap a JSON body, turning extractor rejections into our error shape
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

/// Register a new account
#[instrument(skip_all)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    let request = json_body(payload)?;
    request.validate()?;

    if state.users.get_by_phone(&request.phone).await?.is_some() {
        return Err(AppError::Conflict(format!(
            "Phone number {} is already registered",
            request.phone
        )));
    }

    let password = request.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| anyhow::anyhow!("password hashing task failed: {}", e))??;

    let user = state
        .users
        .create(NewUser {
            phone: request.phone,
            password_hash,
            first_name: request.first_name.trim().to_string(),
            last_name: request.last_name.trim().to_string(),
        })
        .await?;

    info!(user_id = user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "registered successfully".to_string(),
        }),
    ))
}

/// Exchange phone and password for a signed token
#[instrument(skip_all)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<Json<LoginResponse>> {
    let request = json_body(payload)?;

    let Some(user) = state.users.get_by_phone(&request.phone).await? else {
        warn!("Login for unknown phone");
        record_login("rejected");
        return Err(AppError::BadRequest(BAD_CREDENTIALS.to_string()));
    };

    let password = request.password;
    let stored = user.password_hash.clone();
    let matches = tokio::task::spawn_blocking(move || verify_password(&password, &stored))
        .await
        .map_err(|e| anyhow::anyhow!("password verification task failed: {}", e))?;

    if !matches {
        warn!(user_id = user.id, "Login with wrong password");
        record_login("rejected");
        return Err(AppError::BadRequest(BAD_CREDENTIALS.to_string()));
    }

    let token = state
        .tokens
        .issue(user.id)
        .map_err(|e| AppError::Internal(e.into()))?;

    info!(user_id = user.id, "User logged in");
    record_login("success");

    Ok(Json(LoginResponse {
        token,
        token_type: "Bearer",
        expires_in: state.tokens.ttl().as_secs(),
    }))
}

/// Profile of the authenticated caller
pub async fn me(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
) -> AppResult<Json<User>> {
    state
        .users
        .get_by_id(user.subject_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("user not found".to_string()))
}
