//! Signed identity tokens
//!
//! Tokens are HS256 JWTs carrying the subject id (`sub`, decimal), `iat` and
//! `exp`. Nothing is stored server side: a token is valid exactly when its
//! HMAC checks out under the server secret and `exp` has not passed.
//!
//! Expiry is checked here rather than by `jsonwebtoken` so that "now" can be
//! supplied explicitly, and so that a bad signature is always reported as
//! such even when the token is also expired.

use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Config;

/// Claims embedded in every identity token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject id as a decimal string
    pub sub: String,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expires at (unix seconds)
    pub exp: i64,
}

/// Why a token was refused
///
/// These are logged, never returned to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum VerificationError {
    #[error("token is malformed")]
    MalformedToken,

    #[error("token signature does not match")]
    SignatureMismatch,

    #[error("token has expired")]
    Expired,
}

impl VerificationError {
    /// Short label for logs and metrics
    pub fn reason(&self) -> &'static str {
        match self {
            VerificationError::MalformedToken => "malformed",
            VerificationError::SignatureMismatch => "bad_signature",
            VerificationError::Expired => "expired",
        }
    }
}

/// Failure to produce a token
#[derive(Debug, Error)]
pub enum IssueError {
    #[error("token lifetime must be positive and representable")]
    InvalidTtl,

    #[error("failed to sign token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

/// Issue a token for `subject_id` valid for `ttl` from now
pub fn issue(subject_id: i64, secret: &[u8], ttl: Duration) -> Result<String, IssueError> {
    issue_at(subject_id, secret, ttl, Utc::now())
}

/// Issue a token as if the current time were `now`
pub fn issue_at(
    subject_id: i64,
    secret: &[u8],
    ttl: Duration,
    now: DateTime<Utc>,
) -> Result<String, IssueError> {
    sign(subject_id, &EncodingKey::from_secret(secret), ttl, now)
}

/// Verify `token` against `secret` and return its subject id
pub fn verify(token: &str, secret: &[u8]) -> Result<i64, VerificationError> {
    verify_at(token, secret, Duration::ZERO, Utc::now())
}

/// Verify `token` as if the current time were `now`
pub fn verify_at(
    token: &str,
    secret: &[u8],
    leeway: Duration,
    now: DateTime<Utc>,
) -> Result<i64, VerificationError> {
    check(token, &DecodingKey::from_secret(secret), leeway, now)
}

fn sign(
    subject_id: i64,
    key: &EncodingKey,
    ttl: Duration,
    now: DateTime<Utc>,
) -> Result<String, IssueError> {
    let ttl = chrono::Duration::from_std(ttl).map_err(|_| IssueError::InvalidTtl)?;
    if ttl <= chrono::Duration::zero() {
        return Err(IssueError::InvalidTtl);
    }
    let expires_at = now.checked_add_signed(ttl).ok_or(IssueError::InvalidTtl)?;

    let claims = Claims {
        sub: subject_id.to_string(),
        iat: now.timestamp(),
        exp: expires_at.timestamp(),
    };

    Ok(encode(&Header::new(Algorithm::HS256), &claims, key)?)
}

fn validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp", "sub"]);
    validation
}

fn check(
    token: &str,
    key: &DecodingKey,
    leeway: Duration,
    now: DateTime<Utc>,
) -> Result<i64, VerificationError> {
    // The HMAC comparison inside `decode` is constant time.
    let data = decode::<Claims>(token, key, &validation()).map_err(|e| match e.kind() {
        ErrorKind::InvalidSignature => VerificationError::SignatureMismatch,
        ErrorKind::ExpiredSignature => VerificationError::Expired,
        _ => VerificationError::MalformedToken,
    })?;

    let subject_id: i64 = data
        .claims
        .sub
        .parse()
        .map_err(|_| VerificationError::MalformedToken)?;

    let leeway = i64::try_from(leeway.as_secs()).unwrap_or(i64::MAX);
    if now.timestamp() > data.claims.exp.saturating_add(leeway) {
        return Err(VerificationError::Expired);
    }

    Ok(subject_id)
}

/// Token issuer and verifier bound to the process-wide secret
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
    leeway: Duration,
}

impl TokenCodec {
    pub fn new(secret: &[u8], ttl: Duration, leeway: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
            leeway,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.jwt_secret.as_bytes(),
            config.jwt_expiration,
            config.jwt_leeway,
        )
    }

    /// Lifetime given to issued tokens
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, subject_id: i64) -> Result<String, IssueError> {
        self.issue_at(subject_id, Utc::now())
    }

    pub fn issue_at(&self, subject_id: i64, now: DateTime<Utc>) -> Result<String, IssueError> {
        sign(subject_id, &self.encoding, self.ttl, now)
    }

    pub fn verify(&self, token: &str) -> Result<i64, VerificationError> {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<i64, VerificationError> {
        check(token, &self.decoding, self.leeway, now)
    }
}
