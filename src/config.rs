//! Configuration management for DanceMirror
//!
//! Configuration is loaded from environment variables (a `.env` file is
//! honoured by `main` before this runs).

use std::env;
use std::net::IpAddr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::limiter::RatePolicy;

/// Secrets shorter than this get a startup warning
pub const MIN_RECOMMENDED_SECRET_LEN: usize = 32;

/// When forwarded-for style headers may be used to identify a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyTrust {
    /// Always honour `X-Forwarded-For` / `X-Real-IP`. Spoofable unless the
    /// service only ever sits behind a reverse proxy that overwrites them.
    Always,
    /// Ignore the headers and use the connection address.
    Never,
    /// Honour the headers only when the peer is one of these proxies.
    Proxies(Vec<IpAddr>),
}

impl ProxyTrust {
    /// Parse `always`, `never`, or a comma-separated list of proxy addresses
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "always" | "true" | "1" => Ok(Self::Always),
            "never" | "false" | "0" => Ok(Self::Never),
            list => {
                let proxies = list
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(|s| {
                        s.parse::<IpAddr>()
                            .with_context(|| format!("Invalid proxy address '{}'", s))
                    })
                    .collect::<Result<Vec<_>>>()?;
                if proxies.is_empty() {
                    bail!("TRUST_PROXY_HEADERS must be 'always', 'never' or a list of addresses");
                }
                Ok(Self::Proxies(proxies))
            }
        }
    }

    /// Whether headers from a request arriving from `peer` may be trusted
    pub fn trusts(&self, peer: Option<IpAddr>) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Proxies(proxies) => peer.map(|ip| proxies.contains(&ip)).unwrap_or(false),
        }
    }
}

/// Per-tier rate limit settings
#[derive(Debug, Clone)]
pub struct RateLimitSettings {
    /// All API traffic
    pub general: RatePolicy,
    /// Login and registration
    pub sensitive: RatePolicy,
    /// Video upload
    pub upload: RatePolicy,
    /// Maximum tracked clients per tier before LRU eviction
    pub max_clients: usize,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            general: RatePolicy::GENERAL,
            sensitive: RatePolicy::SENSITIVE,
            upload: RatePolicy::UPLOAD,
            max_clients: 10_000,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Externally visible base URL
    pub public_host: String,

    /// HMAC secret for identity tokens
    pub jwt_secret: String,
    /// Lifetime of issued tokens
    pub jwt_expiration: Duration,
    /// Clock skew tolerated when checking expiry
    pub jwt_leeway: Duration,

    /// Largest accepted video, in bytes
    pub max_upload_size: u64,

    pub rate_limits: RateLimitSettings,
    pub proxy_trust: ProxyTrust,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = RateLimitSettings::default();

        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        if jwt_secret.is_empty() {
            bail!("JWT_SECRET must not be empty");
        }

        Ok(Self {
            host: env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("APP_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("Invalid APP_PORT")?,
            public_host: env::var("PUBLIC_HOST")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),

            jwt_secret,
            jwt_expiration: Duration::from_secs(
                env::var("JWT_EXPIRATION_SECONDS")
                    .unwrap_or_else(|_| "259200".to_string())
                    .parse()
                    .context("Invalid JWT_EXPIRATION_SECONDS")?,
            ),
            jwt_leeway: Duration::from_secs(
                env::var("JWT_LEEWAY_SECONDS")
                    .unwrap_or_else(|_| "0".to_string())
                    .parse()
                    .context("Invalid JWT_LEEWAY_SECONDS")?,
            ),

            max_upload_size: env::var("MAX_UPLOAD_SIZE")
                .unwrap_or_else(|_| "524288000".to_string())
                .parse()
                .context("Invalid MAX_UPLOAD_SIZE")?,

            rate_limits: RateLimitSettings {
                general: policy_from_env("RATE_LIMIT_GENERAL", defaults.general)?,
                sensitive: policy_from_env("RATE_LIMIT_SENSITIVE", defaults.sensitive)?,
                upload: policy_from_env("RATE_LIMIT_UPLOAD", defaults.upload)?,
                max_clients: env::var("RATE_LIMIT_MAX_CLIENTS")
                    .unwrap_or_else(|_| defaults.max_clients.to_string())
                    .parse()
                    .context("Invalid RATE_LIMIT_MAX_CLIENTS")?,
            },
            proxy_trust: ProxyTrust::parse(
                &env::var("TRUST_PROXY_HEADERS").unwrap_or_else(|_| "always".to_string()),
            )
            .context("Invalid TRUST_PROXY_HEADERS")?,
        })
    }

    /// Whether the signing secret is long enough to be considered safe
    pub fn has_strong_secret(&self) -> bool {
        self.jwt_secret.len() >= MIN_RECOMMENDED_SECRET_LEN
    }

    /// Configuration with defaults and the given secret, for tests
    #[cfg(any(test, feature = "test-utils"))]
    pub fn for_testing(jwt_secret: &str) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            public_host: "http://localhost:8080".to_string(),
            jwt_secret: jwt_secret.to_string(),
            jwt_expiration: Duration::from_secs(3600),
            jwt_leeway: Duration::ZERO,
            max_upload_size: 524_288_000,
            rate_limits: RateLimitSettings::default(),
            proxy_trust: ProxyTrust::Always,
        }
    }
}

fn policy_from_env(key: &str, default: RatePolicy) -> Result<RatePolicy> {
    match env::var(key) {
        Ok(value) => RatePolicy::parse(&value).with_context(|| format!("Invalid {}", key)),
        Err(_) => Ok(default),
    }
}
