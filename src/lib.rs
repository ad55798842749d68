//! DanceMirror - short video practice backend
//!
//! This library provides the request admission and identity layer in front
//! of the video API: signed identity tokens, per-client token bucket
//! admission control, and the middleware that applies both.

pub mod auth;
pub mod config;
pub mod error;
pub mod limiter;
pub mod middleware;
pub mod routes;
pub mod store;

use std::sync::Arc;
use std::time::Instant;

pub use crate::auth::TokenCodec;
pub use crate::config::Config;
pub use crate::limiter::{AdmissionRegistries, LimiterRegistry, RatePolicy, Tier};
pub use crate::store::{InMemoryUserStore, InMemoryVideoStore, UserStore, VideoStore};

/// Application state shared across all request handlers
pub struct AppState {
    pub config: Config,
    pub start_time: Instant,
    /// Issues and verifies identity tokens with the process-wide secret
    pub tokens: TokenCodec,
    /// One limiter registry per admission tier
    pub limiters: AdmissionRegistries,
    pub users: Arc<dyn UserStore>,
    pub videos: Arc<dyn VideoStore>,
}

impl AppState {
    /// Create a new application state
    pub fn new(config: Config) -> Self {
        Self::with_stores(
            config,
            Arc::new(InMemoryUserStore::new()),
            Arc::new(InMemoryVideoStore::new()),
        )
    }

    /// Create application state backed by the given stores
    pub fn with_stores(
        config: Config,
        users: Arc<dyn UserStore>,
        videos: Arc<dyn VideoStore>,
    ) -> Self {
        let tokens = TokenCodec::from_config(&config);
        let limiters = AdmissionRegistries::new(&config.rate_limits);

        Self {
            config,
            start_time: Instant::now(),
            tokens,
            limiters,
            users,
            videos,
        }
    }

    /// Create application state for tests without touching the environment
    #[cfg(any(test, feature = "test-utils"))]
    pub fn new_for_testing(config: Config) -> Arc<Self> {
        Arc::new(Self::new(config))
    }
}
