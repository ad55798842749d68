//! HTTP routes for DanceMirror
//!
//! This module defines all HTTP endpoints exposed by the service.

pub mod health;
pub mod metrics;
pub mod users;
pub mod videos;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{header, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::{
    limiter::Tier,
    middleware::{
        admission::{admission_middleware, AdmissionGuard},
        auth::auth_middleware,
    },
    AppState,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Create the main application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(Duration::from_secs(3600));

    // Account routes: no token yet, but a tight budget
    let account_routes = Router::new()
        .route("/register", post(users::register))
        .route("/login", post(users::login))
        .layer(middleware::from_fn_with_state(
            AdmissionGuard::new(state.clone(), Tier::Sensitive),
            admission_middleware,
        ));

    // Middleware is applied in reverse order (last applied runs first),
    // so the upload tier is checked before the token is
    let upload_routes = Router::new()
        .route("/videos/upload", post(videos::upload))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            AdmissionGuard::new(state.clone(), Tier::Upload),
            admission_middleware,
        ));

    let protected_routes = Router::new()
        .route("/me", get(users::me))
        .route("/videos", get(videos::list))
        .route("/videos/:id", get(videos::get).delete(videos::delete))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // Every API request draws from the general tier first
    let api_routes = Router::new()
        .merge(account_routes)
        .merge(upload_routes)
        .merge(protected_routes)
        .layer(middleware::from_fn_with_state(
            AdmissionGuard::new(state.clone(), Tier::General),
            admission_middleware,
        ));

    // Public routes (health checks, metrics) - no admission, no auth
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .route("/health/live", get(health::liveness_check))
        .route("/metrics", get(metrics::prometheus_metrics));

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        // Global middleware (applied to all routes)
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
