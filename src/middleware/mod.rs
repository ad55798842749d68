//! Middleware module
//!
//! Contains axum middleware for admission control and authentication.

pub mod admission;
pub mod auth;
pub mod client_ip;
