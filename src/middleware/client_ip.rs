//! Client identification for admission control
//!
//! The identifier is the first `X-Forwarded-For` entry, else `X-Real-IP`,
//! else the peer IP of the connection. The headers are only consulted when
//! [`ProxyTrust`] allows it: any client can set them, so trusting them
//! without a reverse proxy in front lets a caller pick its own budget.

use std::net::{IpAddr, SocketAddr};

use axum::{
    extract::{ConnectInfo, Request},
    http::HeaderMap,
};

use crate::config::ProxyTrust;

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const X_REAL_IP: &str = "x-real-ip";

/// Identifier used when nothing else is available
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Peer address recorded by `into_make_service_with_connect_info`
pub fn peer_ip(request: &Request) -> Option<IpAddr> {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Derive the rate limiting identity of a request
pub fn client_identifier(headers: &HeaderMap, peer: Option<IpAddr>, trust: &ProxyTrust) -> String {
    if trust.trusts(peer) {
        let forwarded = header_value(headers, X_FORWARDED_FOR)
            .and_then(|list| list.split(',').map(str::trim).find(|entry| !entry.is_empty()));
        if let Some(client) = forwarded.or_else(|| header_value(headers, X_REAL_IP)) {
            return client.to_string();
        }
    }

    peer.map(|ip| ip.to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}
