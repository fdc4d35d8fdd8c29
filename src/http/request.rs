//! Request attribute extraction.
//!
//! # Responsibilities
//! - Resolve the client IP (trusted proxy headers or socket peer)
//! - Reconstruct the request's own origin for same-origin checks
//! - Collect everything the gate decides on into a [`RequestMeta`]

use std::net::SocketAddr;
use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, HeaderMap, Request},
};

use crate::config::EdgeGateConfig;
use crate::security::gate::RequestMeta;

/// Identifier used when no client address can be determined.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Resolve the client IP. Forwarding headers are only honoured when
/// `trust_forwarded` is set.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>, trust_forwarded: bool) -> String {
    if trust_forwarded {
        let forwarded = header_str(headers, "x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .or_else(|| header_str(headers, "x-real-ip").map(str::trim));
        if let Some(ip) = forwarded {
            return ip.to_string();
        }
    }
    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// `scheme://host` of the request as the client addressed it. HTTP/2
/// requests carry the host in `:authority`, passed here as `authority`.
pub fn request_origin(headers: &HeaderMap, authority: Option<&str>, default_scheme: &str) -> Option<String> {
    let host = header_str(headers, header::HOST.as_str()).or(authority)?;
    let scheme = header_str(headers, "x-forwarded-proto")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .unwrap_or(default_scheme);
    Some(format!("{}://{}", scheme.to_ascii_lowercase(), host.to_ascii_lowercase()))
}

/// Collect the gate's inputs from an inbound request.
pub fn request_meta(request: &Request<Body>, config: &EdgeGateConfig) -> RequestMeta {
    let headers = request.headers();
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let owned = |name: &str| header_str(headers, name).map(str::to_string);

    RequestMeta {
        client_ip: client_ip(headers, peer, config.trust_forwarded_for),
        method: request.method().clone(),
        path: request.uri().path().to_string(),
        user_agent: owned(header::USER_AGENT.as_str()),
        referer: owned(header::REFERER.as_str()),
        origin: request_origin(
            headers,
            request.uri().authority().map(|a| a.as_str()),
            &config.default_scheme,
        ),
        content_type: owned(header::CONTENT_TYPE.as_str()),
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
