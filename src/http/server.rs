//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the built-in security endpoints
//! - Wire up middleware (edge gate, request ID, tracing, timeout)
//! - Forward admitted requests to the upstream application
//! - Bind server to listener and stop on shutdown

use axum::{
    body::Body,
    extract::State,
    http::{
        header,
        uri::{Authority, PathAndQuery, Scheme},
        HeaderValue, Request, StatusCode, Uri,
    },
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::GateConfig;
use crate::http::middleware::edge_gate_middleware;
use crate::security::SecurityCore;

/// Path of the CSRF token issuance endpoint.
pub const CSRF_TOKEN_PATH: &str = "/api/security/csrf-token";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub core: SecurityCore,
    pub client: Client<HttpConnector, Body>,
    pub upstream: String,
    pub max_body_bytes: usize,
}

/// HTTP server fronting the upstream application.
pub struct HttpServer {
    router: Router,
    config: GateConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GateConfig, core: SecurityCore) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        let state = AppState {
            core,
            client,
            upstream: config.upstream.address.clone(),
            max_body_bytes: config.upstream.max_body_bytes,
        };

        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    pub fn build_router(config: &GateConfig, state: AppState) -> Router {
        let gate = state.core.gate.clone();
        Router::new()
            .route(CSRF_TOKEN_PATH, get(issue_csrf_token))
            .fallback(forward_handler)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.listener.request_timeout_secs)))
            .layer(middleware::from_fn_with_state(gate, edge_gate_middleware))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The assembled router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.address,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GateConfig {
        &self.config
    }
}

#[derive(Debug, Serialize)]
pub struct CsrfTokenResponse {
    pub token: String,
    pub expires_in_secs: u64,
}

async fn issue_csrf_token(State(state): State<AppState>) -> Response {
    let Some(token) = state.core.csrf.issue() else {
        return (StatusCode::SERVICE_UNAVAILABLE, "Try again later").into_response();
    };
    (
        [(header::CACHE_CONTROL, HeaderValue::from_static("no-store"))],
        Json(CsrfTokenResponse {
            token,
            expires_in_secs: state.core.csrf.ttl_secs(),
        }),
    )
        .into_response()
}

/// Forward an admitted request to the upstream application.
async fn forward_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let (parts, body) = request.into_parts();

    let authority = match Authority::from_str(&state.upstream) {
        Ok(a) => a,
        Err(e) => {
            tracing::error!(request_id = %request_id, upstream = %state.upstream, error = %e, "Invalid upstream address");
            return (StatusCode::BAD_GATEWAY, "Upstream unavailable").into_response();
        }
    };

    let body = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(_) => return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response(),
    };

    let mut uri_parts = parts.uri.clone().into_parts();
    uri_parts.scheme = Some(Scheme::HTTP);
    uri_parts.authority = Some(authority);
    uri_parts
        .path_and_query
        .get_or_insert_with(|| PathAndQuery::from_static("/"));
    let uri = match Uri::from_parts(uri_parts) {
        Ok(uri) => uri,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Could not build upstream URI");
            return (StatusCode::BAD_REQUEST, "Invalid request").into_response();
        }
    };

    let mut builder = Request::builder().method(parts.method.clone()).uri(uri);
    if let Some(headers) = builder.headers_mut() {
        for (k, v) in parts.headers.iter() {
            headers.append(k.clone(), v.clone());
        }
    }
    let upstream_request = match builder.body(Body::from(body)) {
        Ok(req) => req,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Could not build upstream request");
            return (StatusCode::BAD_REQUEST, "Invalid request").into_response();
        }
    };

    tracing::debug!(
        request_id = %request_id,
        method = %parts.method,
        path = %parts.uri.path(),
        "Forwarding request"
    );

    match state.client.request(upstream_request).await {
        Ok(response) => {
            let (parts, body) = response.into_parts();
            Response::from_parts(parts, Body::new(body))
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Upstream error");
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
    }
}
