//! Edge gate middleware.
//! Runs every inbound request through [`EdgeGate::evaluate`].

use std::sync::Arc;
use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::http::request::request_meta;
use crate::security::gate::{EdgeGate, Verdict};

pub async fn edge_gate_middleware(
    State(gate): State<Arc<EdgeGate>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let meta = request_meta(&request, gate.config());

    match gate.evaluate(&meta) {
        Verdict::Allow => {
            let mut response = next.run(request).await;
            if let Some(headers) = gate.headers() {
                headers.apply(response.headers_mut());
            }
            response
        }
        Verdict::Redirect { location, .. } => Redirect::temporary(&location).into_response(),
        Verdict::Reject { status, rule } => (status, rule.message()).into_response(),
    }
}
