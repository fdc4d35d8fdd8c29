use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::admin::AdminState;
use crate::security::suspicion::BlockedEntry;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub uptime_secs: u64,
}

#[derive(Serialize)]
pub struct SecurityStats {
    pub rate_windows: usize,
    pub suspicion_records: usize,
    pub blocked_identifiers: usize,
    pub login_records: usize,
    pub locked_identifiers: usize,
    pub csrf_tokens: usize,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        uptime_secs: state.started.elapsed().as_secs(),
    })
}

pub async fn get_stats(State(state): State<AdminState>) -> Json<SecurityStats> {
    let core = &state.core;
    Json(SecurityStats {
        rate_windows: core.limiter.len(),
        suspicion_records: core.suspicion.len(),
        blocked_identifiers: core.suspicion.blocked_len(),
        login_records: core.login.len(),
        locked_identifiers: core.login.locked_len(),
        csrf_tokens: core.csrf.len(),
    })
}

pub async fn list_blocked(State(state): State<AdminState>) -> Json<Vec<BlockedEntry>> {
    Json(state.core.suspicion.blocked())
}

pub async fn unblock(
    State(state): State<AdminState>,
    Path(identifier): Path<String>,
) -> StatusCode {
    if state.core.suspicion.unblock(&identifier) {
        tracing::info!(identifier = %identifier, "Unblocked via admin API");
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

pub async fn clear_lockout(
    State(state): State<AdminState>,
    Path(identifier): Path<String>,
) -> StatusCode {
    state.core.login.clear(&identifier);
    tracing::info!(identifier = %identifier, "Login lockout cleared via admin API");
    StatusCode::NO_CONTENT
}
