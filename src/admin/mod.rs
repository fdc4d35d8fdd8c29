//! Admin API for inspecting and releasing security state.
//!
//! Served on its own listener so the public edge rules never apply to it.

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{delete, get},
    Router,
};
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::security::SecurityCore;
use self::auth::admin_auth_middleware;
use self::handlers::*;

/// State shared by admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub core: SecurityCore,
    pub api_key: Arc<str>,
    pub started: Instant,
}

impl AdminState {
    pub fn new(core: SecurityCore, api_key: &str) -> Self {
        Self {
            core,
            api_key: Arc::from(api_key),
            started: Instant::now(),
        }
    }
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/security/stats", get(get_stats))
        .route("/admin/security/blocked", get(list_blocked))
        .route("/admin/security/blocked/{identifier}", delete(unblock))
        .route("/admin/security/lockouts/{identifier}", delete(clear_lockout))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}

/// Serve the admin API until `shutdown` fires.
pub async fn serve_admin(
    listener: TcpListener,
    state: AdminState,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<(), std::io::Error> {
    tracing::info!(address = %listener.local_addr()?, "Admin API listening");
    axum::serve(listener, setup_admin_router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GateConfig;
    use crate::security::clock::ManualClock;
    use crate::security::suspicion::SuspicionKind;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn state() -> AdminState {
        let mut config = GateConfig::default();
        config.storage.passphrase = "pass".into();
        config.storage.pbkdf2_rounds = 1;
        let core = SecurityCore::new(&config, Arc::new(ManualClock::new(0))).unwrap();
        AdminState::new(core, "admin-key")
    }

    fn request(method: &str, uri: &str, key: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(key) = key {
            builder = builder.header("authorization", format!("Bearer {}", key));
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_requires_key() {
        let app = setup_admin_router(state());

        let res = app.clone().oneshot(request("GET", "/admin/status", None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let res = app.clone().oneshot(request("GET", "/admin/status", Some("wrong"))).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let res = app.oneshot(request("GET", "/admin/status", Some("admin-key"))).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unblock() {
        let state = state();
        for _ in 0..5 {
            state.core.suspicion.record_suspicious("198.51.100.1", SuspicionKind::SuspiciousUrl);
        }
        let app = setup_admin_router(state.clone());

        let res = app
            .clone()
            .oneshot(request("GET", "/admin/security/blocked", Some("admin-key")))
            .await
            .unwrap();
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let blocked: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(blocked[0]["identifier"], "198.51.100.1");

        let res = app
            .clone()
            .oneshot(request("DELETE", "/admin/security/blocked/198.51.100.1", Some("admin-key")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
        assert!(!state.core.suspicion.is_blocked("198.51.100.1"));

        let res = app
            .oneshot(request("DELETE", "/admin/security/blocked/198.51.100.1", Some("admin-key")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }
}
