//! End-to-end behaviour of the gate's HTTP surface.

use std::net::SocketAddr;
use std::time::Duration;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use tower::ServiceExt;

use reagent_gate::http::{HttpServer, CSRF_TOKEN_PATH};
use reagent_gate::lifecycle::Shutdown;

mod common;

fn request(method: &str, uri: &str, client: &str) -> axum::http::request::Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("x-forwarded-for", client)
        .header(header::HOST, "gate.test")
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_csrf_endpoint_issues_token_with_security_headers() {
    let config = common::test_config();
    let (core, _clock) = common::manual_core(&config);
    let app = HttpServer::new(config, core.clone()).router();

    let res = app
        .oneshot(request("GET", CSRF_TOKEN_PATH, "192.0.2.10").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let headers = res.headers().clone();
    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["cache-control"], "no-store");
    assert!(headers["content-security-policy"]
        .to_str()
        .unwrap()
        .contains("default-src 'self'"));
    assert!(headers.contains_key("x-request-id"));

    let json: serde_json::Value = serde_json::from_str(&body_string(res).await).unwrap();
    let token = json["token"].as_str().unwrap();
    assert_eq!(token.len(), 43);
    assert_eq!(json["expires_in_secs"], 3600);
    assert!(core.csrf.validate(token));
}

#[tokio::test]
async fn test_api_post_requires_json() {
    let config = common::test_config();
    let (core, _clock) = common::manual_core(&config);
    let app = HttpServer::new(config, core).router();

    let res = app
        .oneshot(
            request("POST", "/api/login", "192.0.2.11")
                .header(header::CONTENT_TYPE, "text/plain")
                .body(Body::from("user=a"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_string(res).await, "Invalid content type");
}

#[tokio::test]
async fn test_api_rate_limit_rejects_51st_request() {
    let config = common::test_config();
    let (core, _clock) = common::manual_core(&config);
    let app = HttpServer::new(config, core.clone()).router();

    for _ in 0..50 {
        let res = app
            .clone()
            .oneshot(request("GET", CSRF_TOKEN_PATH, "192.0.2.12").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    let res = app
        .oneshot(request("GET", CSRF_TOKEN_PATH, "192.0.2.12").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(core.suspicion.count("192.0.2.12"), 1);
}

#[tokio::test]
async fn test_scraper_user_agent_rejected_and_eventually_blocked() {
    let config = common::test_config();
    let (core, _clock) = common::manual_core(&config);
    let app = HttpServer::new(config, core.clone()).router();

    for _ in 0..5 {
        let res = app
            .clone()
            .oneshot(
                request("GET", "/", "192.0.2.13")
                    .header(header::USER_AGENT, "Mozilla/5.0 (compatible; scraperbot)")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }
    assert!(core.suspicion.is_blocked("192.0.2.13"));

    // A clean request from the same client is still refused
    let res = app
        .oneshot(request("GET", CSRF_TOKEN_PATH, "192.0.2.13").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_string(res).await, "Access denied");
}

#[tokio::test]
async fn test_probing_url_rejected() {
    let config = common::test_config();
    let (core, _clock) = common::manual_core(&config);
    let app = HttpServer::new(config, core.clone()).router();

    let res = app
        .oneshot(request("GET", "/search/%27%20UNION%20SELECT%20password", "192.0.2.14").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(core.suspicion.count("192.0.2.14"), 1);
}

#[tokio::test]
async fn test_admin_path_without_referer_redirects() {
    let config = common::test_config();
    let (core, _clock) = common::manual_core(&config);
    let app = HttpServer::new(config, core).router();

    let res = app
        .oneshot(request("GET", "/admin/users", "192.0.2.15").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(res.headers()[header::LOCATION], "/");
}

#[tokio::test]
async fn test_forwards_admitted_requests_upstream() {
    let upstream_addr: SocketAddr = "127.0.0.1:28191".parse().unwrap();
    let gate_addr: SocketAddr = "127.0.0.1:28192".parse().unwrap();
    common::start_echo_upstream(upstream_addr).await;

    let mut config = common::test_config();
    config.upstream.address = upstream_addr.to_string();
    config.gate.trust_forwarded_for = false;
    let (core, _clock) = common::manual_core(&config);

    let shutdown = Shutdown::new();
    let listener = tokio::net::TcpListener::bind(gate_addr).await.unwrap();
    let server = HttpServer::new(config, core);
    let handle = tokio::spawn(server.run(listener, shutdown.subscribe()));
    tokio::time::sleep(Duration::from_millis(50)).await;

    let client = reqwest::Client::new();
    let res = client
        .get(format!("http://{}/products?page=2", gate_addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["x-frame-options"], "DENY");
    assert_eq!(res.text().await.unwrap(), "GET /products?page=2");

    let res = client
        .post(format!("http://{}/api/orders", gate_addr))
        .header("content-type", "application/json")
        .body(r#"{"id":1}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "POST /api/orders");

    shutdown.trigger();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_upstream_unreachable_is_bad_gateway() {
    let mut config = common::test_config();
    config.upstream.address = "127.0.0.1:28199".into();
    let (core, _clock) = common::manual_core(&config);
    let app = HttpServer::new(config, core).router();

    let res = app
        .oneshot(request("GET", "/", "192.0.2.16").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_json_api_posts_limited_per_client() {
    let mut config = common::test_config();
    config.upstream.address = "127.0.0.1:28198".into();
    let (core, _clock) = common::manual_core(&config);
    let app = HttpServer::new(config, core).router();

    let post = || {
        request("POST", "/api/tests", "192.0.2.17")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap()
    };

    for _ in 0..50 {
        let res = app.clone().oneshot(post()).await.unwrap();
        assert_ne!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    }
    let res = app.clone().oneshot(post()).await.unwrap();
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);

    // Another client has its own window
    let res = app
        .oneshot(
            request("POST", "/api/tests", "192.0.2.18")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_ne!(res.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_admin_path_with_same_origin_referer_passes_gate() {
    let mut config = common::test_config();
    config.upstream.address = "127.0.0.1:28197".into();
    let (core, _clock) = common::manual_core(&config);
    let app = HttpServer::new(config, core).router();

    let res = app
        .oneshot(
            request("GET", "/admin/users", "192.0.2.19")
                .header(header::REFERER, "https://gate.test/admin")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // Admitted: the unreachable upstream answers, not the gate
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_csrf_endpoint_unavailable_when_store_full() {
    let mut config = common::test_config();
    config.csrf.max_entries = 1;
    let (core, _clock) = common::manual_core(&config);
    let app = HttpServer::new(config, core).router();

    let res = app
        .clone()
        .oneshot(request("GET", CSRF_TOKEN_PATH, "192.0.2.20").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .oneshot(request("GET", CSRF_TOKEN_PATH, "192.0.2.20").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_admin_referer_checked_against_authority_without_host_header() {
    let mut config = common::test_config();
    config.upstream.address = "127.0.0.1:28196".into();
    let (core, _clock) = common::manual_core(&config);
    let app = HttpServer::new(config, core).router();

    // HTTP/2 requests carry the host in the URI authority only
    let res = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("https://gate.test/admin/users")
                .version(axum::http::Version::HTTP_2)
                .header("x-forwarded-for", "192.0.2.21")
                .header(header::REFERER, "https://gate.test/admin")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_encoded_api_prefix_is_rate_limited() {
    let mut config = common::test_config();
    config.rate_limit.api_limit = 1;
    let (core, _clock) = common::manual_core(&config);
    let app = HttpServer::new(config, core).router();

    let res = app
        .clone()
        .oneshot(request("GET", CSRF_TOKEN_PATH, "192.0.2.22").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .oneshot(request("GET", "/%61pi/orders", "192.0.2.22").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
}
