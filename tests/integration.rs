//! Integration tests for the Gatehouse gateway.
//!
//! Each test boots a stub upstream and a gateway in front of it on ephemeral
//! ports, then drives the gateway with reqwest.

use std::net::SocketAddr;

use axum::Json;
use axum::extract::Request;
use axum::http::HeaderMap;
use clap::Parser;
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use tokio::net::TcpListener;

use gatehouse::AppState;
use gatehouse::config::Config;

/// Echoes what the upstream received so tests can inspect forwarding.
async fn echo(headers: HeaderMap, req: Request) -> Json<Value> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(String::from);
    let method = req.method().to_string();
    let uri = req.uri().to_string();
    let body = axum::body::to_bytes(req.into_body(), usize::MAX)
        .await
        .unwrap_or_default();

    Json(json!({
        "method": method,
        "uri": uri,
        "request_id": header("x-request-id"),
        "origin": header("origin"),
        "body": String::from_utf8_lossy(&body),
    }))
}

async fn spawn_upstream() -> String {
    let app = axum::Router::new().fallback(echo);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Boots a gateway with `args` on an OS-assigned port.
/// Returns the base URL and the shared state for inspection.
async fn spawn_gateway(args: &[&str]) -> (String, AppState) {
    let config = Config::try_parse_from(
        ["gatehouse", "--app-url", "https://app.example.com"]
            .into_iter()
            .chain(args.iter().copied()),
    )
    .unwrap();
    let state = gatehouse::app_state(&config).unwrap();
    let app = gatehouse::router(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), state)
}

async fn spawn_proxied() -> (String, AppState) {
    let upstream = spawn_upstream().await;
    spawn_gateway(&["--upstream", upstream.as_str()]).await
}

// ---------------------------------------------------------------------------
// Rate limiting
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sixth_auth_request_within_a_minute_is_rejected() {
    let (base, _) = spawn_proxied().await;
    let client = Client::new();

    for i in 0..5 {
        let resp = client
            .get(format!("{base}/api/auth/session"))
            .header("x-forwarded-for", "198.51.100.20")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK, "request {i}");
        let remaining = resp.headers()["x-ratelimit-remaining"].to_str().unwrap();
        assert_eq!(remaining, (4 - i).to_string());
    }

    let resp = client
        .get(format!("{base}/api/auth/session"))
        .header("x-forwarded-for", "198.51.100.20")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(resp.headers()["x-ratelimit-limit"], "5");
    assert_eq!(resp.headers()["x-ratelimit-remaining"], "0");
    assert!(resp.headers().contains_key("x-ratelimit-reset"));
    let retry_header: u64 = resp.headers()["retry-after"]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Too Many Requests");
    let retry_after = body["retryAfter"].as_u64().unwrap();
    assert!((1..=60).contains(&retry_after));
    assert_eq!(retry_after, retry_header);
}

#[tokio::test]
async fn clients_are_limited_independently() {
    let (base, _) = spawn_gateway(&["--auth-limit", "1"]).await;
    let client = Client::new();

    let send = |ip: &'static str| {
        client
            .get(format!("{base}/auth/login"))
            .header("x-real-ip", ip)
            .send()
    };

    assert_ne!(send("10.0.0.1").await.unwrap().status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(send("10.0.0.1").await.unwrap().status(), StatusCode::TOO_MANY_REQUESTS);
    assert_ne!(send("10.0.0.2").await.unwrap().status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn anonymous_clients_share_one_counter() {
    let (base, state) = spawn_gateway(&["--api-limit", "2"]).await;
    let client = Client::new();

    for _ in 0..2 {
        let resp = client.get(format!("{base}/api/me")).send().await.unwrap();
        assert_ne!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    }
    let resp = client.get(format!("{base}/api/me")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(state.gate().limiter().tracked(), 1);
}

// ---------------------------------------------------------------------------
// CSRF origin checks
// ---------------------------------------------------------------------------

#[tokio::test]
async fn webhook_post_without_origin_is_forwarded() {
    let (base, _) = spawn_proxied().await;

    let resp = Client::new()
        .post(format!("{base}/api/billing/webhook/route"))
        .body("{\"type\":\"invoice.paid\"}")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["method"], "POST");
    assert_eq!(body["body"], "{\"type\":\"invoice.paid\"}");
}

#[tokio::test]
async fn foreign_origin_mutation_is_forbidden() {
    let (base, state) = spawn_proxied().await;

    let resp = Client::new()
        .post(format!("{base}/api/organizations/7/members"))
        .header("origin", "https://evil.com")
        .json(&json!({"email": "mallory@evil.com"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Forbidden");
    assert!(body["message"].is_string());
    assert_eq!(state.gate().metrics().forbidden(), 1);
}

#[tokio::test]
async fn headerless_mutation_is_forbidden_but_bearer_is_not() {
    let (base, _) = spawn_proxied().await;
    let client = Client::new();

    let resp = client
        .delete(format!("{base}/api/courses/rust-101/enroll"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = client
        .delete(format!("{base}/api/courses/rust-101/enroll"))
        .header("authorization", "Bearer service-token")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn trusted_origin_and_api_key_are_forwarded() {
    let (base, _) = spawn_proxied().await;
    let client = Client::new();

    let resp = client
        .post(format!("{base}/api/testimonials"))
        .header("origin", "https://app.example.com")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["origin"], "https://app.example.com");

    let resp = client
        .put(format!("{base}/api/testimonials/3"))
        .header("x-api-key", "k-123")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Static assets, request IDs, forwarding
// ---------------------------------------------------------------------------

#[tokio::test]
async fn static_asset_bypasses_the_gate() {
    let (base, state) = spawn_proxied().await;

    let resp = Client::new()
        .post(format!("{base}/logo.svg"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(!resp.headers().contains_key("x-ratelimit-limit"));
    assert!(!resp.headers().contains_key("x-request-id"));

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["request_id"], Value::Null);
    assert_eq!(state.gate().limiter().tracked(), 0);
}

#[tokio::test]
async fn fresh_request_id_reaches_upstream_and_client() {
    let (base, _) = spawn_proxied().await;

    let resp = Client::new()
        .get(format!("{base}/dashboard?tab=billing"))
        .header("x-request-id", "client-chosen")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let id = resp.headers()["x-request-id"].to_str().unwrap().to_string();
    assert_eq!(id.len(), 36);
    assert_ne!(id, "client-chosen");

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["request_id"], id.as_str());
    assert_eq!(body["uri"], "/dashboard?tab=billing");
}

#[tokio::test]
async fn unreachable_upstream_returns_502() {
    // Bind and drop to get a port nothing listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let (base, _) = spawn_gateway(&["--upstream", dead.as_str()]).await;
    let resp = Client::new()
        .get(format!("{base}/dashboard"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Bad Gateway");
}

// ---------------------------------------------------------------------------
// Gateway endpoints
// ---------------------------------------------------------------------------

#[tokio::test]
async fn healthz_and_metrics() {
    let (base, _) = spawn_gateway(&["--auth-limit", "1"]).await;
    let client = Client::new();

    let resp = client.get(format!("{base}/healthz")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["x-ratelimit-limit"], "120");
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));

    client.get(format!("{base}/api/sso/start")).send().await.unwrap();
    client.get(format!("{base}/api/sso/start")).send().await.unwrap();

    let text = client
        .get(format!("{base}/metrics"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(text.contains("gatehouse_requests_limited_total{class=\"auth\"} 1"));
    assert!(text.contains("gatehouse_requests_allowed_total{class=\"health\"} 1"));
}
