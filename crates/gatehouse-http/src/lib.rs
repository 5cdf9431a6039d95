//! Gatehouse HTTP — axum transport for the request gate.
//!
//! Provides:
//! - the gate middleware (rate limiting, CSRF origin checks, request IDs)
//! - gateway health and Prometheus metrics endpoints
//! - a fallback that forwards admitted traffic upstream (`proxy` feature)

pub mod error;
pub mod headers;
pub mod middleware;
pub mod routes;
pub mod state;

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

pub use error::ApiError;
pub use state::AppState;

/// Builds the gateway router.
///
/// Every route, including the fallback, sits behind the gate.
pub fn router(state: AppState) -> Router {
    let app = Router::new()
        .route("/healthz", get(routes::system::health))
        .route("/metrics", get(routes::system::metrics_endpoint));

    #[cfg(feature = "proxy")]
    let app = app.fallback(routes::proxy::fallback);
    #[cfg(not(feature = "proxy"))]
    let app = app.fallback(routes::not_found);

    app.layer(axum::middleware::from_fn_with_state(
        state.clone(),
        middleware::gate::gate_middleware,
    ))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

/// Serve the router on `listener` until `shutdown` resolves.
pub async fn serve(
    listener: tokio::net::TcpListener,
    app: Router,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use gatehouse_core::{Limits, Rule, TrafficClass};
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;

    fn app(limits: Limits) -> Router {
        router(AppState::in_memory(
            limits,
            vec!["https://app.example.com".to_string()],
        ))
    }

    fn request(method: &str, path: &str) -> axum::http::request::Builder {
        Request::builder()
            .method(method)
            .uri(path)
            .header("x-forwarded-for", "203.0.113.5")
    }

    async fn json(resp: axum::response::Response) -> Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn admitted_response_carries_gate_headers() {
        let resp = app(Limits::default())
            .oneshot(request("GET", "/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let headers = resp.headers();
        assert_eq!(headers["x-ratelimit-limit"], "120");
        assert_eq!(headers["x-ratelimit-remaining"], "119");
        assert!(headers.contains_key("x-ratelimit-reset"));
        assert_eq!(headers["x-request-id"].to_str().unwrap().len(), 36);

        let body = json(resp).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["tracked_clients"], 1);
    }

    #[tokio::test]
    async fn limited_request_gets_429_body_and_headers() {
        let app = app(Limits::default().with(TrafficClass::Api, Rule::new(1, Duration::from_secs(30))));

        let first = app
            .clone()
            .oneshot(request("GET", "/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let resp = app
            .oneshot(request("GET", "/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(resp.headers()["x-ratelimit-limit"], "1");
        assert_eq!(resp.headers()["x-ratelimit-remaining"], "0");
        let retry: u64 = resp.headers()["retry-after"].to_str().unwrap().parse().unwrap();
        assert!((1..=30).contains(&retry));
        assert!(!resp.headers().contains_key("x-request-id"));

        let body = json(resp).await;
        assert_eq!(body["error"], "Too Many Requests");
        assert_eq!(body["retryAfter"], retry);
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn untrusted_mutation_gets_403() {
        let resp = app(Limits::default())
            .oneshot(
                request("POST", "/api/widgets")
                    .header("origin", "https://evil.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let body = json(resp).await;
        assert_eq!(body["error"], "Forbidden");
        assert!(body.get("retryAfter").is_none());
    }

    #[tokio::test]
    async fn trusted_mutation_reaches_the_fallback() {
        let resp = app(Limits::default())
            .oneshot(
                request("POST", "/api/widgets")
                    .header("origin", "https://app.example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        // No upstream configured: the gate admits it and the fallback 404s.
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(resp.headers()["x-ratelimit-remaining"], "99");
        assert!(resp.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn static_asset_skips_gate() {
        let state = AppState::in_memory(Limits::default(), Vec::new());
        let resp = router(state.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/logo.svg")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(!resp.headers().contains_key("x-ratelimit-limit"));
        assert!(!resp.headers().contains_key("x-request-id"));
        assert_eq!(state.gate().limiter().tracked(), 0);
        assert_eq!(state.gate().metrics().static_passthrough(), 1);
    }
}
