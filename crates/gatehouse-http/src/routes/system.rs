//! Gateway health and metrics endpoints.

use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    /// Always "ok" while the process is serving.
    pub status: &'static str,
    /// Gateway version.
    pub version: &'static str,
    /// Seconds since startup.
    pub uptime_seconds: u64,
    /// Rate-limit counters currently held.
    pub tracked_clients: usize,
}

/// Gateway liveness.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.uptime_secs(),
        tracked_clients: state.gate().limiter().tracked(),
    })
}

/// Prometheus-compatible metrics endpoint.
pub async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let gate = state.gate();
    let body = gate
        .metrics()
        .render(gate.limiter().tracked(), state.uptime_secs());

    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        body,
    )
}
