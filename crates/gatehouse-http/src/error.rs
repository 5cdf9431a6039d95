//! HTTP error type and JSON error bodies.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use gatehouse_core::{GateError, RateDecision};
use serde::Serialize;

use crate::headers::apply_retry_after;

/// Errors surfaced to HTTP clients.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Rate limit exceeded.
    #[error("too many requests")]
    TooManyRequests(RateDecision),

    /// State-changing request from an untrusted origin.
    #[error("forbidden")]
    Forbidden,

    /// Malformed request (e.g. unreadable body).
    #[error("{0}")]
    BadRequest(String),

    /// Request body exceeds the forwarding limit.
    #[error("{0}")]
    PayloadTooLarge(String),

    /// Nothing serves this path.
    #[error("{0}")]
    NotFound(String),

    /// The upstream application could not be reached.
    #[error("upstream error: {0}")]
    BadGateway(String),
}

impl From<GateError> for ApiError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::RateLimited { decision, .. } => Self::TooManyRequests(decision),
            GateError::Forbidden => Self::Forbidden,
        }
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    /// Short reason phrase (e.g. "Too Many Requests", "Forbidden").
    pub error: &'static str,
    /// Human-readable explanation.
    pub message: String,
    /// Seconds until the client may retry (rate-limit responses only).
    #[serde(rename = "retryAfter", skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            ApiError::TooManyRequests(_) => (
                StatusCode::TOO_MANY_REQUESTS,
                "Too Many Requests",
                "Rate limit exceeded. Please try again later.".to_string(),
            ),
            ApiError::Forbidden => (
                StatusCode::FORBIDDEN,
                "Forbidden",
                "Request origin is not allowed.".to_string(),
            ),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "Bad Request", msg.clone()),
            ApiError::PayloadTooLarge(msg) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "Payload Too Large",
                msg.clone(),
            ),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "Not Found", msg.clone()),
            ApiError::BadGateway(msg) => {
                tracing::error!(%msg, "upstream request failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "Bad Gateway",
                    "The upstream application is unavailable.".to_string(),
                )
            }
        };

        let retry_after = match &self {
            ApiError::TooManyRequests(decision) => Some(decision.retry_after_secs()),
            _ => None,
        };

        let body = ErrorBody {
            error,
            message,
            retry_after,
        };
        let mut response = (status, axum::Json(body)).into_response();

        if let ApiError::TooManyRequests(decision) = &self {
            apply_retry_after(response.headers_mut(), decision);
        }

        response
    }
}
