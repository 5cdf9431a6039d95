//! Per-request tracing IDs.

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use uuid::Uuid;

pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// A new UUID v4. Client-supplied IDs are never reused.
pub fn generate() -> String {
    Uuid::new_v4().to_string()
}

/// Sets `X-Request-ID` on `headers`, replacing any existing value.
pub fn stamp(headers: &mut HeaderMap, request_id: &str) {
    if let Ok(val) = HeaderValue::from_str(request_id) {
        headers.insert(X_REQUEST_ID.clone(), val);
    }
}
