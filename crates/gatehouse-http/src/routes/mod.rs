//! Gateway routes: health, metrics and the fallback for admitted traffic.

#[cfg(feature = "proxy")]
pub mod proxy;
pub mod system;

use axum::extract::Request;

use crate::error::ApiError;

/// Fallback when the proxy is compiled out.
pub async fn not_found(req: Request) -> ApiError {
    ApiError::NotFound(format!("no route for {}", req.uri().path()))
}
