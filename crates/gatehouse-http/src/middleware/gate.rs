//! Gate middleware: rate limiting and CSRF origin checks on every request.

use std::time::Instant;

use axum::extract::{Request, State};
use axum::http::header::{AUTHORIZATION, ORIGIN, REFERER};
use axum::middleware::Next;
use axum::response::Response;
use gatehouse_core::{GateRequest, OriginHeaders, Verdict};
use tracing::Instrument;

use super::request_id;
use crate::error::ApiError;
use crate::headers::{apply_rate_limit, header_str};
use crate::state::AppState;

/// Runs the gate. Static assets pass straight through; limited requests get
/// 429, untrusted mutations under `/api` get 403; everything else is
/// forwarded with rate-limit headers and a fresh `X-Request-ID`.
pub async fn gate_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let verdict = {
        let headers = req.headers();
        let gate_req = GateRequest {
            method: req.method().as_str(),
            path: req.uri().path(),
            forwarded_for: header_str(headers, "x-forwarded-for"),
            real_ip: header_str(headers, "x-real-ip"),
            origin: OriginHeaders {
                origin: header_str(headers, ORIGIN),
                referer: header_str(headers, REFERER),
                authorization: header_str(headers, AUTHORIZATION),
                api_key: header_str(headers, "x-api-key"),
            },
        };
        state.gate().inspect(&gate_req, Instant::now())
    };

    let admission = match verdict {
        Verdict::Bypass => return Ok(next.run(req).await),
        Verdict::Reject(err) => return Err(err.into()),
        Verdict::Admit(admission) => admission,
    };

    let request_id = request_id::generate();
    request_id::stamp(req.headers_mut(), &request_id);

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        client = %admission.client,
        class = %admission.class,
    );
    let mut response = next.run(req).instrument(span).await;

    let headers = response.headers_mut();
    apply_rate_limit(headers, &admission.decision);
    request_id::stamp(headers, &request_id);

    Ok(response)
}
