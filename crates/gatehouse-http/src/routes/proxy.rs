//! Fallback handler: forwards admitted requests to the upstream application.

use axum::body::{Body, Bytes, to_bytes};
use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::http::header;
use axum::response::Response;
use http_body_util::LengthLimitError;

use crate::error::ApiError;
use crate::state::AppState;

/// Largest request body forwarded upstream.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// The application behind the gate.
#[derive(Clone)]
pub struct Upstream {
    client: reqwest::Client,
    base: String,
}

impl Upstream {
    /// `base` is an absolute URL such as `http://127.0.0.1:3000`.
    pub fn new(base: &str) -> Result<Self, gatehouse_core::ConfigError> {
        let parsed = reqwest::Url::parse(base).map_err(|e| {
            gatehouse_core::ConfigError::Invalid(format!("upstream url {base:?}: {e}"))
        })?;
        if parsed.cannot_be_a_base() {
            return Err(gatehouse_core::ConfigError::Invalid(format!(
                "upstream url {base:?} cannot be a base"
            )));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            base: base.trim_end_matches('/').to_string(),
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Sends `req` upstream and relays the response.
    pub async fn forward(&self, req: Request) -> Result<Response, ApiError> {
        let (parts, body) = req.into_parts();
        let path_and_query = parts.uri.path_and_query().map_or("/", |pq| pq.as_str());
        let url = format!("{}{}", self.base, path_and_query);

        let body = read_body(body, MAX_BODY_BYTES).await?;

        let mut headers = parts.headers;
        strip_hop_by_hop(&mut headers);
        headers.remove(header::HOST);

        let upstream = self
            .client
            .request(parts.method, &url)
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(|e| ApiError::BadGateway(e.to_string()))?;

        let status = upstream.status();
        let mut response_headers = upstream.headers().clone();
        strip_hop_by_hop(&mut response_headers);

        let bytes = upstream
            .bytes()
            .await
            .map_err(|e| ApiError::BadGateway(e.to_string()))?;

        let mut response = Response::new(Body::from(bytes));
        *response.status_mut() = status;
        *response.headers_mut() = response_headers;
        Ok(response)
    }
}

/// Buffers `body`, failing with 413 past `limit` bytes.
async fn read_body(body: Body, limit: usize) -> Result<Bytes, ApiError> {
    to_bytes(body, limit).await.map_err(|e| {
        if exceeded_limit(&e) {
            ApiError::PayloadTooLarge(format!("request body exceeds {limit} bytes"))
        } else {
            ApiError::BadRequest(format!("failed to read request body: {e}"))
        }
    })
}

fn exceeded_limit(err: &axum::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

/// Forwards to the upstream, or 404 when none is configured.
pub async fn fallback(State(state): State<AppState>, req: Request) -> Result<Response, ApiError> {
    match state.upstream() {
        Some(upstream) => upstream.forward(req).await,
        None => Err(ApiError::NotFound(format!(
            "no route for {}",
            req.uri().path()
        ))),
    }
}
