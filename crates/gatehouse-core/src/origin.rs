//! Origin checks for state-changing requests (CSRF guard).
//!
//! Browsers attach `Origin` and/or `Referer` to same-origin mutations, so a
//! mutating request without either is only accepted when it carries
//! programmatic credentials.

use url::Url;

use crate::error::ConfigError;

/// Loopback port used by the local development server.
pub const DEFAULT_DEV_PORT: u16 = 3000;

/// Paths that authenticate with signatures or shared secrets instead of
/// origin: payment webhooks and scheduled jobs.
const EXEMPT_PREFIXES: [&str; 4] = [
    "/api/webhooks",
    "/api/stripe/",
    "/api/billing/webhook",
    "/api/cron",
];

/// Headers the origin check looks at. All optional.
#[derive(Debug, Clone, Copy, Default)]
pub struct OriginHeaders<'a> {
    pub origin: Option<&'a str>,
    pub referer: Option<&'a str>,
    pub authorization: Option<&'a str>,
    pub api_key: Option<&'a str>,
}

/// `GET`, `HEAD` and `OPTIONS` never change state.
pub fn is_safe_method(method: &str) -> bool {
    matches!(method, "GET" | "HEAD" | "OPTIONS")
}

/// Static set of trusted origins, fixed at startup.
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    allowed: Vec<String>,
}

impl OriginPolicy {
    /// Trailing slashes are stripped from each entry.
    pub fn new(allowed: impl IntoIterator<Item = String>) -> Self {
        let mut list: Vec<String> = Vec::new();
        for origin in allowed {
            let trimmed = origin.trim_end_matches('/').to_string();
            if !trimmed.is_empty() && !list.contains(&trimmed) {
                list.push(trimmed);
            }
        }
        Self { allowed: list }
    }

    /// Trusts the application URL, its bare origin, and loopback on `dev_port`.
    pub fn from_app_url(app_url: &str, dev_port: u16) -> Result<Self, ConfigError> {
        let parsed = Url::parse(app_url)
            .map_err(|e| ConfigError::Invalid(format!("app url {app_url:?}: {e}")))?;
        let origin = parsed.origin();
        if !origin.is_tuple() {
            return Err(ConfigError::Invalid(format!(
                "app url {app_url:?} has no usable origin"
            )));
        }

        Ok(Self::new([
            app_url.to_string(),
            origin.ascii_serialization(),
            format!("http://localhost:{dev_port}"),
            format!("http://127.0.0.1:{dev_port}"),
        ]))
    }

    pub fn allowed(&self) -> &[String] {
        &self.allowed
    }

    /// Whether a request may proceed past the CSRF guard.
    pub fn is_trusted(&self, method: &str, path: &str, headers: &OriginHeaders<'_>) -> bool {
        if is_safe_method(method) {
            return true;
        }

        if is_exempt_path(path) {
            return true;
        }

        if headers.api_key.is_some() {
            return true;
        }

        if headers.origin.is_none() && headers.referer.is_none() {
            return headers.authorization.is_some();
        }

        headers.origin.is_some_and(|o| self.matches(o))
            || headers.referer.is_some_and(|r| self.matches(r))
    }

    fn matches(&self, value: &str) -> bool {
        self.allowed.iter().any(|a| value.starts_with(a.as_str()))
    }
}

fn is_exempt_path(path: &str) -> bool {
    EXEMPT_PREFIXES.iter().any(|p| path.starts_with(p))
}
