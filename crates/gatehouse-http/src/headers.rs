//! Rate-limit response headers.

use std::time::Duration;

use axum::http::header::{AsHeaderName, HeaderMap, HeaderName, HeaderValue, RETRY_AFTER};
use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use gatehouse_core::RateDecision;

pub static X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub static X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub static X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Reads a header as UTF-8, ignoring values that are not.
pub fn header_str<K: AsHeaderName>(headers: &HeaderMap, key: K) -> Option<&str> {
    headers.get(key).and_then(|v| v.to_str().ok())
}

/// Wall-clock instant `reset_in` from now, ISO-8601 UTC with milliseconds.
/// Saturates at the latest representable instant.
pub fn reset_timestamp(reset_in: Duration) -> String {
    TimeDelta::from_std(reset_in)
        .ok()
        .and_then(|delta| Utc::now().checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Sets `X-RateLimit-{Limit,Remaining,Reset}` from `decision`.
pub fn apply_rate_limit(headers: &mut HeaderMap, decision: &RateDecision) {
    headers.insert(X_RATELIMIT_LIMIT.clone(), HeaderValue::from(decision.limit));
    headers.insert(
        X_RATELIMIT_REMAINING.clone(),
        HeaderValue::from(decision.remaining),
    );
    if let Ok(reset) = HeaderValue::from_str(&reset_timestamp(decision.reset_in)) {
        headers.insert(X_RATELIMIT_RESET.clone(), reset);
    }
}

/// Headers for a 429: the rate-limit set plus `Retry-After` in seconds.
pub fn apply_retry_after(headers: &mut HeaderMap, decision: &RateDecision) {
    apply_rate_limit(headers, decision);
    headers.insert(X_RATELIMIT_REMAINING.clone(), HeaderValue::from_static("0"));
    headers.insert(RETRY_AFTER, HeaderValue::from(decision.retry_after_secs()));
}
