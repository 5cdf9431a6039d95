//! Gate error types.
//!
//! `GateError` is transport-agnostic. The HTTP crate maps its variants to 429
//! and 403 responses. `ConfigError` only surfaces at startup.

use crate::rate_limit::RateDecision;
use crate::traffic::TrafficClass;

#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// The client exhausted the quota for this traffic class.
    #[error("rate limit exceeded for {class} traffic")]
    RateLimited {
        class: TrafficClass,
        decision: RateDecision,
    },

    /// A state-changing request came from an untrusted origin.
    #[error("request origin is not trusted")]
    Forbidden,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Startup configuration could not be used.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
