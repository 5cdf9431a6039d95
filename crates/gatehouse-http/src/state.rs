//! Shared HTTP application state.

use std::sync::Arc;
use std::time::Instant;

use gatehouse_core::{Classifier, Gate, Limits, OriginPolicy, RateLimiter, StaticAssets};

#[cfg(feature = "proxy")]
use crate::routes::proxy::Upstream;

/// Shared application state, cloneable across handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppInner>,
}

struct AppInner {
    gate: Gate,
    start_time: Instant,
    #[cfg(feature = "proxy")]
    upstream: Option<Upstream>,
}

impl AppState {
    /// State with no upstream: requests that pass the gate and match no
    /// gateway route get 404.
    pub fn new(gate: Gate) -> Self {
        Self {
            inner: Arc::new(AppInner {
                gate,
                start_time: Instant::now(),
                #[cfg(feature = "proxy")]
                upstream: None,
            }),
        }
    }

    /// State that forwards admitted requests to `upstream`.
    #[cfg(feature = "proxy")]
    pub fn with_upstream(gate: Gate, upstream: Upstream) -> Self {
        Self {
            inner: Arc::new(AppInner {
                gate,
                start_time: Instant::now(),
                upstream: Some(upstream),
            }),
        }
    }

    /// In-memory state with the default classifier and asset rules (for tests
    /// and ephemeral use).
    pub fn in_memory(limits: Limits, allowed_origins: Vec<String>) -> Self {
        Self::new(Gate::new(
            Classifier::default(),
            RateLimiter::in_memory(limits),
            OriginPolicy::new(allowed_origins),
            StaticAssets::default(),
        ))
    }

    /// Returns the request gate.
    pub fn gate(&self) -> &Gate {
        &self.inner.gate
    }

    /// Returns the server uptime in seconds.
    pub fn uptime_secs(&self) -> u64 {
        self.inner.start_time.elapsed().as_secs()
    }

    /// Returns the upstream application, if one is configured.
    #[cfg(feature = "proxy")]
    pub fn upstream(&self) -> Option<&Upstream> {
        self.inner.upstream.as_ref()
    }
}
