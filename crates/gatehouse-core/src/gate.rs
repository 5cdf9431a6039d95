//! The request gate: static bypass, rate limit, then origin check.

use std::sync::Arc;
use std::time::Instant;

use crate::assets::StaticAssets;
use crate::classify::{Classifier, is_api_path};
use crate::error::GateError;
use crate::identity::client_identity;
use crate::metrics::GateMetrics;
use crate::origin::{OriginHeaders, OriginPolicy};
use crate::rate_limit::{RateDecision, RateLimiter};
use crate::traffic::TrafficClass;

/// The parts of a request the gate inspects.
#[derive(Debug, Clone, Copy, Default)]
pub struct GateRequest<'a> {
    pub method: &'a str,
    pub path: &'a str,
    pub forwarded_for: Option<&'a str>,
    pub real_ip: Option<&'a str>,
    pub origin: OriginHeaders<'a>,
}

/// A request that passed the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    pub client: String,
    pub class: TrafficClass,
    pub decision: RateDecision,
}

/// What to do with a request.
#[derive(Debug)]
pub enum Verdict {
    /// Static asset: forward untouched.
    Bypass,
    /// Forward with rate-limit headers attached.
    Admit(Admission),
    /// Answer with the rejection and stop.
    Reject(GateError),
}

/// Composes classifier, limiter, origin policy and asset matcher.
#[derive(Clone)]
pub struct Gate {
    inner: Arc<GateInner>,
}

struct GateInner {
    classifier: Classifier,
    limiter: RateLimiter,
    origins: OriginPolicy,
    assets: StaticAssets,
    metrics: GateMetrics,
}

impl Gate {
    pub fn new(
        classifier: Classifier,
        limiter: RateLimiter,
        origins: OriginPolicy,
        assets: StaticAssets,
    ) -> Self {
        Self {
            inner: Arc::new(GateInner {
                classifier,
                limiter,
                origins,
                assets,
                metrics: GateMetrics::new(),
            }),
        }
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.inner.limiter
    }

    pub fn metrics(&self) -> &GateMetrics {
        &self.inner.metrics
    }

    pub fn origins(&self) -> &OriginPolicy {
        &self.inner.origins
    }

    /// Runs every check for `req` at `now`.
    pub fn inspect(&self, req: &GateRequest<'_>, now: Instant) -> Verdict {
        let inner = &self.inner;

        if inner.assets.is_static(req.path) {
            inner.metrics.record_static();
            return Verdict::Bypass;
        }

        let client = client_identity(req.forwarded_for, req.real_ip);
        let class = inner.classifier.classify(req.path);
        let decision = inner.limiter.evaluate(&client, class, now);

        if decision.limited {
            inner.metrics.record_limited(class);
            tracing::warn!(
                client = %client,
                class = %class,
                path = req.path,
                retry_after = decision.retry_after_secs(),
                "rate limit exceeded"
            );
            return Verdict::Reject(GateError::RateLimited { class, decision });
        }

        if is_api_path(req.path) && !inner.origins.is_trusted(req.method, req.path, &req.origin) {
            inner.metrics.record_forbidden();
            tracing::warn!(
                client = %client,
                method = req.method,
                path = req.path,
                origin = req.origin.origin,
                referer = req.origin.referer,
                "rejected request from untrusted origin"
            );
            return Verdict::Reject(GateError::Forbidden);
        }

        inner.metrics.record_allowed(class);
        tracing::debug!(client = %client, class = %class, remaining = decision.remaining, "admitted");

        Verdict::Admit(Admission {
            client,
            class,
            decision,
        })
    }
}
