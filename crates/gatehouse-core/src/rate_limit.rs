//! Per-client, per-class rate limiting with a fixed-window counter.
//!
//! Transport-agnostic core. The HTTP middleware extracts the client identity,
//! classifies the path and calls [`RateLimiter::evaluate`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::store::{CounterStore, MemoryStore, RateKey, RateRecord};
use crate::traffic::{Limits, Rule, TrafficClass};

/// Store size above which expired records are swept before evaluating.
pub const DEFAULT_SWEEP_THRESHOLD: usize = 10_000;

/// Outcome of one rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub limited: bool,
    pub limit: u64,
    pub remaining: u64,
    /// Time until the current window ends.
    pub reset_in: Duration,
}

impl RateDecision {
    /// Whole seconds a rejected client should wait, rounded up, at least 1.
    pub fn retry_after_secs(&self) -> u64 {
        let millis = self.reset_in.as_millis() as u64;
        millis.div_ceil(1000).max(1)
    }
}

/// Fixed-window rate limiter over an injected [`CounterStore`].
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<RateLimiterInner>,
}

struct RateLimiterInner {
    limits: Limits,
    sweep_threshold: usize,
    store: Arc<dyn CounterStore>,
}

impl RateLimiter {
    pub fn new(limits: Limits, sweep_threshold: usize, store: Arc<dyn CounterStore>) -> Self {
        Self {
            inner: Arc::new(RateLimiterInner {
                limits,
                sweep_threshold,
                store,
            }),
        }
    }

    /// Limiter with a fresh in-memory store and the default sweep threshold.
    pub fn in_memory(limits: Limits) -> Self {
        Self::new(limits, DEFAULT_SWEEP_THRESHOLD, Arc::new(MemoryStore::new()))
    }

    pub fn limits(&self) -> &Limits {
        &self.inner.limits
    }

    pub fn rule(&self, class: TrafficClass) -> Rule {
        self.inner.limits.rule(class)
    }

    /// Number of counters currently held (live or not yet swept).
    pub fn tracked(&self) -> usize {
        self.inner.store.len()
    }

    /// Counts a request from `client` in `class` at `now` and decides whether
    /// it may proceed. Denied requests do not consume quota.
    pub fn evaluate(&self, client: &str, class: TrafficClass, now: Instant) -> RateDecision {
        let store = &self.inner.store;
        if store.len() > self.inner.sweep_threshold {
            let removed = store.sweep_expired(now);
            tracing::debug!(removed, "swept expired rate counters");
        }

        let rule = self.rule(class);
        let mut decision = RateDecision {
            limited: false,
            limit: rule.limit,
            remaining: rule.limit.saturating_sub(1),
            reset_in: rule.window,
        };

        store.update(RateKey::new(client, class), &mut |slot| {
            decision = step(slot, rule, now);
        });

        decision
    }

    /// Removes expired counters. Returns how many were dropped.
    pub fn cleanup(&self, now: Instant) -> usize {
        self.inner.store.sweep_expired(now)
    }
}

/// Applies one request to the slot for a key.
fn step(slot: &mut Option<RateRecord>, rule: Rule, now: Instant) -> RateDecision {
    match slot {
        Some(record) if !record.is_expired(now) => {
            let reset_in = record.reset_at.saturating_duration_since(now);
            if record.count >= rule.limit {
                RateDecision {
                    limited: true,
                    limit: rule.limit,
                    remaining: 0,
                    reset_in,
                }
            } else {
                record.count += 1;
                RateDecision {
                    limited: false,
                    limit: rule.limit,
                    remaining: rule.limit - record.count,
                    reset_in,
                }
            }
        }
        _ => {
            // No record, or the window has passed: start over.
            *slot = Some(RateRecord {
                count: 1,
                reset_at: now + rule.window,
            });
            RateDecision {
                limited: false,
                limit: rule.limit,
                remaining: rule.limit.saturating_sub(1),
                reset_in: rule.window,
            }
        }
    }
}
