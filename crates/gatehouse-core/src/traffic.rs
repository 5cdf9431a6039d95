//! Traffic classes and their per-class rate limits.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

/// Coarse category a request path falls into. Each class has its own quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrafficClass {
    Health,
    Webhook,
    Auth,
    Public,
    Api,
}

/// Every class, in a stable order (used for metrics rendering).
pub const ALL_CLASSES: [TrafficClass; 5] = [
    TrafficClass::Health,
    TrafficClass::Webhook,
    TrafficClass::Auth,
    TrafficClass::Public,
    TrafficClass::Api,
];

impl TrafficClass {
    pub fn label(self) -> &'static str {
        match self {
            Self::Health => "health",
            Self::Webhook => "webhook",
            Self::Auth => "auth",
            Self::Public => "public",
            Self::Api => "api",
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::Health => 0,
            Self::Webhook => 1,
            Self::Auth => 2,
            Self::Public => 3,
            Self::Api => 4,
        }
    }
}

impl fmt::Display for TrafficClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Quota for one traffic class: `limit` requests per `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    pub limit: u64,
    pub window: Duration,
}

impl Rule {
    pub const fn new(limit: u64, window: Duration) -> Self {
        Self { limit, window }
    }

    /// Convenience constructor taking the window in milliseconds.
    pub const fn per_millis(limit: u64, window_ms: u64) -> Self {
        Self::new(limit, Duration::from_millis(window_ms))
    }
}

/// Per-class quotas. Indexed by [`TrafficClass`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    rules: [Rule; 5],
}

impl Default for Limits {
    fn default() -> Self {
        const MINUTE: u64 = 60_000;
        Self {
            rules: [
                Rule::per_millis(120, MINUTE),
                Rule::per_millis(500, MINUTE),
                Rule::per_millis(5, MINUTE),
                Rule::per_millis(30, MINUTE),
                Rule::per_millis(100, MINUTE),
            ],
        }
    }
}

impl Limits {
    pub fn rule(&self, class: TrafficClass) -> Rule {
        self.rules[class.index()]
    }

    /// Returns a copy with the quota for `class` replaced.
    #[must_use]
    pub fn with(mut self, class: TrafficClass, rule: Rule) -> Self {
        self.rules[class.index()] = rule;
        self
    }
}
