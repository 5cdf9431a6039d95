//! Lightweight Prometheus-compatible gate metrics using atomic counters.

use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::traffic::{ALL_CLASSES, TrafficClass};

/// Per-class decision counters.
struct ClassMetrics {
    allowed_total: AtomicU64,
    limited_total: AtomicU64,
}

impl ClassMetrics {
    const fn new() -> Self {
        Self {
            allowed_total: AtomicU64::new(0),
            limited_total: AtomicU64::new(0),
        }
    }
}

/// Gate-wide counters.
pub struct GateMetrics {
    health: ClassMetrics,
    webhook: ClassMetrics,
    auth: ClassMetrics,
    public: ClassMetrics,
    api: ClassMetrics,
    forbidden_total: AtomicU64,
    static_total: AtomicU64,
}

impl Default for GateMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl GateMetrics {
    pub const fn new() -> Self {
        Self {
            health: ClassMetrics::new(),
            webhook: ClassMetrics::new(),
            auth: ClassMetrics::new(),
            public: ClassMetrics::new(),
            api: ClassMetrics::new(),
            forbidden_total: AtomicU64::new(0),
            static_total: AtomicU64::new(0),
        }
    }

    fn class(&self, class: TrafficClass) -> &ClassMetrics {
        match class {
            TrafficClass::Health => &self.health,
            TrafficClass::Webhook => &self.webhook,
            TrafficClass::Auth => &self.auth,
            TrafficClass::Public => &self.public,
            TrafficClass::Api => &self.api,
        }
    }

    pub fn record_allowed(&self, class: TrafficClass) {
        self.class(class).allowed_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_limited(&self, class: TrafficClass) {
        self.class(class).limited_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_forbidden(&self) {
        self.forbidden_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_static(&self) {
        self.static_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn allowed(&self, class: TrafficClass) -> u64 {
        self.class(class).allowed_total.load(Ordering::Relaxed)
    }

    pub fn limited(&self, class: TrafficClass) -> u64 {
        self.class(class).limited_total.load(Ordering::Relaxed)
    }

    pub fn forbidden(&self) -> u64 {
        self.forbidden_total.load(Ordering::Relaxed)
    }

    pub fn static_passthrough(&self) -> u64 {
        self.static_total.load(Ordering::Relaxed)
    }

    /// Render all metrics in Prometheus text exposition format.
    pub fn render(&self, tracked_counters: usize, uptime_seconds: u64) -> String {
        let mut out = String::with_capacity(1024);

        gauge(
            &mut out,
            "gatehouse_rate_counters",
            "Rate-limit counters currently held in memory",
            tracked_counters,
        );
        gauge(
            &mut out,
            "gatehouse_uptime_seconds",
            "Gateway uptime in seconds",
            uptime_seconds,
        );

        let _ = writeln!(
            out,
            "# HELP gatehouse_requests_allowed_total Requests admitted by the rate limiter."
        );
        let _ = writeln!(out, "# TYPE gatehouse_requests_allowed_total counter");
        for class in ALL_CLASSES {
            let label = class.label();
            let n = self.allowed(class);
            let _ = writeln!(out, "gatehouse_requests_allowed_total{{class=\"{label}\"}} {n}");
        }

        let _ = writeln!(
            out,
            "# HELP gatehouse_requests_limited_total Requests rejected with 429."
        );
        let _ = writeln!(out, "# TYPE gatehouse_requests_limited_total counter");
        for class in ALL_CLASSES {
            let label = class.label();
            let n = self.limited(class);
            let _ = writeln!(out, "gatehouse_requests_limited_total{{class=\"{label}\"}} {n}");
        }

        counter(
            &mut out,
            "gatehouse_requests_forbidden_total",
            "Requests rejected by the origin check",
            self.forbidden(),
        );
        counter(
            &mut out,
            "gatehouse_static_passthrough_total",
            "Static asset requests that skipped the gate",
            self.static_passthrough(),
        );

        out
    }
}

fn gauge(out: &mut String, name: &str, help: &str, value: impl std::fmt::Display) {
    let _ = writeln!(out, "# HELP {name} {help}");
    let _ = writeln!(out, "# TYPE {name} gauge");
    let _ = writeln!(out, "{name} {value}");
}

fn counter(out: &mut String, name: &str, help: &str, value: u64) {
    let _ = writeln!(out, "# HELP {name} {help}");
    let _ = writeln!(out, "# TYPE {name} counter");
    let _ = writeln!(out, "{name} {value}");
}
