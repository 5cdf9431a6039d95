//! Gateway configuration via CLI args and environment variables.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use gatehouse_core::rate_limit::DEFAULT_SWEEP_THRESHOLD;
use gatehouse_core::{
    Classifier, ConfigError, Gate, Limits, MemoryStore, OriginPolicy, RateLimiter, Rule,
    StaticAssets, TrafficClass,
};

/// Longest window accepted for any traffic class.
pub const MAX_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

/// Rate-limiting and CSRF gate for the course platform.
#[derive(Parser, Debug, Clone)]
#[command(name = "gatehouse", version, about)]
pub struct Config {
    /// Bind address.
    #[arg(long, default_value = "0.0.0.0", env = "GATEHOUSE_HOST")]
    pub host: String,

    /// Bind port.
    #[arg(long, default_value_t = 8080, env = "GATEHOUSE_PORT")]
    pub port: u16,

    /// Public URL of the application. Its origin is trusted for mutations.
    #[arg(long, default_value = "http://localhost:3000", env = "GATEHOUSE_APP_URL")]
    pub app_url: String,

    /// Local development port whose loopback origins are trusted.
    #[arg(long, default_value_t = 3000, env = "GATEHOUSE_DEV_PORT")]
    pub dev_port: u16,

    /// Base URL of the application to forward admitted requests to.
    #[arg(long, env = "GATEHOUSE_UPSTREAM")]
    pub upstream: Option<String>,

    /// Requests per window for health-check traffic.
    #[arg(long, default_value_t = 120, env = "GATEHOUSE_HEALTH_LIMIT")]
    pub health_limit: u64,
    #[arg(long, default_value_t = 60_000, env = "GATEHOUSE_HEALTH_WINDOW_MS")]
    pub health_window_ms: u64,

    /// Requests per window for payment and integration webhooks.
    #[arg(long, default_value_t = 500, env = "GATEHOUSE_WEBHOOK_LIMIT")]
    pub webhook_limit: u64,
    #[arg(long, default_value_t = 60_000, env = "GATEHOUSE_WEBHOOK_WINDOW_MS")]
    pub webhook_window_ms: u64,

    /// Requests per window for sign-in and SSO endpoints.
    #[arg(long, default_value_t = 5, env = "GATEHOUSE_AUTH_LIMIT")]
    pub auth_limit: u64,
    #[arg(long, default_value_t = 60_000, env = "GATEHOUSE_AUTH_WINDOW_MS")]
    pub auth_window_ms: u64,

    /// Requests per window for unauthenticated public endpoints.
    #[arg(long, default_value_t = 30, env = "GATEHOUSE_PUBLIC_LIMIT")]
    pub public_limit: u64,
    #[arg(long, default_value_t = 60_000, env = "GATEHOUSE_PUBLIC_WINDOW_MS")]
    pub public_window_ms: u64,

    /// Requests per window for everything else.
    #[arg(long, default_value_t = 100, env = "GATEHOUSE_API_LIMIT")]
    pub api_limit: u64,
    #[arg(long, default_value_t = 60_000, env = "GATEHOUSE_API_WINDOW_MS")]
    pub api_window_ms: u64,

    /// Counter count above which expired counters are swept inline.
    #[arg(long, default_value_t = DEFAULT_SWEEP_THRESHOLD, env = "GATEHOUSE_SWEEP_THRESHOLD")]
    pub sweep_threshold: usize,

    /// Seconds between background sweeps of expired counters (0 = disabled).
    #[arg(long, default_value_t = 60, env = "GATEHOUSE_SWEEP_INTERVAL")]
    pub sweep_interval: u64,

    /// Path prefixes served as static assets (comma-separated).
    #[arg(
        long,
        env = "GATEHOUSE_STATIC_PREFIXES",
        value_delimiter = ',',
        default_value = "/_static/,/_image,/favicon.ico"
    )]
    pub static_prefixes: Vec<String>,

    /// Log level.
    #[arg(long, default_value = "info", env = "GATEHOUSE_LOG_LEVEL")]
    pub log_level: String,

    /// Log format: "text" or "json".
    #[arg(long, default_value = "text", env = "GATEHOUSE_LOG_FORMAT")]
    pub log_format: String,
}

impl Config {
    /// Parses configuration from CLI args and env vars.
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// Per-class quotas.
    pub fn limits(&self) -> Limits {
        Limits::default()
            .with(
                TrafficClass::Health,
                Rule::per_millis(self.health_limit, self.health_window_ms),
            )
            .with(
                TrafficClass::Webhook,
                Rule::per_millis(self.webhook_limit, self.webhook_window_ms),
            )
            .with(
                TrafficClass::Auth,
                Rule::per_millis(self.auth_limit, self.auth_window_ms),
            )
            .with(
                TrafficClass::Public,
                Rule::per_millis(self.public_limit, self.public_window_ms),
            )
            .with(
                TrafficClass::Api,
                Rule::per_millis(self.api_limit, self.api_window_ms),
            )
    }

    /// Interval for the background sweeper, `None` when disabled.
    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval > 0).then(|| Duration::from_secs(self.sweep_interval))
    }

    /// Rejects quotas that would block, never reset, or reset too far out.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let limits = self.limits();
        for class in gatehouse_core::traffic::ALL_CLASSES {
            let rule = limits.rule(class);
            if rule.limit == 0 || rule.window.is_zero() {
                return Err(ConfigError::Invalid(format!(
                    "{class} limit and window must both be positive"
                )));
            }
            if rule.window > MAX_WINDOW {
                return Err(ConfigError::Invalid(format!(
                    "{class} window of {}ms exceeds the {}ms maximum",
                    rule.window.as_millis(),
                    MAX_WINDOW.as_millis()
                )));
            }
        }
        Ok(())
    }

    /// Builds the request gate with a fresh in-memory counter store.
    pub fn build_gate(&self) -> Result<Gate, ConfigError> {
        self.validate()?;
        let origins = OriginPolicy::from_app_url(&self.app_url, self.dev_port)?;
        let limiter = RateLimiter::new(
            self.limits(),
            self.sweep_threshold,
            Arc::new(MemoryStore::new()),
        );

        Ok(Gate::new(
            Classifier::default(),
            limiter,
            origins,
            StaticAssets::new(self.static_prefixes.iter().map(|p| p.trim().to_string())),
        ))
    }
}
