//! Gatehouse core: request gating logic shared by every transport.
//!
//! - [`classify`] maps paths to traffic classes,
//! - [`rate_limit`] runs fixed-window counters over a pluggable [`store`],
//! - [`origin`] guards state-changing requests against CSRF,
//! - [`gate`] composes them in order.
//!
//! Nothing here depends on an HTTP framework.

pub mod assets;
pub mod classify;
pub mod error;
pub mod gate;
pub mod identity;
pub mod metrics;
pub mod origin;
pub mod rate_limit;
pub mod store;
pub mod traffic;

pub use assets::StaticAssets;
pub use classify::Classifier;
pub use error::{ConfigError, GateError};
pub use gate::{Admission, Gate, GateRequest, Verdict};
pub use metrics::GateMetrics;
pub use origin::{OriginHeaders, OriginPolicy};
pub use rate_limit::{RateDecision, RateLimiter};
pub use store::{CounterStore, MemoryStore, RateKey, RateRecord};
pub use traffic::{Limits, Rule, TrafficClass};
