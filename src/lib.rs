//! Gatehouse - rate-limiting and CSRF gate in front of the course platform.
//!
//! The gate logic lives in `gatehouse-core`; the axum transport in
//! `gatehouse-http`. This crate wires configuration, logging and the
//! background sweeper into a binary.

pub mod config;
pub mod sweeper;

pub use gatehouse_http::{AppState, router};

use gatehouse_core::ConfigError;

use crate::config::Config;

/// Builds the application state described by `config`.
pub fn app_state(config: &Config) -> Result<AppState, ConfigError> {
    let gate = config.build_gate()?;

    #[cfg(feature = "proxy")]
    if let Some(url) = &config.upstream {
        let upstream = gatehouse_http::routes::proxy::Upstream::new(url)?;
        return Ok(AppState::with_upstream(gate, upstream));
    }

    Ok(AppState::new(gate))
}
