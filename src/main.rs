//! Gatehouse entry point.

use std::net::SocketAddr;

use tracing_subscriber::EnvFilter;

use gatehouse::config::Config;

#[tokio::main]
async fn main() {
    let config = Config::parse();

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.log_format == "json" {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let state = match gatehouse::app_state(&config) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("{e}");
            std::process::exit(2);
        }
    };

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        app_url = %config.app_url,
        upstream = config.upstream.as_deref().unwrap_or("none"),
        trusted_origins = ?state.gate().origins().allowed(),
        "Gatehouse starting",
    );

    if let Some(every) = config.sweep_interval() {
        tokio::spawn(gatehouse::sweeper::run(state.gate().limiter().clone(), every));
    }

    let app = gatehouse::router(state);

    let addr = SocketAddr::new(config.host.parse().expect("invalid host"), config.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind");

    tracing::info!(%addr, "Gatehouse ready");

    gatehouse_http::serve(listener, app, shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("Gatehouse shut down");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install signal handler");
    tracing::info!("Shutdown signal received");
}
