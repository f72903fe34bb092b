//! Sentinel control plane.
//!
//! Issues passports, publishes signed policy bundles, and owns the
//! master decision ledger that edge gateways sync against.

use sentinel_core::config::Config;
use sentinel_control_plane::state::AppState;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env();
    let port = config.port;
    let state = Arc::new(AppState::from_config(config));
    let app = sentinel_control_plane::build_router(state);

    let addr = format!("0.0.0.0:{}", port);
    tracing::info!(%addr, "sentinel-control-plane listening");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
