//! Sentinel edge gateway.
//!
//! Verifies passports and enforces the most recently synced policy
//! bundle locally, so governance keeps working under a control-plane
//! network partition.

use sentinel_core::config::Config;
use sentinel_gateway::state::AppState;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env();
    let state = Arc::new(AppState::from_config(config));

    // Startup: synchronous initial pull before accepting requests. If
    // both policies and revocations fail, the gateway still starts,
    // degraded, with an empty bundle and empty revocation set.
    let startup_report = state.sync_engine.tick().await;
    tracing::info!(?startup_report, "startup sync complete");

    let interval = Duration::from_secs(state.config.sync_interval_seconds);
    let port = state.config.port;
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let engine = state.sync_engine.clone();
    let sync_task = tokio::spawn(async move { engine.run(interval, shutdown_rx).await });

    let app = sentinel_gateway::build_router(state);

    let addr = format!("0.0.0.0:{}", port);
    tracing::info!(%addr, "sentinel-gateway listening");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());
    server.await?;

    let _ = shutdown_tx.send(());
    let _ = sync_task.await;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
