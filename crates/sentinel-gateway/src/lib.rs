//! Sentinel edge gateway library: router assembly and handlers, kept
//! separate from `main.rs` so integration tests can drive the app
//! in-process via `tower::ServiceExt::oneshot`.

pub mod handlers;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use state::AppState;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/status", get(handlers::status))
        .route("/authorize", post(handlers::authorize_handler))
        .route("/heartbeat", post(handlers::heartbeat_handler))
        .route("/sync", post(handlers::sync_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
