//! Sentinel control-plane library: router assembly and handlers, kept
//! separate from `main.rs` so integration tests can drive the app
//! in-process.

pub mod handlers;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use state::AppState;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/sentinel/policies/bundle", get(handlers::get_bundle))
        .route("/sentinel/policies", post(handlers::create_bundle))
        .route("/sentinel/policies/rollback", post(handlers::rollback_bundle))
        .route("/sentinel/policies/diff", get(handlers::diff_bundles))
        .route("/sentinel/policies/history", get(handlers::bundle_history))
        .route("/identity/revocation-list", get(handlers::revocation_list))
        .route("/identity/passports", post(handlers::issue_passport))
        .route("/identity/passports/rotate", post(handlers::rotate_passport))
        .route("/identity/passports/revoke", post(handlers::revoke_passport))
        .route("/ancestor/bulk-record", post(handlers::bulk_record))
        .route("/ancestor/verify", get(handlers::verify_chain))
        .route("/api/v1/sentinel/evaluate", post(handlers::evaluate))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
