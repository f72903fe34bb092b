//! HTTP handlers for the edge gateway's network surface.

use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use sentinel_pipeline::{authorize, AuthorizeError, AuthorizeRequest, HeartbeatInput, HeartbeatResponse};
use sentinel_sync::TickReport;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    gateway_id: String,
    environment: String,
    mode: String,
    control_plane_url: String,
    local_ledger_size: usize,
    policy_count: usize,
    policy_version: String,
    last_sync_at: Option<chrono::DateTime<Utc>>,
    timestamp: chrono::DateTime<Utc>,
}

pub async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let enforcer = state.enforcer.read();
    Json(StatusResponse {
        gateway_id: state.config.gateway_id.clone(),
        environment: state.environment.as_str().to_string(),
        mode: state.mode().to_string(),
        control_plane_url: state.config.control_plane_url.clone(),
        local_ledger_size: state.ledger.len(),
        policy_count: enforcer.rule_count(),
        policy_version: enforcer.policy_version().to_string(),
        last_sync_at: state.sync_engine.last_sync_at(),
        timestamp: Utc::now(),
    })
}

pub async fn authorize_handler(State(state): State<Arc<AppState>>, Json(request): Json<AuthorizeRequest>) -> Result<Json<sentinel_pipeline::AuthorizeResponse>, StatusCode> {
    let enforcer = state.enforcer.read();
    let mode = state.mode();
    let ctx = sentinel_pipeline::PipelineContext {
        passport_service: &state.passport_service,
        enforcer: &enforcer,
        ledger: &state.ledger,
        gateway_id: &state.config.gateway_id,
        deadline: state.deadline(),
        agent_status: "active",
        history_count: 999,
        historical_success_rate: 0.8,
        recent_similar_requests: 0,
        ledger_soft_cap: state.config.ledger_soft_cap,
        ledger_hard_cap: state.config.ledger_hard_cap,
        mode,
    };

    match authorize(&ctx, request) {
        Ok(response) => Ok(Json(response)),
        Err(AuthorizeError::InvalidPassport(e)) => {
            tracing::warn!(error = %e, "authorize rejected: invalid passport");
            Err(StatusCode::UNAUTHORIZED)
        }
        Err(AuthorizeError::DeadlineExceeded) => Err(StatusCode::GATEWAY_TIMEOUT),
        Err(AuthorizeError::Ledger(_)) => Err(StatusCode::SERVICE_UNAVAILABLE),
    }
}

#[derive(Debug, Deserialize)]
pub struct HeartbeatRequest {
    agent_id: String,
    passport_token: String,
    environment: sentinel_core::types::Environment,
    host_id: String,
    region: String,
    agent_version: String,
    #[serde(default)]
    metadata: serde_json::Value,
}

pub async fn heartbeat_handler(State(state): State<Arc<AppState>>, Json(request): Json<HeartbeatRequest>) -> Result<Json<HeartbeatResponse>, StatusCode> {
    let claims = state.passport_service.verify(&request.passport_token).map_err(|e| {
        tracing::warn!(error = %e, "heartbeat rejected: invalid passport");
        StatusCode::UNAUTHORIZED
    })?;

    let input = HeartbeatInput {
        agent_id: request.agent_id,
        environment: request.environment,
        host_id: request.host_id,
        region: request.region,
        agent_version: request.agent_version,
        passport_jti: claims.passport_jti,
        metadata: request.metadata,
    };
    Ok(Json(state.env_registry.heartbeat(input)))
}

pub async fn sync_handler(State(state): State<Arc<AppState>>) -> Json<TickReport> {
    Json(state.sync_engine.tick().await)
}
