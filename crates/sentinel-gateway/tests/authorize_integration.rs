//! End-to-end exercise of the edge gateway's HTTP surface, driven
//! in-process via `tower::ServiceExt::oneshot` (no real socket).

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use sentinel_core::config::Config;
use sentinel_core::types::Environment;
use sentinel_gateway::state::AppState;
use sentinel_passport::PassportData;
use sentinel_policy::{EdgeBundle, OnFail, PolicyRule};
use std::collections::HashMap;
use std::sync::Arc;
use tower::ServiceExt;

fn test_config() -> Config {
    Config {
        control_plane_url: "http://127.0.0.1:0".to_string(),
        gateway_id: "gw-test".to_string(),
        gateway_environment: "edge".to_string(),
        jwt_secret: "integration-test-secret".to_string(),
        sync_interval_seconds: 30,
        ledger_soft_cap: 10_000,
        ledger_hard_cap: 100_000,
        deadline_ms: 5_000,
        port: 0,
    }
}

fn amount_limit_rule(max_amount: f64) -> PolicyRule {
    let mut params = HashMap::new();
    params.insert("max_amount".to_string(), serde_json::Value::from(max_amount));
    PolicyRule::new("cap", "amount_limit", params, OnFail::Deny, vec![Environment::Edge])
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn s1_authorize_allows_within_policy() {
    let state = Arc::new(AppState::from_config(test_config()));
    state.enforcer.write().load_bundle(EdgeBundle { version: "v1".into(), hash: "h".into(), rules: vec![amount_limit_rule(100_000.0)] });

    let token = state
        .passport_service
        .issue(PassportData {
            agent_id: "agent-1".into(),
            role: "settlement-bot".into(),
            tier: sentinel_core::types::Tier::T2,
            trust_score: 0.80,
            authority_limit: 50_000.0,
            allowed_environments: [Environment::Edge].into_iter().collect(),
            dna_fingerprint: "deadbeef".into(),
            ttl_seconds: None,
        })
        .unwrap();

    let app = sentinel_gateway::build_router(state.clone());
    let body = serde_json::json!({
        "passport_token": token,
        "action_type": "write",
        "resource": "account-1",
        "amount": 45_000.0,
        "currency": "USD",
        "environment": "edge",
        "context": {},
    });

    let response = app
        .oneshot(Request::builder().method("POST").uri("/authorize").header("content-type", "application/json").body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let payload = json_body(response).await;
    assert_eq!(payload["authorized"], true);
    assert_eq!(payload["verdict"], "allow");
    assert_eq!(state.ledger.len(), 1);
}

#[tokio::test]
async fn s5_authorize_rejects_revoked_passport() {
    let state = Arc::new(AppState::from_config(test_config()));

    let token = state
        .passport_service
        .issue(PassportData {
            agent_id: "agent-2".into(),
            role: "settlement-bot".into(),
            tier: sentinel_core::types::Tier::T2,
            trust_score: 0.80,
            authority_limit: 50_000.0,
            allowed_environments: [Environment::Edge].into_iter().collect(),
            dna_fingerprint: "deadbeef".into(),
            ttl_seconds: None,
        })
        .unwrap();
    let claims = state.passport_service.verify(&token).unwrap();
    state.passport_service.revoke(&claims.passport_jti);

    let app = sentinel_gateway::build_router(state.clone());
    let body = serde_json::json!({
        "passport_token": token,
        "action_type": "write",
        "resource": "account-1",
        "amount": 1.0,
        "currency": "USD",
        "environment": "edge",
        "context": {},
    });

    let response = app
        .oneshot(Request::builder().method("POST").uri("/authorize").header("content-type", "application/json").body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(state.ledger.len(), 0);
}

#[tokio::test]
async fn health_and_status_report_without_auth() {
    let state = Arc::new(AppState::from_config(test_config()));
    let app = sentinel_gateway::build_router(state);

    let response = app.clone().oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(Request::builder().uri("/status").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let payload = json_body(response).await;
    assert_eq!(payload["gateway_id"], "gw-test");
}
