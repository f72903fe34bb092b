//! HTTP handlers for the control-plane network surface: policy bundle
//! distribution, identity issuance, the master ledger, and server-side
//! evaluation.

use crate::state::AppState;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use sentinel_core::types::{Environment, Tier};
use sentinel_ledger::{ChainVerification, DecisionRecord, IngestResult};
use sentinel_passport::{PassportData, PassportService};
use sentinel_policy::{BundleDiff, EdgeBundle, EvaluationRequest, LocalPolicyEnforcer, PolicyBundle, PolicyError, PolicyRule, Verdict, KNOWN_RULE_TYPES};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

// ---- Policy bundle distribution ----

#[derive(Debug, Deserialize)]
pub struct BundleQuery {
    env: String,
}

pub async fn get_bundle(State(state): State<Arc<AppState>>, Query(query): Query<BundleQuery>) -> Result<Json<EdgeBundle>, StatusCode> {
    let env = Environment::parse(&query.env).ok_or(StatusCode::BAD_REQUEST)?;
    state.policy_store.for_environment(env).map(Json).ok_or(StatusCode::NOT_FOUND)
}

#[derive(Debug, Deserialize)]
pub struct CreateBundleRequest {
    rules: Vec<PolicyRule>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    metadata: serde_json::Value,
}

pub async fn create_bundle(State(state): State<Arc<AppState>>, Json(request): Json<CreateBundleRequest>) -> Result<Json<PolicyBundle>, StatusCode> {
    if let Some(unknown) = request.rules.iter().find(|r| !r.is_known_type()) {
        return Err(policy_error_status(&PolicyError::UnknownRuleType(unknown.rule_type.clone())));
    }
    Ok(Json(state.policy_store.create_bundle(request.rules, request.version, request.metadata)))
}

#[derive(Debug, Deserialize)]
pub struct RollbackRequest {
    #[serde(default)]
    target_version: Option<String>,
}

pub async fn rollback_bundle(State(state): State<Arc<AppState>>, Json(request): Json<RollbackRequest>) -> Result<Json<PolicyBundle>, StatusCode> {
    state.policy_store.rollback(request.target_version.as_deref()).map(Json).map_err(|e| policy_error_status(&e))
}

#[derive(Debug, Deserialize)]
pub struct DiffQuery {
    from: String,
    to: String,
}

pub async fn diff_bundles(State(state): State<Arc<AppState>>, Query(query): Query<DiffQuery>) -> Result<Json<BundleDiff>, StatusCode> {
    state.policy_store.diff(&query.from, &query.to).map(Json).map_err(|e| policy_error_status(&e))
}

pub async fn bundle_history(State(state): State<Arc<AppState>>) -> Json<Vec<PolicyBundle>> {
    Json(state.policy_store.history())
}

fn policy_error_status(error: &PolicyError) -> StatusCode {
    match error {
        PolicyError::NotFound(_) => StatusCode::NOT_FOUND,
        PolicyError::UnknownRuleType(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

// ---- Revocation distribution ----

#[derive(Debug, Deserialize)]
pub struct RevocationQuery {
    since: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct RevocationListResponse {
    snapshot_id: u64,
    revoked_jtis: Vec<String>,
}

pub async fn revocation_list(State(state): State<Arc<AppState>>, Query(query): Query<RevocationQuery>) -> Json<RevocationListResponse> {
    // Diff when the caller has a prior snapshot and no gap occurred;
    // full snapshot (the gap/omitted-`since` fallback) otherwise.
    let diff = query.since.and_then(|since| state.revocation.diff_since(since));
    let (snapshot_id, revoked_jtis) = match diff {
        Some(jtis) => (state.revocation.current_snapshot_id(), jtis),
        None => state.revocation.snapshot(),
    };
    Json(RevocationListResponse { snapshot_id, revoked_jtis })
}

// ---- Passport issuance ----

#[derive(Debug, Deserialize)]
pub struct IssuePassportRequest {
    agent_id: String,
    role: String,
    tier: Tier,
    trust_score: f64,
    authority_limit: f64,
    allowed_environments: HashSet<Environment>,
    dna_fingerprint: String,
    #[serde(default)]
    ttl_seconds: Option<i64>,
}

impl From<IssuePassportRequest> for PassportData {
    fn from(request: IssuePassportRequest) -> Self {
        PassportData {
            agent_id: request.agent_id,
            role: request.role,
            tier: request.tier,
            trust_score: request.trust_score,
            authority_limit: request.authority_limit,
            allowed_environments: request.allowed_environments,
            dna_fingerprint: request.dna_fingerprint,
            ttl_seconds: request.ttl_seconds,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    token: String,
}

pub async fn issue_passport(State(state): State<Arc<AppState>>, Json(request): Json<IssuePassportRequest>) -> Result<Json<TokenResponse>, StatusCode> {
    state
        .passport_service
        .issue(request.into())
        .map(|token| Json(TokenResponse { token }))
        .map_err(|_| StatusCode::BAD_REQUEST)
}

#[derive(Debug, Deserialize)]
pub struct RotatePassportRequest {
    old_token: String,
    new_passport: IssuePassportRequest,
}

pub async fn rotate_passport(State(state): State<Arc<AppState>>, Json(request): Json<RotatePassportRequest>) -> Result<Json<TokenResponse>, StatusCode> {
    state
        .passport_service
        .rotate(&request.old_token, request.new_passport.into())
        .map(|token| Json(TokenResponse { token }))
        .map_err(|_| StatusCode::BAD_REQUEST)
}

#[derive(Debug, Deserialize)]
pub struct RevokePassportRequest {
    jti: String,
}

pub async fn revoke_passport(State(state): State<Arc<AppState>>, Json(request): Json<RevokePassportRequest>) -> StatusCode {
    state.passport_service.revoke(&request.jti);
    StatusCode::NO_CONTENT
}

// ---- Master ledger ----

#[derive(Debug, Deserialize)]
pub struct BulkRecordRequest {
    gateway_id: String,
    decisions: Vec<DecisionRecord>,
}

pub async fn bulk_record(State(state): State<Arc<AppState>>, Json(request): Json<BulkRecordRequest>) -> Json<IngestResult> {
    Json(state.ledger.bulk_ingest(&request.gateway_id, request.decisions))
}

#[derive(Debug, Deserialize)]
pub struct VerifyChainQuery {
    agent_id: Option<String>,
    limit: Option<usize>,
}

pub async fn verify_chain(State(state): State<Arc<AppState>>, Query(query): Query<VerifyChainQuery>) -> Json<ChainVerification> {
    Json(state.ledger.verify_chain(query.agent_id.as_deref(), query.limit))
}

// ---- Server-side evaluation (secondary check path) ----

#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    #[serde(default)]
    agent_id: String,
    action: String,
    #[serde(default)]
    context: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct RuleResult {
    rule_id: String,
    rule_name: String,
    passed: bool,
}

#[derive(Debug, Serialize)]
pub struct EvaluateResponse {
    verdict: Verdict,
    reasoning: String,
    policy_results: Vec<RuleResult>,
    confidence: f64,
}

fn ctx_f64(context: &serde_json::Value, key: &str, default: f64) -> f64 {
    context.get(key).and_then(|v| v.as_f64()).unwrap_or(default)
}

fn ctx_str<'a>(context: &'a serde_json::Value, key: &str, default: &'a str) -> &'a str {
    context.get(key).and_then(|v| v.as_str()).unwrap_or(default)
}

pub async fn evaluate(State(state): State<Arc<AppState>>, Json(request): Json<EvaluateRequest>) -> Result<Json<EvaluateResponse>, StatusCode> {
    let bundle = state.policy_store.current().ok_or(StatusCode::NOT_FOUND)?;

    // Cloud evaluation rejects unknown rule types outright rather than
    // failing open the way the edge does.
    if let Some(unknown) = bundle.rules.iter().find(|r| r.active && !r.is_known_type()) {
        tracing::warn!(rule = %unknown.name, rule_type = %unknown.rule_type, known = ?KNOWN_RULE_TYPES, "rejecting evaluate: unknown rule type at cloud");
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    }

    let mut enforcer = LocalPolicyEnforcer::new();
    enforcer.load_bundle(EdgeBundle { version: bundle.version.clone(), hash: bundle.hash.clone(), rules: bundle.rules.clone() });

    let tier: Tier = ctx_str(&request.context, "tier", "T4").parse().unwrap_or(Tier::T4);
    let eval_request = EvaluationRequest {
        tier,
        trust_score: ctx_f64(&request.context, "trust_score", 0.0),
        authority_limit: ctx_f64(&request.context, "authority_limit", 0.0),
        agent_status: ctx_str(&request.context, "agent_status", "active"),
        action_type: &request.action,
        amount: ctx_f64(&request.context, "amount", 0.0),
        recent_similar_requests: ctx_f64(&request.context, "recent_similar_requests", 0.0) as u32,
    };

    let verdict = enforcer.evaluate(&eval_request);
    let policy_results = enforcer
        .rules()
        .iter()
        .filter(|r| r.active)
        .map(|r| RuleResult { rule_id: r.id.clone(), rule_name: r.name.clone(), passed: enforcer.evaluate_rule(r, &eval_request) })
        .collect();

    tracing::info!(agent_id = %request.agent_id, verdict = ?verdict.verdict, "server-side evaluate");

    Ok(Json(EvaluateResponse { verdict: verdict.verdict, reasoning: verdict.reason, policy_results, confidence: if verdict.rules_checked > 0 { 0.9 } else { 1.0 } }))
}
