//! Authorization pipeline (C7): the hot path. Verify passport, check
//! environment, optionally simulate prophecy, evaluate policy, append
//! to the ledger, respond. Target p99 < 50ms cold / < 10ms warm.

use crate::prophecy::{self, ProphecyResult};
use sentinel_core::types::{AgentClaims, Environment};
use sentinel_ledger::{DecisionRecord, DecisionRecordInput, LedgerError, LocalLedger, Verdict as LedgerVerdict};
use sentinel_passport::{PassportService, VerifyError};
use sentinel_policy::{EnforcerVerdict, EvaluationRequest, LocalPolicyEnforcer, Verdict as EnforcerVerdictKind};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizeRequest {
    pub passport_token: String,
    pub action_type: String,
    pub resource: String,
    pub amount: f64,
    pub currency: String,
    pub environment: Environment,
    pub context: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizeResponse {
    pub authorized: bool,
    pub verdict: EnforcerVerdictKind,
    pub reason: String,
    pub agent_id: String,
    pub agent_tier: String,
    pub gateway_id: String,
    pub latency_ms: f64,
    pub mode: String,
    pub decision_id: String,
    pub prophecy: Option<ProphecyResult>,
}

#[derive(Debug, Error)]
pub enum AuthorizeError {
    #[error("invalid passport: {0}")]
    InvalidPassport(#[from] VerifyError),
    #[error("ledger append failed")]
    Ledger(#[from] LedgerError),
    #[error("authorize deadline exceeded")]
    DeadlineExceeded,
}

/// Everything the hot path needs to do its work. `history_count` and
/// `historical_success_rate` are supplied by the caller (the pipeline
/// itself holds no historical-action store).
pub struct PipelineContext<'a> {
    pub passport_service: &'a PassportService,
    pub enforcer: &'a LocalPolicyEnforcer,
    pub ledger: &'a LocalLedger,
    pub gateway_id: &'a str,
    pub deadline: Duration,
    pub agent_status: &'a str,
    pub history_count: u32,
    pub historical_success_rate: f64,
    pub recent_similar_requests: u32,
    /// Soft/hard unsynced-buffer caps for ledger backpressure.
    pub ledger_soft_cap: usize,
    pub ledger_hard_cap: usize,
    /// `"online"` or `"degraded"`, owned by the sync engine's current
    /// state. The pipeline only reports it; it never derives it.
    pub mode: &'a str,
}

fn tier_is_senior(claims: &AgentClaims) -> bool {
    matches!(claims.tier, sentinel_core::types::Tier::T1 | sentinel_core::types::Tier::T2)
}

/// Run the authorize pipeline end to end. Returns an `AuthorizeError`
/// only for conditions that must not produce a decision record (bad
/// passport, deadline exceeded before append, backpressure). Every
/// other outcome is a `Verdict`, recorded and returned.
pub fn authorize(ctx: &PipelineContext, request: AuthorizeRequest) -> Result<AuthorizeResponse, AuthorizeError> {
    let started = Instant::now();

    // Step 1: verify passport.
    let claims = ctx.passport_service.verify(&request.passport_token)?;

    if started.elapsed() > ctx.deadline {
        return Err(AuthorizeError::DeadlineExceeded);
    }

    // Step 2: environment check.
    if !claims.allowed_environments.contains(&request.environment) {
        return finish_with_verdict(
            ctx,
            &request,
            &claims,
            EnforcerVerdict { verdict: EnforcerVerdictKind::Deny, reason: "environment not permitted".to_string(), rules_checked: 0 },
            None,
            started,
        );
    }

    // Step 3: prophecy, if this action is boundary enough to warrant it.
    let (should_trigger, trigger_reason) = prophecy::should_trigger_prophecy(claims.trust_score, request.amount, claims.authority_limit, ctx.history_count);
    let prophecy_result = if should_trigger {
        Some(prophecy::simulate(
            &claims.agent_id,
            &request.action_type,
            request.amount,
            claims.trust_score,
            tier_is_senior(&claims),
            claims.authority_limit,
            ctx.historical_success_rate,
            trigger_reason.unwrap_or_default(),
        ))
    } else {
        None
    };

    // Step 4: enforce policy.
    let eval_request = EvaluationRequest {
        tier: claims.tier,
        trust_score: claims.trust_score,
        authority_limit: claims.authority_limit,
        agent_status: ctx.agent_status,
        action_type: &request.action_type,
        amount: request.amount,
        recent_similar_requests: ctx.recent_similar_requests,
    };
    let mut verdict = ctx.enforcer.evaluate(&eval_request);

    // Backpressure: past the soft cap we still allow, but past the hard
    // cap (checked again here since the bundle evaluation took some
    // time) we fail safe instead of returning `allow`.
    if ctx.ledger.len() >= ctx.ledger_hard_cap && verdict.verdict == EnforcerVerdictKind::Allow {
        verdict = EnforcerVerdict { verdict: EnforcerVerdictKind::Escalate, reason: "ledger backpressure".to_string(), rules_checked: verdict.rules_checked };
    }

    finish_with_verdict(ctx, &request, &claims, verdict, prophecy_result, started)
}

fn finish_with_verdict(
    ctx: &PipelineContext,
    request: &AuthorizeRequest,
    claims: &AgentClaims,
    verdict: EnforcerVerdict,
    prophecy_result: Option<ProphecyResult>,
    started: Instant,
) -> Result<AuthorizeResponse, AuthorizeError> {
    if started.elapsed() > ctx.deadline {
        return Err(AuthorizeError::DeadlineExceeded);
    }

    let ledger_verdict = match verdict.verdict {
        EnforcerVerdictKind::Allow => LedgerVerdict::Allow,
        EnforcerVerdictKind::Deny => LedgerVerdict::Deny,
        EnforcerVerdictKind::Escalate => LedgerVerdict::Escalate,
    };

    let record: DecisionRecord = ctx.ledger.append(DecisionRecordInput {
        agent_id: claims.agent_id.clone(),
        action_type: request.action_type.clone(),
        resource: request.resource.clone(),
        amount: request.amount,
        currency: request.currency.clone(),
        environment: request.environment,
        verdict: ledger_verdict,
        reason: verdict.reason.clone(),
        passport_jti: claims.passport_jti.clone(),
        gateway_id: ctx.gateway_id.to_string(),
        input_context: request.context.clone(),
        reasoning_trace: None,
        prophecy_paths: prophecy_result.as_ref().map(|p| serde_json::to_value(p).unwrap_or(serde_json::Value::Null)),
    })?;

    Ok(AuthorizeResponse {
        authorized: verdict.verdict == EnforcerVerdictKind::Allow,
        verdict: verdict.verdict,
        reason: verdict.reason,
        agent_id: claims.agent_id.clone(),
        agent_tier: claims.tier.to_string(),
        gateway_id: ctx.gateway_id.to_string(),
        latency_ms: started.elapsed().as_secs_f64() * 1000.0,
        mode: ctx.mode.to_string(),
        decision_id: record.id,
        prophecy: prophecy_result,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_passport::RevocationRegistry;
    use sentinel_policy::{EdgeBundle, OnFail, PolicyRule};
    use std::collections::HashMap;
    use std::sync::Arc;

    fn passport_service() -> PassportService {
        PassportService::new(
            sentinel_passport::token::KeyMaterial::hmac("test-secret"),
            "sentinel-control-plane",
            Arc::new(RevocationRegistry::new()),
        )
    }

    fn issue_token(service: &PassportService, authority_limit: f64, trust_score: f64) -> String {
        service
            .issue(sentinel_passport::PassportData {
                agent_id: "agent-1".into(),
                role: "settlement-bot".into(),
                tier: sentinel_core::types::Tier::from_trust_score(trust_score),
                trust_score,
                authority_limit,
                allowed_environments: [Environment::Edge].into_iter().collect(),
                dna_fingerprint: "deadbeef".into(),
                ttl_seconds: None,
            })
            .unwrap()
    }

    fn amount_limit_rule(max_amount: f64) -> PolicyRule {
        let mut params = HashMap::new();
        params.insert("max_amount".to_string(), serde_json::Value::from(max_amount));
        PolicyRule::new("cap", "amount_limit", params, OnFail::Deny, vec![Environment::Edge])
    }

    #[test]
    fn s1_simple_allow_through_full_pipeline() {
        let service = passport_service();
        let token = issue_token(&service, 50_000.0, 0.80);
        let mut enforcer = LocalPolicyEnforcer::new();
        enforcer.load_bundle(EdgeBundle { version: "v1".into(), hash: "h".into(), rules: vec![amount_limit_rule(100_000.0)] });
        let ledger = LocalLedger::new("gw-1");

        let ctx = PipelineContext {
            passport_service: &service,
            enforcer: &enforcer,
            ledger: &ledger,
            gateway_id: "gw-1",
            deadline: Duration::from_secs(5),
            agent_status: "active",
            history_count: 999,
            historical_success_rate: 0.8,
            recent_similar_requests: 0,
            ledger_soft_cap: 10_000,
            ledger_hard_cap: 100_000,
            mode: "online",
        };

        let response = authorize(
            &ctx,
            AuthorizeRequest {
                passport_token: token,
                action_type: "write".into(),
                resource: "account-1".into(),
                amount: 45_000.0,
                currency: "USD".into(),
                environment: Environment::Edge,
                context: serde_json::json!({}),
            },
        )
        .unwrap();

        assert!(response.authorized);
        assert_eq!(response.verdict, EnforcerVerdictKind::Allow);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn environment_mismatch_denies_without_consulting_enforcer() {
        let service = passport_service();
        let token = issue_token(&service, 50_000.0, 0.80);
        let enforcer = LocalPolicyEnforcer::new();
        let ledger = LocalLedger::new("gw-1");

        let ctx = PipelineContext {
            passport_service: &service,
            enforcer: &enforcer,
            ledger: &ledger,
            gateway_id: "gw-1",
            deadline: Duration::from_secs(5),
            agent_status: "active",
            history_count: 999,
            historical_success_rate: 0.8,
            recent_similar_requests: 0,
            ledger_soft_cap: 10_000,
            ledger_hard_cap: 100_000,
            mode: "online",
        };

        let response = authorize(
            &ctx,
            AuthorizeRequest {
                passport_token: token,
                action_type: "write".into(),
                resource: "account-1".into(),
                amount: 1.0,
                currency: "USD".into(),
                environment: Environment::Cloud,
                context: serde_json::json!({}),
            },
        )
        .unwrap();

        assert!(!response.authorized);
        assert_eq!(response.reason, "environment not permitted");
    }

    #[test]
    fn invalid_passport_returns_error_without_ledger_append() {
        let service = passport_service();
        let enforcer = LocalPolicyEnforcer::new();
        let ledger = LocalLedger::new("gw-1");

        let ctx = PipelineContext {
            passport_service: &service,
            enforcer: &enforcer,
            ledger: &ledger,
            gateway_id: "gw-1",
            deadline: Duration::from_secs(5),
            agent_status: "active",
            history_count: 999,
            historical_success_rate: 0.8,
            recent_similar_requests: 0,
            ledger_soft_cap: 10_000,
            ledger_hard_cap: 100_000,
            mode: "online",
        };

        let result = authorize(
            &ctx,
            AuthorizeRequest {
                passport_token: "not-a-token".into(),
                action_type: "write".into(),
                resource: "account-1".into(),
                amount: 1.0,
                currency: "USD".into(),
                environment: Environment::Edge,
                context: serde_json::json!({}),
            },
        );

        assert!(result.is_err());
        assert_eq!(ledger.len(), 0);
    }

    #[test]
    fn backpressure_fails_safe_once_hard_cap_reached() {
        let service = passport_service();
        let token = issue_token(&service, 50_000.0, 0.80);
        let mut enforcer = LocalPolicyEnforcer::new();
        enforcer.load_bundle(EdgeBundle { version: "v1".into(), hash: "h".into(), rules: vec![amount_limit_rule(100_000.0)] });
        let ledger = LocalLedger::new("gw-1");

        let ctx = PipelineContext {
            passport_service: &service,
            enforcer: &enforcer,
            ledger: &ledger,
            gateway_id: "gw-1",
            deadline: Duration::from_secs(5),
            agent_status: "active",
            history_count: 999,
            historical_success_rate: 0.8,
            recent_similar_requests: 0,
            ledger_soft_cap: 10_000,
            ledger_hard_cap: 0,
            mode: "online",
        };

        let response = authorize(
            &ctx,
            AuthorizeRequest {
                passport_token: token,
                action_type: "write".into(),
                resource: "account-1".into(),
                amount: 45_000.0,
                currency: "USD".into(),
                environment: Environment::Edge,
                context: serde_json::json!({}),
            },
        )
        .unwrap();

        assert!(!response.authorized);
        assert_eq!(response.verdict, EnforcerVerdictKind::Escalate);
        assert_eq!(response.reason, "ledger backpressure");
        assert_eq!(ledger.len(), 1);
    }
}
