//! Local Policy Enforcer (C4): pure, deterministic, offline rule
//! evaluation. No I/O, no network, no clock reads beyond what the
//! caller supplies.

use crate::bundle::EdgeBundle;
use crate::rule::{OnFail, PolicyRule};
use sentinel_core::types::Tier;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Allow,
    Deny,
    Escalate,
}

/// Evaluation result: the verdict, a human-readable reason, and how
/// many rules were checked before a decision was reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnforcerVerdict {
    pub verdict: Verdict,
    pub reason: String,
    pub rules_checked: usize,
}

/// Request shape passed into `evaluate`.
#[derive(Debug, Clone)]
pub struct EvaluationRequest<'a> {
    pub tier: Tier,
    pub trust_score: f64,
    pub authority_limit: f64,
    pub agent_status: &'a str,
    pub action_type: &'a str,
    pub amount: f64,
    /// Count of similar requests from this agent in the current
    /// `split_detection` window, supplied by the caller (the pipeline
    /// owns the sliding-window counters; the enforcer stays pure).
    pub recent_similar_requests: u32,
}

fn tier_from_name(name: &str) -> Option<Tier> {
    name.parse().ok()
}

/// Evaluates a loaded set of rules against a proposed action. Holds no
/// mutable state of its own beyond the current bundle — safe to share
/// behind a read lock and call from many request handlers at once.
#[derive(Debug, Clone, Default)]
pub struct LocalPolicyEnforcer {
    rules: Vec<PolicyRule>,
    policy_version: String,
}

impl LocalPolicyEnforcer {
    pub fn new() -> Self {
        Self { rules: Vec::new(), policy_version: "0".to_string() }
    }

    /// Replace the active rule set with a freshly pulled bundle.
    pub fn load_bundle(&mut self, bundle: EdgeBundle) {
        self.policy_version = bundle.version;
        let count = bundle.rules.len();
        self.rules = bundle.rules;
        tracing::info!(version = %self.policy_version, rules = count, "local policy bundle loaded");
    }

    pub fn policy_version(&self) -> &str {
        &self.policy_version
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn rules(&self) -> &[PolicyRule] {
        &self.rules
    }

    /// Evaluate every active rule in bundle order; the first failing
    /// rule decides the verdict via its `on_fail` field. Unknown rule
    /// types fail open (evaluate to "passed") at the edge.
    pub fn evaluate(&self, req: &EvaluationRequest) -> EnforcerVerdict {
        let mut checked = 0;
        for rule in self.rules.iter().filter(|r| r.active) {
            checked += 1;
            if !self.evaluate_rule(rule, req) {
                return EnforcerVerdict {
                    verdict: match rule.on_fail {
                        OnFail::Deny => Verdict::Deny,
                        OnFail::Escalate => Verdict::Escalate,
                    },
                    reason: format!("rule '{}' failed", rule.name),
                    rules_checked: checked,
                };
            }
        }
        EnforcerVerdict { verdict: Verdict::Allow, reason: "all local policies passed".to_string(), rules_checked: checked }
    }

    /// Evaluate a single rule in isolation, ignoring `on_fail`/ordering.
    /// Exposed for callers that report per-rule detail (e.g. the
    /// server-side evaluate surface) alongside the authoritative verdict.
    pub fn evaluate_rule(&self, rule: &PolicyRule, req: &EvaluationRequest) -> bool {
        match rule.rule_type.as_str() {
            "amount_limit" => req.amount <= rule.param_f64("max_amount", 0.0),
            "authority_limit" => req.amount <= req.authority_limit,
            "trust_minimum" => req.trust_score >= rule.param_f64("min_trust", 0.0),
            "tier_required" => {
                let allowed = rule.param_str_list("allowed_tiers");
                allowed.iter().any(|t| tier_from_name(t) == Some(req.tier))
            }
            "tier_minimum" => {
                let min_tier = tier_from_name(&rule.param_str("min_tier", "T4")).unwrap_or(Tier::T4);
                req.tier.rank() >= min_tier.rank()
            }
            "action_allowed" => {
                let allowed = rule.param_str_list("allowed_actions");
                allowed.iter().any(|a| a == req.action_type)
            }
            "status_check" => req.agent_status == rule.param_str("required_status", "active"),
            "split_detection" => req.recent_similar_requests < rule.param_u32("max_requests", u32::MAX),
            // unrecognized type: fail open at the edge
            _ => true,
        }
    }
}

// re-exported so bin crates can construct raw parameter maps in tests/fixtures
pub type RawParameters = HashMap<String, Value>;
