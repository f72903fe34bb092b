//! Prophecy simulator (C7): deterministic 3-path outcome prediction.
//! No LLM, no I/O — pure arithmetic over in-memory inputs.

use serde::{Deserialize, Serialize};

const AUTHORITY_RATIO_THRESHOLD: f64 = 0.70;
const UNSTABLE_TRUST_THRESHOLD: f64 = 0.60;
const FIRST_ACTION_THRESHOLD: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplianceRisk {
    None,
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathType {
    Approve,
    Deny,
    Escalate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProphecyPath {
    pub path_type: PathType,
    pub predicted_trust_delta: f64,
    pub risk_score: f64,
    pub financial_exposure: f64,
    pub compliance_risk: ComplianceRisk,
    pub cascade_effects: Vec<String>,
    pub recommendation_weight: f64,
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProphecyResult {
    pub agent_id: String,
    pub action_type: String,
    pub amount: f64,
    pub paths: Vec<ProphecyPath>,
    pub recommended_path: PathType,
    pub confidence: f64,
    pub trigger_reason: String,
}

/// Decide whether an action is boundary enough to warrant prophecy.
/// Returns the trigger reason alongside the boolean so callers can
/// record *why* without re-deriving it.
pub fn should_trigger_prophecy(trust_score: f64, amount: f64, authority_limit: f64, history_count: u32) -> (bool, Option<String>) {
    if authority_limit > 0.0 && amount / authority_limit >= AUTHORITY_RATIO_THRESHOLD {
        return (true, Some(format!("action amount ({amount:.0}) is >=70% of authority limit ({authority_limit:.0})")));
    }
    if trust_score < UNSTABLE_TRUST_THRESHOLD {
        return (true, Some(format!("agent trust score ({trust_score:.2}) is below stability threshold ({UNSTABLE_TRUST_THRESHOLD})")));
    }
    if history_count < FIRST_ACTION_THRESHOLD {
        return (true, Some(format!("agent has limited history ({history_count} past similar actions)")));
    }
    (false, None)
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn simulate_approve(auth_ratio: f64, historical_success: f64, amount: f64) -> ProphecyPath {
    let (predicted_delta, base_risk, mut reasoning) = if historical_success >= 0.85 {
        (0.03, 0.1 + 0.2 * auth_ratio, "high historical success rate; approve is low-risk".to_string())
    } else if historical_success >= 0.65 {
        (0.01, 0.3 + 0.3 * auth_ratio, "moderate success rate; approve with monitoring".to_string())
    } else {
        (-0.05, 0.5 + 0.4 * auth_ratio, "low success rate; approval carries significant risk".to_string())
    };

    let mut risk = base_risk;
    if auth_ratio > 0.90 {
        risk = (risk + 0.2).min(1.0);
        reasoning.push_str(" (near authority limit, elevated risk)");
    }

    let mut cascades = Vec::new();
    if auth_ratio > 0.80 {
        cascades.push(format!("action uses {:.0}% of authority limit", auth_ratio * 100.0));
    }
    if risk > 0.6 {
        cascades.push("may trigger downstream compliance review".to_string());
    }

    let compliance_risk = if risk > 0.7 { ComplianceRisk::High } else if risk > 0.4 { ComplianceRisk::Medium } else { ComplianceRisk::Low };
    let weight = historical_success * (1.0 - risk) * 0.8;

    ProphecyPath {
        path_type: PathType::Approve,
        predicted_trust_delta: predicted_delta,
        risk_score: round3(risk),
        financial_exposure: round2(amount * risk),
        compliance_risk,
        cascade_effects: cascades,
        recommendation_weight: round3(weight),
        reasoning,
    }
}

fn simulate_deny(auth_ratio: f64, tier_is_senior: bool) -> ProphecyPath {
    let mut predicted_delta = 0.0;
    let risk: f64 = 0.05;

    let mut cascades = vec!["agent action blocked; task may stall".to_string()];
    if tier_is_senior {
        cascades.push("senior agent blocked; may indicate overly restrictive policy".to_string());
        predicted_delta = -0.01;
    }

    let weight = 0.3 * (1.0 - auth_ratio);

    ProphecyPath {
        path_type: PathType::Deny,
        predicted_trust_delta: predicted_delta,
        risk_score: round3(risk),
        financial_exposure: 0.0,
        compliance_risk: ComplianceRisk::None,
        cascade_effects: cascades,
        recommendation_weight: round3(weight),
        reasoning: "deny is safest but may cause operational delays".to_string(),
    }
}

fn simulate_escalate(auth_ratio: f64, trust_score: f64, amount: f64) -> ProphecyPath {
    let mut risk: f64 = 0.15;
    let mut cascades = vec!["action delayed pending human review (avg 4-24 hours)".to_string()];
    if amount > 50_000.0 {
        cascades.push(format!("high-value action ({amount:.0}); senior reviewer required"));
        risk = 0.10;
    }

    let mut weight = 0.5 * auth_ratio + 0.3 * (1.0 - trust_score);
    let mut reasoning = "escalation provides human oversight; moderate delay cost".to_string();
    if trust_score < 0.5 {
        weight += 0.2;
        reasoning.push_str(" (recommended for low-trust agents)");
    }
    weight = weight.min(1.0);

    ProphecyPath {
        path_type: PathType::Escalate,
        predicted_trust_delta: 0.02,
        risk_score: round3(risk),
        financial_exposure: round2(amount * 0.05),
        compliance_risk: ComplianceRisk::Low,
        cascade_effects: cascades,
        recommendation_weight: round3(weight),
        reasoning,
    }
}

/// Run the 3-path simulation. `historical_success_rate` and
/// `tier_is_senior` (T1/T2) are supplied by the caller; this function
/// touches no external state.
pub fn simulate(
    agent_id: &str,
    action_type: &str,
    amount: f64,
    trust_score: f64,
    tier_is_senior: bool,
    authority_limit: f64,
    historical_success_rate: f64,
    trigger_reason: String,
) -> ProphecyResult {
    let auth_ratio = if authority_limit > 0.0 { amount / authority_limit } else { 1.0 };

    let approve = simulate_approve(auth_ratio, historical_success_rate, amount);
    let deny = simulate_deny(auth_ratio, tier_is_senior);
    let escalate = simulate_escalate(auth_ratio, trust_score, amount);

    let paths = vec![approve, deny, escalate];
    let best = paths.iter().max_by(|a, b| a.recommendation_weight.partial_cmp(&b.recommendation_weight).unwrap()).unwrap();
    let recommended_path = best.path_type;

    let mut weights: Vec<f64> = paths.iter().map(|p| p.recommendation_weight).collect();
    weights.sort_by(|a, b| b.partial_cmp(a).unwrap());
    let spread = if weights.len() > 1 { weights[0] - weights[1] } else { 0.0 };
    let confidence = (0.5 + spread).min(1.0);

    ProphecyResult {
        agent_id: agent_id.to_string(),
        action_type: action_type.to_string(),
        amount,
        paths,
        recommended_path,
        confidence: round3(confidence),
        trigger_reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s7_prophecy_trigger_matches_normative_formulas() {
        let (triggered, _) = should_trigger_prophecy(0.55, 9000.0, 10_000.0, 999);
        assert!(triggered);

        let result = simulate("agent-1", "write", 9000.0, 0.55, false, 10_000.0, 0.8, "boundary".to_string());
        let approve = result.paths.iter().find(|p| p.path_type == PathType::Approve).unwrap();
        let escalate = result.paths.iter().find(|p| p.path_type == PathType::Escalate).unwrap();
        let deny = result.paths.iter().find(|p| p.path_type == PathType::Deny).unwrap();

        assert!((approve.risk_score - 0.77).abs() < 1e-3);
        assert!((approve.predicted_trust_delta - 0.01).abs() < 1e-9);
        assert!((approve.recommendation_weight - 0.147).abs() < 1e-3);
        assert!((escalate.recommendation_weight - 0.585).abs() < 1e-3);
        assert!((deny.recommendation_weight - 0.03).abs() < 1e-3);

        assert_eq!(result.recommended_path, PathType::Escalate);
    }

    #[test]
    fn trigger_fires_on_low_trust() {
        let (triggered, reason) = should_trigger_prophecy(0.5, 10.0, 1_000_000.0, 999);
        assert!(triggered);
        assert!(reason.unwrap().contains("trust score"));
    }

    #[test]
    fn trigger_fires_on_thin_history() {
        let (triggered, reason) = should_trigger_prophecy(0.9, 10.0, 1_000_000.0, 2);
        assert!(triggered);
        assert!(reason.unwrap().contains("limited history"));
    }

    #[test]
    fn trigger_does_not_fire_for_routine_action() {
        let (triggered, reason) = should_trigger_prophecy(0.9, 10.0, 1_000_000.0, 999);
        assert!(!triggered);
        assert!(reason.is_none());
    }

    #[test]
    fn deny_path_is_always_zero_exposure() {
        let result = simulate("agent-1", "write", 50_000.0, 0.8, true, 10_000.0, 0.9, "".to_string());
        let deny = result.paths.iter().find(|p| p.path_type == PathType::Deny).unwrap();
        assert_eq!(deny.financial_exposure, 0.0);
        assert_eq!(deny.compliance_risk, ComplianceRisk::None);
    }
}
