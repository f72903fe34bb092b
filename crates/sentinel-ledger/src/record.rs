//! The decision record: the ledger's immutable unit of storage.

use chrono::{DateTime, SecondsFormat, Utc};
use sentinel_core::canonical::canonical_sha256;
use sentinel_core::types::Environment;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Allow,
    Deny,
    Escalate,
}

/// Fields supplied by the caller; `id`, `prev_hash`, and `hash` are
/// assigned by the ledger on append.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRecordInput {
    pub agent_id: String,
    pub action_type: String,
    pub resource: String,
    pub amount: f64,
    pub currency: String,
    pub environment: Environment,
    pub verdict: Verdict,
    pub reason: String,
    pub passport_jti: String,
    pub gateway_id: String,
    pub input_context: serde_json::Value,
    pub reasoning_trace: Option<String>,
    pub prophecy_paths: Option<serde_json::Value>,
}

/// An immutable, hash-chained decision record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub id: String,
    pub agent_id: String,
    pub action_type: String,
    pub resource: String,
    pub amount: f64,
    pub currency: String,
    pub environment: Environment,
    pub verdict: Verdict,
    pub reason: String,
    pub passport_jti: String,
    pub gateway_id: String,
    pub timestamp: DateTime<Utc>,
    pub input_context: serde_json::Value,
    pub reasoning_trace: Option<String>,
    pub prophecy_paths: Option<serde_json::Value>,
    pub prev_hash: String,
    pub hash: String,
    /// Retained only on master records: the gateway's own `hash` for
    /// this record before re-chaining. Provenance, not a chain key.
    pub local_hash: Option<String>,
}

impl DecisionRecord {
    /// SHA-256 over canonicalized `{id, agent_id, action_type, verdict,
    /// amount, environment, timestamp, prev_hash}`.
    pub fn compute_hash(id: &str, agent_id: &str, action_type: &str, verdict: Verdict, amount: f64, environment: Environment, timestamp: DateTime<Utc>, prev_hash: &str) -> String {
        let payload = json!({
            "id": id,
            "agent_id": agent_id,
            "action_type": action_type,
            "verdict": verdict,
            "amount": amount,
            "environment": environment,
            "timestamp": timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            "prev_hash": prev_hash,
        });
        canonical_sha256(&payload)
    }

    pub fn recompute_hash(&self) -> String {
        Self::compute_hash(&self.id, &self.agent_id, &self.action_type, self.verdict, self.amount, self.environment, self.timestamp, &self.prev_hash)
    }
}
