//! Policy rule definitions.

use sentinel_core::types::Environment;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// What happens when a rule fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnFail {
    Deny,
    Escalate,
}

/// A single policy rule. `rule_type` is the closed set named in the
/// spec (`amount_limit`, `trust_minimum`, ...) or any other string for
/// types the enforcer doesn't recognize. `parameters` carries the
/// type-specific fields as a flattened JSON object, mirroring how
/// bundles arrive over the wire from the control plane.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyRule {
    #[serde(default = "new_rule_id")]
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub rule_type: String,
    #[serde(flatten)]
    pub parameters: HashMap<String, Value>,
    pub on_fail: OnFail,
    pub environment_scope: Vec<Environment>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn new_rule_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn default_active() -> bool {
    true
}

/// Known rule types. Anything outside this set is fail-open at the
/// edge enforcer.
pub const KNOWN_RULE_TYPES: &[&str] = &[
    "amount_limit",
    "authority_limit",
    "trust_minimum",
    "tier_required",
    "tier_minimum",
    "action_allowed",
    "status_check",
    "split_detection",
];

impl PolicyRule {
    pub fn new(
        name: impl Into<String>,
        rule_type: impl Into<String>,
        parameters: HashMap<String, Value>,
        on_fail: OnFail,
        environment_scope: Vec<Environment>,
    ) -> Self {
        Self {
            id: new_rule_id(),
            name: name.into(),
            rule_type: rule_type.into(),
            parameters,
            on_fail,
            environment_scope,
            active: true,
        }
    }

    pub fn is_known_type(&self) -> bool {
        KNOWN_RULE_TYPES.contains(&self.rule_type.as_str())
    }

    pub fn param_f64(&self, key: &str, default: f64) -> f64 {
        self.parameters.get(key).and_then(Value::as_f64).unwrap_or(default)
    }

    pub fn param_u32(&self, key: &str, default: u32) -> u32 {
        self.parameters.get(key).and_then(Value::as_u64).map(|v| v as u32).unwrap_or(default)
    }

    pub fn param_str(&self, key: &str, default: &str) -> String {
        self.parameters.get(key).and_then(Value::as_str).unwrap_or(default).to_string()
    }

    pub fn param_str_list(&self, key: &str) -> Vec<String> {
        self.parameters
            .get(key)
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default()
    }
}
