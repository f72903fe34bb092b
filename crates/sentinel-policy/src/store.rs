//! Policy Store & Bundler (C3): versioned bundle history, current
//! pointer, rollback stack, and per-gateway sync tracking.

use crate::bundle::{diff_bundles, BundleDiff, EdgeBundle, PolicyBundle};
use crate::rule::PolicyRule;
use chrono::Utc;
use parking_lot::RwLock;
use sentinel_core::types::Environment;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("bundle version not found: {0}")]
    NotFound(String),
    #[error("unknown rule type: {0}")]
    UnknownRuleType(String),
}

struct Inner {
    bundles: Vec<PolicyBundle>,
    current_index: Option<usize>,
    rollback_stack: Vec<String>,
    gateway_versions: HashMap<String, String>,
}

/// Central policy bundle store. One instance lives in the control
/// plane; edge gateways hold only the `EdgeBundle` they last pulled.
pub struct PolicyStore {
    inner: RwLock<Inner>,
}

impl Default for PolicyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PolicyStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                bundles: Vec::new(),
                current_index: None,
                rollback_stack: Vec::new(),
                gateway_versions: HashMap::new(),
            }),
        }
    }

    /// Create a new bundle, chained to the current one, and make it
    /// current. `version` defaults to a date-stamped sequence number
    /// if empty.
    pub fn create_bundle(&self, rules: Vec<PolicyRule>, version: Option<String>, metadata: serde_json::Value) -> PolicyBundle {
        let mut inner = self.inner.write();
        let version = version.unwrap_or_else(|| {
            format!("v{}-{:03}", Utc::now().format("%Y.%m.%d"), inner.bundles.len() + 1)
        });
        let parent_hash = inner.current_index.map(|i| inner.bundles[i].hash.clone()).unwrap_or_default();

        let bundle = PolicyBundle::new(version, rules, parent_hash, metadata);
        if let Some(current) = inner.current_index {
            let current_version = inner.bundles[current].version.clone();
            inner.rollback_stack.push(current_version);
        }
        inner.bundles.push(bundle.clone());
        inner.current_index = Some(inner.bundles.len() - 1);

        tracing::info!(version = %bundle.version, rules = bundle.rules.len(), hash = %&bundle.hash[..12], "policy bundle created");
        bundle
    }

    pub fn current(&self) -> Option<PolicyBundle> {
        let inner = self.inner.read();
        inner.current_index.map(|i| inner.bundles[i].clone())
    }

    pub fn by_version(&self, version: &str) -> Option<PolicyBundle> {
        self.inner.read().bundles.iter().find(|b| b.version == version).cloned()
    }

    pub fn history(&self) -> Vec<PolicyBundle> {
        self.inner.read().bundles.clone()
    }

    /// Roll back to `target_version`, or one step back if `None`.
    pub fn rollback(&self, target_version: Option<&str>) -> Result<PolicyBundle, PolicyError> {
        let mut inner = self.inner.write();
        let target = match target_version {
            Some(v) => v.to_string(),
            None => inner.rollback_stack.pop().ok_or_else(|| PolicyError::NotFound("<none>".to_string()))?,
        };
        let idx = inner.bundles.iter().position(|b| b.version == target).ok_or(PolicyError::NotFound(target.clone()))?;
        inner.current_index = Some(idx);
        tracing::warn!(version = %target, "policy bundle rolled back");
        Ok(inner.bundles[idx].clone())
    }

    pub fn diff(&self, from_version: &str, to_version: &str) -> Result<BundleDiff, PolicyError> {
        let inner = self.inner.read();
        let from = inner.bundles.iter().find(|b| b.version == from_version).ok_or_else(|| PolicyError::NotFound(from_version.to_string()))?;
        let to = inner.bundles.iter().find(|b| b.version == to_version).ok_or_else(|| PolicyError::NotFound(to_version.to_string()))?;
        Ok(diff_bundles(from, to))
    }

    /// Environment-scoped edge view of the current bundle.
    pub fn for_environment(&self, env: Environment) -> Option<EdgeBundle> {
        self.current().map(|b| b.to_edge_bundle(env))
    }

    /// Record that `gateway_id` has pulled `version`.
    pub fn register_gateway_sync(&self, gateway_id: impl Into<String>, version: impl Into<String>) {
        self.inner.write().gateway_versions.insert(gateway_id.into(), version.into());
    }

    pub fn gateway_version(&self, gateway_id: &str) -> Option<String> {
        self.inner.read().gateway_versions.get(gateway_id).cloned()
    }

    /// Gateways whose last-synced version isn't the current one.
    pub fn stale_gateways(&self) -> Vec<String> {
        let inner = self.inner.read();
        let Some(current) = inner.current_index.map(|i| inner.bundles[i].version.clone()) else {
            return Vec::new();
        };
        inner
            .gateway_versions
            .iter()
            .filter(|(_, v)| **v != current)
            .map(|(gw, _)| gw.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::OnFail;
    use std::collections::HashMap as StdHashMap;

    fn rule(max_amount: f64) -> PolicyRule {
        let mut params = StdHashMap::new();
        params.insert("max_amount".to_string(), serde_json::Value::from(max_amount));
        PolicyRule::new("cap", "amount_limit", params, OnFail::Deny, vec![Environment::Edge])
    }

    #[test]
    fn bundles_chain_by_parent_hash() {
        let store = PolicyStore::new();
        let b1 = store.create_bundle(vec![rule(100.0)], None, serde_json::json!({}));
        let b2 = store.create_bundle(vec![rule(200.0)], None, serde_json::json!({}));
        assert!(b1.parent_hash.is_empty());
        assert_eq!(b2.parent_hash, b1.hash);
    }

    #[test]
    fn rollback_without_target_steps_back_one() {
        let store = PolicyStore::new();
        let b1 = store.create_bundle(vec![rule(100.0)], Some("v1".into()), serde_json::json!({}));
        store.create_bundle(vec![rule(200.0)], Some("v2".into()), serde_json::json!({}));
        let rolled = store.rollback(None).unwrap();
        assert_eq!(rolled.version, b1.version);
        assert_eq!(store.current().unwrap().version, "v1");
    }

    #[test]
    fn rollback_to_missing_version_errors() {
        let store = PolicyStore::new();
        store.create_bundle(vec![rule(100.0)], Some("v1".into()), serde_json::json!({}));
        assert_eq!(store.rollback(Some("v99")), Err(PolicyError::NotFound("v99".to_string())));
    }

    #[test]
    fn stale_gateways_tracks_version_drift() {
        let store = PolicyStore::new();
        store.create_bundle(vec![rule(100.0)], Some("v1".into()), serde_json::json!({}));
        store.register_gateway_sync("gw-1", "v1");
        store.create_bundle(vec![rule(200.0)], Some("v2".into()), serde_json::json!({}));
        assert_eq!(store.stale_gateways(), vec!["gw-1".to_string()]);
        store.register_gateway_sync("gw-1", "v2");
        assert!(store.stale_gateways().is_empty());
    }

    #[test]
    fn diff_between_named_versions() {
        let store = PolicyStore::new();
        store.create_bundle(vec![rule(100.0)], Some("v1".into()), serde_json::json!({}));
        store.create_bundle(vec![rule(200.0)], Some("v2".into()), serde_json::json!({}));
        let diff = store.diff("v1", "v2").unwrap();
        assert_eq!(diff.from_version, "v1");
        assert_eq!(diff.to_version, "v2");
    }
}
