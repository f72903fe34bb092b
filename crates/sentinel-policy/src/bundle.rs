//! Versioned, hash-chained policy bundles.

use crate::rule::PolicyRule;
use chrono::{DateTime, Utc};
use sentinel_core::canonical::canonical_sha256;
use sentinel_core::types::Environment;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// A versioned, hash-verified collection of policy rules.
///
/// `hash` covers `(version, rules, parent_hash)` in canonical form;
/// `parent_hash` chains to the previously current bundle, so tampering
/// with any prior bundle breaks every descendant's hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyBundle {
    pub id: String,
    pub version: String,
    pub rules: Vec<PolicyRule>,
    pub hash: String,
    pub parent_hash: String,
    pub valid_from: DateTime<Utc>,
    pub valid_until: Option<DateTime<Utc>>,
    pub metadata: serde_json::Value,
}

impl PolicyBundle {
    pub fn new(version: String, rules: Vec<PolicyRule>, parent_hash: String, metadata: serde_json::Value) -> Self {
        let hash = Self::compute_hash(&version, &rules, &parent_hash);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            version,
            rules,
            hash,
            parent_hash,
            valid_from: Utc::now(),
            valid_until: None,
            metadata,
        }
    }

    fn compute_hash(version: &str, rules: &[PolicyRule], parent_hash: &str) -> String {
        let mut sorted: Vec<&PolicyRule> = rules.iter().collect();
        sorted.sort_by(|a, b| a.id.cmp(&b.id));
        let payload = json!({
            "version": version,
            "rules": sorted,
            "parent_hash": parent_hash,
        });
        canonical_sha256(&payload)
    }

    /// Recompute the hash and compare against the stored one. A bundle
    /// that fails this has either been tampered with in transit or
    /// decoded incorrectly.
    pub fn verify_integrity(&self) -> bool {
        self.hash == Self::compute_hash(&self.version, &self.rules, &self.parent_hash)
    }

    /// Lightweight view for edge consumption: only active rules scoped
    /// to `env`. Its `hash` covers only `(version, rules)` in this
    /// filtered form — it is not the full bundle's chain hash, since the
    /// edge never sees `parent_hash` or the rules scoped to other
    /// environments — so the edge can verify it was delivered intact
    /// without needing the full bundle.
    pub fn to_edge_bundle(&self, env: Environment) -> EdgeBundle {
        let rules: Vec<PolicyRule> = self
            .rules
            .iter()
            .filter(|r| r.active && r.environment_scope.contains(&env))
            .cloned()
            .collect();
        let hash = EdgeBundle::compute_hash(&self.version, &rules);
        EdgeBundle { version: self.version.clone(), hash, rules }
    }
}

/// The filtered, environment-scoped bundle shape an edge gateway
/// downloads and loads into its local enforcer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeBundle {
    pub version: String,
    pub hash: String,
    pub rules: Vec<PolicyRule>,
}

impl EdgeBundle {
    /// SHA-256 over canonicalized `{version, rules sorted by id}`.
    pub fn compute_hash(version: &str, rules: &[PolicyRule]) -> String {
        let mut sorted: Vec<&PolicyRule> = rules.iter().collect();
        sorted.sort_by(|a, b| a.id.cmp(&b.id));
        let payload = json!({ "version": version, "rules": sorted });
        canonical_sha256(&payload)
    }

    /// Recompute the hash and compare against the stored one. An edge
    /// bundle that fails this was tampered with or corrupted in transit.
    pub fn verify_integrity(&self) -> bool {
        self.hash == Self::compute_hash(&self.version, &self.rules)
    }
}

/// The result of comparing two bundles: rules present only in the
/// newer one, only in the older one, or whose definition changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleDiff {
    pub from_version: String,
    pub to_version: String,
    pub added: Vec<PolicyRule>,
    pub removed: Vec<PolicyRule>,
    pub modified: Vec<(PolicyRule, PolicyRule)>,
}

pub fn diff_bundles(from: &PolicyBundle, to: &PolicyBundle) -> BundleDiff {
    let mut added = Vec::new();
    let mut modified = Vec::new();

    for to_rule in &to.rules {
        match from.rules.iter().find(|r| r.id == to_rule.id) {
            None => added.push(to_rule.clone()),
            Some(from_rule) => {
                let from_json = serde_json::to_value(from_rule).unwrap();
                let to_json = serde_json::to_value(to_rule).unwrap();
                if from_json != to_json {
                    modified.push((from_rule.clone(), to_rule.clone()));
                }
            }
        }
    }

    let removed = from
        .rules
        .iter()
        .filter(|r| !to.rules.iter().any(|t| t.id == r.id))
        .cloned()
        .collect();

    BundleDiff { from_version: from.version.clone(), to_version: to.version.clone(), added, removed, modified }
}
