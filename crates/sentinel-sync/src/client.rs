//! Control-plane sync client: the edge gateway's only outbound HTTP.
//! Each call has its own timeout and fails soft — a failed sync leaves
//! the gateway running on its last-known-good state (degraded mode).

use sentinel_ledger::DecisionRecord;
use sentinel_policy::EdgeBundle;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const POLICY_TIMEOUT: Duration = Duration::from_secs(5);
const REVOCATION_TIMEOUT: Duration = Duration::from_secs(5);
const FLUSH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevocationListResponse {
    pub snapshot_id: u64,
    pub revoked_jtis: Vec<String>,
}

#[derive(Debug, Serialize)]
struct BulkRecordRequest<'a> {
    gateway_id: &'a str,
    decisions: &'a [DecisionRecord],
}

#[derive(Debug, Deserialize)]
struct BulkRecordResponse {
    accepted: Vec<serde_json::Value>,
}

/// Thin client over the control plane's sync surface. Holds no
/// gateway state itself; callers (the sync engine) own the enforcer,
/// revocation registry, and ledger it reads results into.
pub struct ControlPlaneSyncClient {
    http: reqwest::Client,
    base_url: String,
    gateway_id: String,
}

impl ControlPlaneSyncClient {
    pub fn new(base_url: impl Into<String>, gateway_id: impl Into<String>) -> Self {
        Self { http: reqwest::Client::new(), base_url: base_url.into().trim_end_matches('/').to_string(), gateway_id: gateway_id.into() }
    }

    /// Pull the current edge-scoped policy bundle. Returns `None` on
    /// any transport/decode failure — the caller keeps its last bundle.
    pub async fn pull_policies(&self, environment: &str) -> Option<EdgeBundle> {
        let url = format!("{}/sentinel/policies/bundle?env={}", self.base_url, environment);
        let response = tokio::time::timeout(POLICY_TIMEOUT, self.http.get(&url).send()).await.ok()?.ok()?;
        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "policy sync returned non-200");
            return None;
        }
        match response.json::<EdgeBundle>().await {
            Ok(bundle) => Some(bundle),
            Err(e) => {
                tracing::warn!(error = %e, "policy sync decode failed");
                None
            }
        }
    }

    /// Pull the revocation list, diff since `since` if we have a
    /// snapshot pointer. A gap on the server side falls back to a full
    /// snapshot transparently — this client just returns whatever it got.
    pub async fn pull_revocations(&self, since: Option<u64>) -> Option<RevocationListResponse> {
        let url = match since {
            Some(s) => format!("{}/identity/revocation-list?since={}", self.base_url, s),
            None => format!("{}/identity/revocation-list", self.base_url),
        };
        let response = tokio::time::timeout(REVOCATION_TIMEOUT, self.http.get(&url).send()).await.ok()?.ok()?;
        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "revocation sync returned non-200");
            return None;
        }
        match response.json::<RevocationListResponse>().await {
            Ok(body) => Some(body),
            Err(e) => {
                tracing::warn!(error = %e, "revocation sync decode failed");
                None
            }
        }
    }

    /// Push unsynced decision records. Returns how many the master
    /// accepted, or `None` on failure (caller keeps them unsynced).
    pub async fn flush_ledger(&self, records: &[DecisionRecord]) -> Option<usize> {
        if records.is_empty() {
            return Some(0);
        }
        let url = format!("{}/ancestor/bulk-record", self.base_url);
        let body = BulkRecordRequest { gateway_id: &self.gateway_id, decisions: records };
        let response = tokio::time::timeout(FLUSH_TIMEOUT, self.http.post(&url).json(&body).send()).await.ok()?.ok()?;
        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "ledger flush returned non-200");
            return None;
        }
        match response.json::<BulkRecordResponse>().await {
            Ok(body) => Some(body.accepted.len()),
            Err(e) => {
                tracing::warn!(error = %e, "ledger flush decode failed");
                None
            }
        }
    }
}
