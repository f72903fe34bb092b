//! Sync Engine (C6): the edge's only background task with outbound
//! network access. Runs at `SYNC_INTERVAL_SECONDS`, pulling policy and
//! revocation updates and pushing unsynced ledger batches.

use crate::client::ControlPlaneSyncClient;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use sentinel_core::types::Environment;
use sentinel_ledger::LocalLedger;
use sentinel_passport::RevocationRegistry;
use sentinel_policy::LocalPolicyEnforcer;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

const MAX_FLUSH_BATCH: usize = 500;
const MAX_BACKOFF: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    Online,
    Degraded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickReport {
    pub policies_updated: bool,
    pub revocations_updated: bool,
    pub flushed: usize,
    pub mode: SyncMode,
}

struct EngineState {
    mode: SyncMode,
    last_sync_at: Option<DateTime<Utc>>,
    last_revocation_snapshot: Option<u64>,
    consecutive_failures: u32,
}

/// Computes the exponential backoff delay for the nth consecutive
/// failure, capped at 5 minutes.
pub fn backoff_delay(consecutive_failures: u32) -> Duration {
    let secs = 2u64.saturating_pow(consecutive_failures.min(32)).saturating_mul(1);
    Duration::from_secs(secs.min(MAX_BACKOFF.as_secs())).max(Duration::from_secs(1)).min(MAX_BACKOFF)
}

/// Parse the `vYYYY.MM.DD-NNN` version format into a `(date, sequence)`
/// key that orders correctly even across month/year boundaries.
fn parse_version(version: &str) -> Option<(i64, u32)> {
    let body = version.strip_prefix('v')?;
    let (date_part, seq_part) = body.split_once('-')?;
    let mut fields = date_part.split('.');
    let year: i64 = fields.next()?.parse().ok()?;
    let month: i64 = fields.next()?.parse().ok()?;
    let day: i64 = fields.next()?.parse().ok()?;
    if fields.next().is_some() {
        return None;
    }
    let seq: u32 = seq_part.parse().ok()?;
    Some((year * 10_000 + month * 100 + day, seq))
}

/// Is `candidate` strictly newer than `current`? Falls back to a plain
/// string comparison for versions outside the `vYYYY.MM.DD-NNN` format
/// (e.g. hand-assigned versions in tests and manual publishes).
fn version_is_newer(candidate: &str, current: &str) -> bool {
    match (parse_version(candidate), parse_version(current)) {
        (Some(c), Some(cur)) => c > cur,
        _ => candidate > current,
    }
}

/// The edge gateway's C6 instance. Shares the enforcer, revocation
/// registry, and ledger with the authorize pipeline via `Arc`.
pub struct SyncEngine {
    client: ControlPlaneSyncClient,
    enforcer: Arc<RwLock<LocalPolicyEnforcer>>,
    revocation: Arc<RevocationRegistry>,
    ledger: Arc<LocalLedger>,
    environment: Environment,
    state: RwLock<EngineState>,
}

impl SyncEngine {
    pub fn new(client: ControlPlaneSyncClient, enforcer: Arc<RwLock<LocalPolicyEnforcer>>, revocation: Arc<RevocationRegistry>, ledger: Arc<LocalLedger>, environment: Environment) -> Self {
        Self {
            client,
            enforcer,
            revocation,
            ledger,
            environment,
            state: RwLock::new(EngineState { mode: SyncMode::Degraded, last_sync_at: None, last_revocation_snapshot: None, consecutive_failures: 0 }),
        }
    }

    pub fn mode(&self) -> SyncMode {
        self.state.read().mode
    }

    pub fn last_sync_at(&self) -> Option<DateTime<Utc>> {
        self.state.read().last_sync_at
    }

    /// Run one sync tick: pull policies, pull revocations, flush the
    /// ledger. A failure at the policy or revocation step marks the
    /// engine degraded; the enforcer/revocation set keep serving their
    /// last-known-good state either way.
    pub async fn tick(&self) -> TickReport {
        let env_str = self.environment.as_str();

        let policies_updated = match self.client.pull_policies(env_str).await {
            Some(bundle) => {
                let is_newer = {
                    let enforcer = self.enforcer.read();
                    version_is_newer(&bundle.version, enforcer.policy_version())
                };
                let should_swap = is_newer && bundle.verify_integrity();
                if is_newer && !should_swap {
                    tracing::warn!(version = %bundle.version, "rejecting policy bundle: hash verification failed");
                }
                if should_swap {
                    self.enforcer.write().load_bundle(bundle);
                }
                Some(should_swap)
            }
            None => None,
        };

        let since = self.state.read().last_revocation_snapshot;
        let revocations_updated = match self.client.pull_revocations(since).await {
            Some(response) => {
                for jti in &response.revoked_jtis {
                    self.revocation.add(jti.clone());
                }
                self.state.write().last_revocation_snapshot = Some(response.snapshot_id);
                Some(true)
            }
            None => None,
        };

        let step_failed = policies_updated.is_none() || revocations_updated.is_none();

        let unsynced = self.ledger.unsynced();
        let batch: Vec<_> = unsynced.into_iter().take(MAX_FLUSH_BATCH).collect();
        let flushed = if batch.is_empty() {
            0
        } else {
            match self.client.flush_ledger(&batch).await {
                Some(count) => {
                    self.ledger.mark_synced(count);
                    count
                }
                None => 0,
            }
        };

        let mut state = self.state.write();
        if step_failed {
            state.mode = SyncMode::Degraded;
            state.consecutive_failures += 1;
        } else {
            state.mode = SyncMode::Online;
            state.consecutive_failures = 0;
            state.last_sync_at = Some(Utc::now());
        }

        TickReport {
            policies_updated: policies_updated.unwrap_or(false),
            revocations_updated: revocations_updated.unwrap_or(false),
            flushed,
            mode: state.mode,
        }
    }

    /// Run ticks forever at `interval`, backing off exponentially
    /// (capped at 5 minutes) after consecutive failures. Exits when
    /// `shutdown` resolves; finishes the in-flight tick first so any
    /// buffered flush completes rather than being dropped mid-write.
    pub async fn run(&self, interval: Duration, mut shutdown: tokio::sync::oneshot::Receiver<()>) {
        loop {
            let report = self.tick().await;
            let failures = self.state.read().consecutive_failures;
            let wait = if failures > 0 { backoff_delay(failures) } else { interval };
            tracing::debug!(?report, wait_secs = wait.as_secs(), "sync tick complete");

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = &mut shutdown => {
                    tracing::info!("sync engine shutting down");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_exponentially_and_caps() {
        assert_eq!(backoff_delay(0), Duration::from_secs(1));
        assert_eq!(backoff_delay(1), Duration::from_secs(2));
        assert_eq!(backoff_delay(2), Duration::from_secs(4));
        assert_eq!(backoff_delay(10), Duration::from_secs(300));
        assert_eq!(backoff_delay(40), Duration::from_secs(300));
    }

    #[test]
    fn version_ordering_respects_date_and_sequence() {
        assert!(version_is_newer("v2026.07.27-002", "v2026.07.27-001"));
        assert!(version_is_newer("v2026.08.01-001", "v2026.07.27-999"));
        assert!(!version_is_newer("v2026.07.27-001", "v2026.07.27-001"));
        assert!(!version_is_newer("v2026.07.27-001", "v2026.07.27-002"));
    }

    #[test]
    fn version_ordering_falls_back_to_string_compare_for_hand_assigned_versions() {
        assert!(version_is_newer("v2", "v1"));
        assert!(version_is_newer("v2", "0"));
        assert!(!version_is_newer("v1", "v1"));
    }
}
