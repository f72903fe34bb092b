//! Master ledger (C5, cloud half): ingests gateway batches, re-chains
//! them against its own tip, and dedupes by record id within a
//! retention window.

use crate::local::ChainVerification;
use crate::record::DecisionRecord;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

const DEDUPE_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectedRecord {
    pub id: String,
    pub gateway_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResult {
    pub accepted: Vec<DecisionRecord>,
    pub rejected: Vec<RejectedRecord>,
}

struct Inner {
    records: Vec<DecisionRecord>,
    /// (record id, first-seen time) for the dedupe window. Entries
    /// older than `DEDUPE_WINDOW_DAYS` are pruned lazily on ingest.
    seen_ids: Vec<(String, DateTime<Utc>)>,
}

/// The control plane's master decision ledger. Preserves each
/// gateway's intra-batch order; total order across gateways is by
/// arrival at ingest time.
pub struct MasterLedger {
    inner: Mutex<Inner>,
}

impl Default for MasterLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MasterLedger {
    pub fn new() -> Self {
        Self { inner: Mutex::new(Inner { records: Vec::new(), seen_ids: Vec::new() }) }
    }

    /// Ingest a batch of local records from one gateway, in their
    /// original local order. Each record's submitted `hash` must
    /// recompute against its own fields and `prev_hash`; on success the
    /// record is re-chained against the master tip (its local hash is
    /// preserved as provenance, not as the new chain key).
    pub fn bulk_ingest(&self, gateway_id: &str, records: Vec<DecisionRecord>) -> IngestResult {
        let mut inner = self.inner.lock();
        prune_expired(&mut inner.seen_ids);

        let mut accepted = Vec::new();
        let mut rejected = Vec::new();

        for mut record in records {
            if record.recompute_hash() != record.hash {
                rejected.push(RejectedRecord { id: record.id.clone(), gateway_id: gateway_id.to_string(), reason: "hash mismatch".to_string() });
                continue;
            }
            if inner.seen_ids.iter().any(|(id, _)| id == &record.id) {
                // duplicate submission within the dedupe window: no-op, not a rejection
                continue;
            }

            let master_prev_hash = inner.records.last().map(|r| r.hash.clone()).unwrap_or_default();
            record.local_hash = Some(record.hash.clone());
            record.prev_hash = master_prev_hash.clone();
            record.hash = DecisionRecord::compute_hash(&record.id, &record.agent_id, &record.action_type, record.verdict, record.amount, record.environment, record.timestamp, &master_prev_hash);

            inner.seen_ids.push((record.id.clone(), Utc::now()));
            inner.records.push(record.clone());
            accepted.push(record);
        }

        tracing::info!(gateway_id, accepted = accepted.len(), rejected = rejected.len(), "master ledger bulk ingest");
        IngestResult { accepted, rejected }
    }

    pub fn verify_chain(&self, agent_id: Option<&str>, limit: Option<usize>) -> ChainVerification {
        let inner = self.inner.lock();
        let records: Vec<&DecisionRecord> = inner
            .records
            .iter()
            .filter(|r| agent_id.map(|a| r.agent_id == a).unwrap_or(true))
            .collect();
        let records: Vec<&DecisionRecord> = match limit {
            Some(n) => records.into_iter().take(n).collect(),
            None => records,
        };

        let mut broken_at = None;
        let mut broken_count = 0usize;
        let mut prev_hash = "";
        for (i, record) in records.iter().enumerate() {
            let hash_ok = record.recompute_hash() == record.hash;
            let link_ok = i == 0 || record.prev_hash == prev_hash;
            if !hash_ok || !link_ok {
                broken_count += 1;
                if broken_at.is_none() {
                    broken_at = Some(record.id.clone());
                }
            }
            prev_hash = &record.hash;
        }

        let checked = records.len();
        let integrity_pct = if checked == 0 { 100.0 } else { 100.0 * (checked - broken_count) as f64 / checked as f64 };

        ChainVerification { valid: broken_count == 0, checked, broken_at, integrity_pct }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn prune_expired(seen: &mut Vec<(String, DateTime<Utc>)>) {
    let cutoff = Utc::now() - Duration::days(DEDUPE_WINDOW_DAYS);
    seen.retain(|(_, seen_at)| *seen_at >= cutoff);
}
