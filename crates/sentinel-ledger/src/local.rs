//! Local, per-gateway hash-chained ledger (C5, local half).
//!
//! Single-writer discipline: all appends go through one lock so
//! `prev_hash` is never read stale under concurrency.

use crate::record::{DecisionRecord, DecisionRecordInput};
use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("failed to append record")]
    AppendFailed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainVerification {
    pub valid: bool,
    pub checked: usize,
    pub broken_at: Option<String>,
    pub integrity_pct: f64,
}

struct Inner {
    records: Vec<DecisionRecord>,
    synced_count: usize,
}

/// One gateway's append-only decision ledger.
pub struct LocalLedger {
    gateway_id: String,
    inner: Mutex<Inner>,
}

impl LocalLedger {
    pub fn new(gateway_id: impl Into<String>) -> Self {
        Self { gateway_id: gateway_id.into(), inner: Mutex::new(Inner { records: Vec::new(), synced_count: 0 }) }
    }

    /// Append a new record, chaining it to the current tip. Holds the
    /// lock for the full read-tip + compute-hash + push sequence so
    /// concurrent appends never observe a stale tip.
    pub fn append(&self, input: DecisionRecordInput) -> Result<DecisionRecord, LedgerError> {
        let mut inner = self.inner.lock();
        let prev_hash = inner.records.last().map(|r| r.hash.clone()).unwrap_or_default();
        let id = Uuid::new_v4().to_string();
        let timestamp = Utc::now();
        let hash = DecisionRecord::compute_hash(&id, &input.agent_id, &input.action_type, record_verdict(&input), input.amount, input.environment, timestamp, &prev_hash);

        let record = DecisionRecord {
            id,
            agent_id: input.agent_id,
            action_type: input.action_type,
            resource: input.resource,
            amount: input.amount,
            currency: input.currency,
            environment: input.environment,
            verdict: input.verdict,
            reason: input.reason,
            passport_jti: input.passport_jti,
            gateway_id: input.gateway_id,
            timestamp,
            input_context: input.input_context,
            reasoning_trace: input.reasoning_trace,
            prophecy_paths: input.prophecy_paths,
            prev_hash,
            hash,
            local_hash: None,
        };

        inner.records.push(record.clone());
        tracing::info!(id = %record.id, verdict = ?record.verdict, gateway = %self.gateway_id, "decision record appended");
        Ok(record)
    }

    /// Records not yet flushed to the control plane, oldest first.
    pub fn unsynced(&self) -> Vec<DecisionRecord> {
        let inner = self.inner.lock();
        inner.records[inner.synced_count..].to_vec()
    }

    /// Mark the first `count` unsynced records as flushed.
    pub fn mark_synced(&self, count: usize) {
        let mut inner = self.inner.lock();
        inner.synced_count = (inner.synced_count + count).min(inner.records.len());
    }

    pub fn len(&self) -> usize {
        self.inner.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Walk the chain in insertion order, checking each record's hash
    /// and its link to the previous one. Verification does not stop at
    /// the first break, so `integrity_pct` reflects the whole chain.
    pub fn verify_chain(&self, limit: Option<usize>, agent_id: Option<&str>) -> ChainVerification {
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
}

fn record_verdict(input: &DecisionRecordInput) -> crate::record::Verdict {
    input.verdict
}
