//! Sentinel-Ledger: the hash-chained decision ledger (C5), local
//! per-gateway and master.

pub mod local;
pub mod master;
pub mod record;

pub use local::{ChainVerification, LedgerError, LocalLedger};
pub use master::{IngestResult, MasterLedger, RejectedRecord};
pub use record::{DecisionRecord, DecisionRecordInput, Verdict};
