//! Sentinel-Sync: the edge gateway's control-plane sync client and
//! background engine (C6).

pub mod client;
pub mod engine;

pub use client::{ControlPlaneSyncClient, RevocationListResponse};
pub use engine::{backoff_delay, SyncEngine, SyncMode, TickReport};
