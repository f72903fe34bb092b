//! Sentinel-Core: shared domain types for the governance control plane.
//!
//! Every other `sentinel-*` crate depends on this one for the types that
//! cross component boundaries: tiers, environments, canonical hashing,
//! and process configuration.

pub mod canonical;
pub mod config;
pub mod types;

pub use canonical::canonical_sha256;
pub use config::Config;
pub use types::{AgentClaims, Environment, Tier};
