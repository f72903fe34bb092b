//! Sentinel-Passport: the passport identity subsystem (C1) and the
//! revocation registry (C2).
//!
//! A passport is a signed credential carrying an agent's identity and
//! governance claims. It is verifiable offline: the signature check
//! uses only the public key, and the revocation check is against a
//! locally held snapshot — no network call is ever made on the hot path.

pub mod dna;
pub mod revocation;
pub mod service;
pub mod token;

pub use dna::compute_dna_fingerprint;
pub use revocation::RevocationRegistry;
pub use service::{PassportData, PassportService, VerifyError};
pub use token::SigningAlgorithm;
