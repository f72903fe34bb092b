//! Sentinel-Policy: versioned policy bundle distribution (C3) and the
//! pure, offline local policy enforcer (C4).

pub mod bundle;
pub mod enforcer;
pub mod rule;
pub mod store;

pub use bundle::{diff_bundles, BundleDiff, EdgeBundle, PolicyBundle};
pub use enforcer::{EnforcerVerdict, EvaluationRequest, LocalPolicyEnforcer, Verdict};
pub use rule::{OnFail, PolicyRule, KNOWN_RULE_TYPES};
pub use store::{PolicyError, PolicyStore};
