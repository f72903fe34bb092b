//! Canonical JSON hashing.
//!
//! Bundles and decision records are hashed over a canonical encoding:
//! JSON with keys sorted lexicographically at every level, no
//! insignificant whitespace, UTC ISO-8601 timestamps to millisecond
//! precision. Any deviation changes the hash and invalidates chain
//! linkage, so this is the single place that encoding happens.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Recursively sort object keys so two structurally-equal values always
/// serialize byte-for-byte identically regardless of field insertion order.
fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sorted: Vec<(String, Value)> = map.into_iter().map(|(k, v)| (k, sort_keys(v))).collect();
            sorted.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(sorted.into_iter().collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

/// Canonicalize a serializable payload to a compact, key-sorted JSON string.
pub fn canonicalize<T: Serialize>(payload: &T) -> String {
    let value = serde_json::to_value(payload).expect("payload must serialize to JSON");
    let sorted = sort_keys(value);
    serde_json::to_string(&sorted).expect("sorted value must serialize")
}

/// SHA-256 of the canonical encoding of `payload`, as a lowercase hex string.
pub fn canonical_sha256<T: Serialize>(payload: &T) -> String {
    let canonical = canonicalize(payload);
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// SHA-256 of raw bytes, as a lowercase hex string.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
