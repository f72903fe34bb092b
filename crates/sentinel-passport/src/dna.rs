//! DNA fingerprint computation.
//!
//! A privacy-preserving hash of an agent's dominant capability genes —
//! proves capability without exposing raw gene data.

use sentinel_core::canonical::sha256_hex;
use serde::{Deserialize, Serialize};

/// A single gene considered for fingerprinting. Only genes with
/// `strength >= 0.85` ("dominant") contribute to the fingerprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gene {
    pub gene_name: String,
    pub gene_type: String,
    pub strength: f64,
}

const DOMINANCE_THRESHOLD: f64 = 0.85;

/// Compute the DNA fingerprint: SHA-256 of a canonically-sorted list of
/// `(gene_name, gene_type, round(strength, 2))` triples for dominant
/// genes, or `SHA-256("no-genes")` if there are none.
pub fn compute_dna_fingerprint(genes: &[Gene]) -> String {
    let mut dominant: Vec<String> = genes
        .iter()
        .filter(|g| g.strength >= DOMINANCE_THRESHOLD)
        .map(|g| format!("{}:{}:{:.2}", g.gene_name, g.gene_type, g.strength))
        .collect();

    if dominant.is_empty() {
        return sha256_hex(b"no-genes");
    }

    dominant.sort();
    let payload = serde_json::to_string(&dominant).expect("string vec always serializes");
    sha256_hex(payload.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_genes_hash_to_no_genes_marker() {
        assert_eq!(compute_dna_fingerprint(&[]), sha256_hex(b"no-genes"));
    }

    #[test]
    fn only_dominant_genes_contribute() {
        let genes = vec![
            Gene { gene_name: "settle".into(), gene_type: "strategy".into(), strength: 0.95 },
            Gene { gene_name: "weak".into(), gene_type: "strategy".into(), strength: 0.40 },
        ];
        let with_weak = compute_dna_fingerprint(&genes);
        let without_weak = compute_dna_fingerprint(&genes[..1]);
        assert_eq!(with_weak, without_weak);
    }

    #[test]
    fn fingerprint_is_deterministic_and_order_independent() {
        let a = vec![
            Gene { gene_name: "a".into(), gene_type: "x".into(), strength: 0.9 },
            Gene { gene_name: "b".into(), gene_type: "y".into(), strength: 0.9 },
        ];
        let b = vec![a[1].clone(), a[0].clone()];
        assert_eq!(compute_dna_fingerprint(&a), compute_dna_fingerprint(&b));
    }

    #[test]
    fn strength_rounds_to_two_decimals() {
        let a = vec![Gene { gene_name: "a".into(), gene_type: "x".into(), strength: 0.901 }];
        let b = vec![Gene { gene_name: "a".into(), gene_type: "x".into(), strength: 0.904 }];
        assert_eq!(compute_dna_fingerprint(&a), compute_dna_fingerprint(&b));
    }
}
