//! Canonical serialization for deterministic hashing.
//!
//! The kernel promises byte-identical output for identical input; the
//! functions here turn any serializable artifact (an options set, an
//! emitted diagram, a comparison table) into a stable hash that tests and
//! callers can compare across runs.
//!
//! ## Determinism Guarantees
//!
//! - Stable field order: struct fields serialize in declaration order
//! - Stable Vec order: vectors serialize in index order
//! - No HashMap allowed: use BTreeMap for maps in hashed data

use serde::Serialize;
use xxhash_rust::xxh64::xxh64;

/// Serialize a value to canonical JSON bytes for hashing.
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> Vec<u8> {
    serde_json::to_vec(value).expect("canonical serialization failed")
}

/// Compute the canonical hash of a serializable value.
pub fn canonical_hash<T: Serialize>(value: &T) -> u64 {
    let bytes = to_canonical_bytes(value);
    xxh64(&bytes, 0)
}

/// Compute the canonical hash and return it as a hex string.
pub fn canonical_hash_hex<T: Serialize>(value: &T) -> String {
    format!("{:016x}", canonical_hash(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Row {
        witness: String,
        agreements: u32,
    }

    #[test]
    fn test_hash_determinism() {
        let row = Row {
            witness: "A".to_string(),
            agreements: 12,
        };
        assert_eq!(canonical_hash(&row), canonical_hash(&row));
    }

    #[test]
    fn test_hash_sensitivity() {
        let a = Row {
            witness: "A".to_string(),
            agreements: 12,
        };
        let b = Row {
            witness: "A".to_string(),
            agreements: 13,
        };
        assert_ne!(canonical_hash_hex(&a), canonical_hash_hex(&b));
    }
}
