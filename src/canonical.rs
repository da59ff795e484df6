//! Canonical serialization for deterministic hashing.
//!
//! Table fingerprints and run ids are xxh64 hashes over compact JSON.
//!
//! ## Determinism Guarantees
//!
//! - Stable field order: struct fields serialize in declaration order
//! - Stable Vec order: vectors serialize in index order
//! - No HashMap allowed: use BTreeMap for maps in hashed data

use serde::Serialize;
use xxhash_rust::xxh64::xxh64;

/// Serialize a value to canonical JSON bytes for hashing.
///
/// Values that cannot be represented as JSON (maps with non-string keys)
/// hash as the empty byte string.
pub fn to_canonical_bytes<T: Serialize + ?Sized>(value: &T) -> Vec<u8> {
    match serde_json::to_vec(value) {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(error = %err, "value has no canonical JSON form");
            Vec::new()
        }
    }
}

/// Compute canonical hash of a serializable value.
pub fn canonical_hash<T: Serialize + ?Sized>(value: &T) -> u64 {
    xxh64(&to_canonical_bytes(value), 0)
}

/// Compute canonical hash and return as hex string.
pub fn canonical_hash_hex<T: Serialize + ?Sized>(value: &T) -> String {
    format!("{:016x}", canonical_hash(value))
}

/// Order-independent fingerprint of a table of rows.
///
/// Each row is hashed on its own and the sorted row hashes are hashed
/// again, so two tables holding the same rows in a different order share
/// a fingerprint.
pub fn table_fingerprint<T: Serialize>(rows: &[T]) -> String {
    let mut hashes: Vec<u64> = rows.iter().map(canonical_hash).collect();
    hashes.sort_unstable();
    canonical_hash_hex(&hashes)
}
