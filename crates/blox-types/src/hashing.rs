//! # Hashing
//!
//! Keccak-256, the single digest primitive used by the engine for role ids,
//! operation types, domain separators, and signed message digests.

use crate::value_objects::Hash;
use sha3::{Digest, Keccak256};

/// Keccak-256 hash of `data`.
#[must_use]
pub fn keccak256(data: &[u8]) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    Hash(out)
}

/// Keccak-256 over the concatenation of several chunks.
///
/// Equivalent to hashing the chunks' concatenation without allocating it.
#[must_use]
pub fn keccak256_concat(chunks: &[&[u8]]) -> Hash {
    let mut hasher = Keccak256::new();
    for chunk in chunks {
        hasher.update(chunk);
    }
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    Hash(out)
}
