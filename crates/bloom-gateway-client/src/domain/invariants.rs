//! # Domain Invariants
//!
//! Rules that must hold for every merged filter result.

use super::value_objects::{ChunkGroup, ChunkRef};

/// Invariant: output is sorted strictly ascending by fingerprint.
///
/// Strictly ascending implies at most one entry per fingerprint.
pub fn invariant_unique_sorted_fingerprints(groups: &[ChunkGroup]) -> bool {
    groups
        .windows(2)
        .all(|w| w[0].fingerprint < w[1].fingerprint)
}

/// Invariant: chunk refs are sorted and duplicate free.
pub fn invariant_normalized_refs(refs: &[ChunkRef]) -> bool {
    refs.windows(2).all(|w| w[0] < w[1])
}

/// Invariant: routing is deterministic.
///
/// Same key + same address set = same owner.
pub fn invariant_deterministic_owner<F>(owner_fn: F, key: &str) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    let first = owner_fn(key);
    let second = owner_fn(key);
    first == second
}
