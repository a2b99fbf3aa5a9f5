//! # Merge-Dedup Engine
//!
//! Combines per-shard filter responses into one result sorted by
//! fingerprint, unioning the chunk refs of series that appear in more than
//! one response.

use crate::domain::{ChunkGroup, ChunkRef, Fingerprint};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Merge and deduplicate per-shard results.
///
/// Every input list is sorted by fingerprint (stable) before a k-way heap
/// merge. Consecutive entries sharing a fingerprint are combined pairwise.
/// `capacity_hint` only sizes the output buffer.
///
/// # Complexity
/// O(n log k) for the heap merge, plus O(|a| + |b|) per pairwise union.
pub fn merge_series(inputs: Vec<Vec<ChunkGroup>>, capacity_hint: usize) -> Vec<ChunkGroup> {
    let mut sources: Vec<std::iter::Peekable<std::vec::IntoIter<ChunkGroup>>> =
        Vec::with_capacity(inputs.len());
    for mut input in inputs {
        input.sort_by_key(|g| g.fingerprint);
        sources.push(input.into_iter().peekable());
    }

    // Min-heap: (fingerprint, source index)
    let mut heap: BinaryHeap<Reverse<(Fingerprint, usize)>> =
        BinaryHeap::with_capacity(sources.len());
    for (idx, source) in sources.iter_mut().enumerate() {
        if let Some(first) = source.peek() {
            heap.push(Reverse((first.fingerprint, idx)));
        }
    }

    let mut output: Vec<ChunkGroup> = Vec::with_capacity(capacity_hint);

    while let Some(Reverse((_, idx))) = heap.pop() {
        let Some(group) = sources[idx].next() else {
            continue;
        };
        if let Some(next) = sources[idx].peek() {
            heap.push(Reverse((next.fingerprint, idx)));
        }

        match output.last_mut() {
            Some(last) if last.fingerprint == group.fingerprint => combine_groups(last, group),
            _ => {
                let mut group = group;
                normalize_refs(&mut group.refs);
                output.push(group);
            }
        }
    }

    output
}

/// Fold `other` into `acc`, which shares its fingerprint.
///
/// `acc` keeps its tenant; its refs must already be normalized.
fn combine_groups(acc: &mut ChunkGroup, other: ChunkGroup) {
    let mut refs = other.refs;
    normalize_refs(&mut refs);
    acc.refs = merge_chunk_sets(&acc.refs, &refs);
}

/// Sort refs if they are not already sorted, then drop duplicates.
pub fn normalize_refs(refs: &mut Vec<ChunkRef>) {
    if !refs.is_sorted() {
        refs.sort_unstable();
    }
    refs.dedup();
}

/// Union of two sorted ref lists, emitting each distinct ref once.
pub fn merge_chunk_sets(s1: &[ChunkRef], s2: &[ChunkRef]) -> Vec<ChunkRef> {
    let mut result = Vec::with_capacity(s1.len().max(s2.len()));
    let mut push_unique = |r: ChunkRef| {
        if result.last() != Some(&r) {
            result.push(r);
        }
    };

    let (mut i, mut j) = (0, 0);
    while i < s1.len() && j < s2.len() {
        let (a, b) = (s1[i], s2[j]);
        if a == b {
            push_unique(a);
            i += 1;
            j += 1;
        } else if a.less(&b) {
            push_unique(a);
            i += 1;
        } else {
            push_unique(b);
            j += 1;
        }
    }

    for r in &s1[i..] {
        push_unique(*r);
    }
    for r in &s2[j..] {
        push_unique(*r);
    }

    result
}
