//! # Shard Assignment Algorithm
//!
//! Deterministic owner selection using jump consistent hashing.
//!
//! Reference: Lamping & Veach, "A Fast, Minimal Memory, Consistent Hash
//! Algorithm" (2014).

use std::io::Cursor;

/// Hash a routing key to 64 bits.
///
/// MurmurHash3 x64-128 with seed 0, lower 64 bits.
pub fn hash_key(key: &str) -> u64 {
    let mut cursor = Cursor::new(key.as_bytes());
    murmur3::murmur3_x64_128(&mut cursor, 0).unwrap_or(0) as u64
}

/// Jump consistent hash.
///
/// Maps `key` to a bucket in `0..num_buckets`. Growing the bucket count
/// from N to N+1 moves only ~1/(N+1) of the keys, all into the new bucket.
/// Returns `None` when there are no buckets.
pub fn jump_consistent_hash(mut key: u64, num_buckets: usize) -> Option<usize> {
    if num_buckets == 0 {
        return None;
    }

    let mut b: i64 = -1;
    let mut j: i64 = 0;
    while j < num_buckets as i64 {
        b = j;
        key = key.wrapping_mul(2_862_933_555_777_941_757).wrapping_add(1);
        j = ((b + 1) as f64 * ((1i64 << 31) as f64 / ((key >> 33) + 1) as f64)) as i64;
    }

    Some(b as usize)
}

/// Pick the owning address of `key` from an ordered address list.
pub fn assign_owner<'a>(key: &str, addresses: &'a [String]) -> Option<&'a String> {
    jump_consistent_hash(hash_key(key), addresses.len()).map(|idx| &addresses[idx])
}
