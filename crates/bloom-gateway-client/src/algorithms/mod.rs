//! # Algorithms Module
//!
//! Pure, synchronous steps around the fan-out: owner selection,
//! partitioning and result merging.

pub mod merge;
pub mod partition;
pub mod shard_assignment;

pub use merge::{merge_chunk_sets, merge_series, normalize_refs};
pub use partition::{partition_blocks, PartitionPlan};
pub use shard_assignment::{assign_owner, hash_key, jump_consistent_hash};
