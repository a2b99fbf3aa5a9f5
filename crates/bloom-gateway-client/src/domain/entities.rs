//! # Domain Entities
//!
//! Per-call aggregates built while partitioning a filter request.

use super::errors::{Address, Fingerprint};
use super::value_objects::{BlockRef, ChunkGroup};

/// A bloom block paired with the series it may need to filter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockAssignment {
    /// Block identifier, used as the routing key.
    pub block: BlockRef,
    /// Series groups to check against the block.
    pub series: Vec<ChunkGroup>,
}

impl BlockAssignment {
    /// Create a new block assignment.
    pub fn new(block: impl Into<BlockRef>, series: Vec<ChunkGroup>) -> Self {
        Self {
            block: block.into(),
            series,
        }
    }
}

/// Work routed to a single gateway replica within one call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShardWorkUnit {
    /// Destination address.
    pub addr: Address,
    /// Block identifiers routed to `addr`.
    pub blocks: Vec<String>,
    /// Concatenated series groups of all routed blocks.
    pub groups: Vec<ChunkGroup>,
}

impl ShardWorkUnit {
    /// Create an empty unit for an address.
    pub fn new(addr: impl Into<Address>) -> Self {
        Self {
            addr: addr.into(),
            blocks: Vec::new(),
            groups: Vec::new(),
        }
    }

    /// Append one block and its series.
    pub fn push(&mut self, block: &BlockRef, series: Vec<ChunkGroup>) {
        self.blocks.push(block.to_string());
        self.groups.extend(series);
    }

    /// Sort groups ascending by fingerprint.
    pub fn sort_groups(&mut self) {
        self.groups.sort_by_key(|g| g.fingerprint);
    }
}

/// Smallest and largest fingerprint seen across a call's inputs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FingerprintRange {
    /// Smallest fingerprint.
    pub min: Fingerprint,
    /// Largest fingerprint.
    pub max: Fingerprint,
}

impl FingerprintRange {
    /// Range covering a single fingerprint.
    pub fn point(fp: Fingerprint) -> Self {
        Self { min: fp, max: fp }
    }

    /// Widen the range to include `fp`.
    pub fn include(&mut self, fp: Fingerprint) {
        self.min = self.min.min(fp);
        self.max = self.max.max(fp);
    }
}
