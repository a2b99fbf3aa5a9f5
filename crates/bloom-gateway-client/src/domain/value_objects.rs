//! # Domain Value Objects
//!
//! Immutable value types exchanged with bloom gateways.

use super::errors::Fingerprint;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference to a single chunk of a series.
///
/// Ordered by `(from, through, checksum)`. The derived order is the
/// comparable-value order used for merging and deduplication.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChunkRef {
    /// Chunk start time (milliseconds).
    pub from: i64,
    /// Chunk end time (milliseconds).
    pub through: i64,
    /// Chunk checksum.
    pub checksum: u32,
}

impl ChunkRef {
    /// Create a new chunk reference.
    pub fn new(from: i64, through: i64, checksum: u32) -> Self {
        Self {
            from,
            through,
            checksum,
        }
    }

    /// Strict-less comparison under the comparable-value order.
    pub fn less(&self, other: &ChunkRef) -> bool {
        self < other
    }
}

/// Chunk references of one series, grouped by fingerprint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkGroup {
    /// Series fingerprint.
    pub fingerprint: Fingerprint,
    /// Owning tenant.
    pub tenant: String,
    /// Chunk references of the series.
    pub refs: Vec<ChunkRef>,
}

impl ChunkGroup {
    /// Create a new chunk group.
    pub fn new(fingerprint: Fingerprint, tenant: impl Into<String>, refs: Vec<ChunkRef>) -> Self {
        Self {
            fingerprint,
            tenant: tenant.into(),
            refs,
        }
    }

    /// Check that refs are strictly ascending (sorted, no duplicates).
    pub fn has_normalized_refs(&self) -> bool {
        self.refs.windows(2).all(|w| w[0] < w[1])
    }
}

/// Time bounds of a query, forwarded unmodified to every shard.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Interval {
    /// Inclusive start (milliseconds).
    pub start: i64,
    /// End (milliseconds).
    pub end: i64,
}

impl Interval {
    /// Create a new interval.
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }
}

/// Handle of a bloom block, used as the routing key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockRef(String);

impl BlockRef {
    /// Create a block reference from its string form.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// String form of the block reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlockRef {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for BlockRef {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Opaque query plan understood by the gateway server.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct QueryPlan {
    /// Serialized plan (query AST).
    pub ast: String,
}

impl QueryPlan {
    /// Create a plan from its serialized form.
    pub fn new(ast: impl Into<String>) -> Self {
        Self { ast: ast.into() }
    }
}
