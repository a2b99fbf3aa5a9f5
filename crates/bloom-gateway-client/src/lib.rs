//! # Bloom Gateway Client
//!
//! Sharded client for a fleet of bloom gateway replicas.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! Route chunk-filter requests to the gateway that owns each bloom block,
//! run them concurrently and merge the answers:
//! - Jump consistent hashing over a sorted address snapshot
//! - Lazy per-address connections with ordered fallback
//! - Fail-open fan-out: a failed shard returns its input unfiltered
//! - K-way merge with per-fingerprint chunk deduplication
//!
//! ## Failure Semantics
//!
//! | Failure | Effect |
//! |---------|--------|
//! | Empty address set | Call fails (`Routing`) |
//! | Dial error | Shard fails open |
//! | RPC error | Shard fails open |
//! | Cancellation / deadline | Call fails (`Orchestration`) |
//!
//! ## Module Structure
//!
//! ```text
//! bloom-gateway-client/
//! ├── domain/          # Core types: ChunkGroup, ChunkRef, config, errors
//! ├── algorithms/      # Owner selection, partitioning, merge-dedup
//! ├── ports/           # API trait + collaborator traits
//! ├── service/         # Router, pool, scatter-gather, GatewayClient
//! └── adapters/        # Discovery, results cache, in-memory gateways
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod domain;
pub mod metrics;
pub mod ports;
pub mod service;

// Re-exports
pub use adapters::{
    CachingGatewayClient, DnsAddressProvider, InMemoryBloomGateway, InMemoryConnector,
    ResultsCache, StaticAddressProvider,
};
pub use algorithms::{
    assign_owner, hash_key, jump_consistent_hash, merge_chunk_sets, merge_series,
    normalize_refs, partition_blocks, PartitionPlan,
};
pub use domain::{
    invariant_deterministic_owner, invariant_normalized_refs,
    invariant_unique_sorted_fingerprints, Address, AddressEntry, BlockAssignment, BlockRef,
    CacheConfig, ChunkGroup, ChunkRef, ClientConfig, ClientConfigBuilder, Fingerprint,
    FingerprintRange, GatewayError, Interval, OrchestrationError, PoolConfig, QueryPlan,
    ShardWorkUnit,
};
pub use metrics::{ClientMetrics, MetricsSnapshot, RequestOutcome};
pub use ports::{
    AddressProvider, BloomGatewayClient, FilterChunkRefRequest, FilterChunkRefResponse,
    FilterChunksApi, GatewayConnector, HealthStatus,
};
pub use service::{
    CallContext, ConnectionPool, GatewayClient, RouterSnapshot, ScatterGather, ShardResult,
    ShardRouter,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
