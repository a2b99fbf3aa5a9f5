//! # Service Layer
//!
//! Stateful components behind the `FilterChunksApi`: the shard router,
//! the connection pool, the scatter-gather executor and the client that
//! ties them together.

pub mod client;
pub mod context;
pub mod executor;
pub mod pool;
pub mod router;

pub use client::GatewayClient;
pub use context::CallContext;
pub use executor::{GatherResult, ScatterGather, ShardResult};
pub use pool::ConnectionPool;
pub use router::{RouterSnapshot, ShardRouter};
