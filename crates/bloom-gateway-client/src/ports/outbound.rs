//! # Outbound Ports
//!
//! Traits for external collaborators: the filter RPC, connection
//! establishment and endpoint discovery.

use crate::domain::{Address, ChunkGroup, GatewayError, Interval, QueryPlan};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Filter request sent to one gateway.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterChunkRefRequest {
    /// Query start (milliseconds).
    pub from: i64,
    /// Query end (milliseconds).
    pub through: i64,
    /// Series to check, sorted ascending by fingerprint.
    pub refs: Vec<ChunkGroup>,
    /// Blocks to filter against.
    pub blocks: Vec<String>,
    /// Opaque query plan.
    pub plan: QueryPlan,
}

impl FilterChunkRefRequest {
    /// Build a request for one shard.
    pub fn new(
        interval: Interval,
        refs: Vec<ChunkGroup>,
        blocks: Vec<String>,
        plan: QueryPlan,
    ) -> Self {
        Self {
            from: interval.start,
            through: interval.end,
            refs,
            blocks,
            plan,
        }
    }
}

/// Filter response returned by one gateway.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterChunkRefResponse {
    /// Subset of the requested series with possibly fewer refs each.
    pub chunk_refs: Vec<ChunkGroup>,
}

/// Result of a health probe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HealthStatus {
    /// The gateway accepts requests.
    Serving,
    /// The gateway is up but refuses requests.
    NotServing,
}

/// Filter RPC client of a single gateway - outbound port.
#[async_trait]
pub trait BloomGatewayClient: Send + Sync {
    /// Filter chunk refs against the requested blocks.
    async fn filter_chunk_refs(
        &self,
        request: FilterChunkRefRequest,
    ) -> Result<FilterChunkRefResponse, GatewayError>;

    /// Probe the gateway.
    async fn health_check(&self) -> Result<HealthStatus, GatewayError>;
}

/// Dials gateway addresses - outbound port.
#[async_trait]
pub trait GatewayConnector: Send + Sync {
    /// Establish a client for `addr`.
    async fn connect(&self, addr: &str) -> Result<Arc<dyn BloomGatewayClient>, GatewayError>;
}

/// Endpoint discovery - outbound port.
#[async_trait]
pub trait AddressProvider: Send + Sync {
    /// Current address snapshot.
    fn addresses(&self) -> Vec<Address>;

    /// Re-resolve the configured addresses.
    ///
    /// On failure the previous snapshot stays in place.
    async fn refresh(&self) -> Result<(), GatewayError>;

    /// Release discovery resources.
    fn stop(&self) {}
}
