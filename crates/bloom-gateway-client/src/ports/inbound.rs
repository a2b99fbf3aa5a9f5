//! # Inbound Ports
//!
//! API trait defining what the bloom gateway client can do.

use crate::domain::{BlockAssignment, ChunkGroup, GatewayError, Interval, QueryPlan};
use crate::service::CallContext;
use async_trait::async_trait;

/// Chunk filtering API - inbound port.
#[async_trait]
pub trait FilterChunksApi: Send + Sync {
    /// Filter the chunks of every block through its owning gateway.
    ///
    /// Returns one group per fingerprint, sorted ascending. Gateways that
    /// cannot be reached contribute their input unfiltered. Fails only on
    /// routing errors or when `ctx` is cancelled or times out. An empty
    /// block list returns an empty result without any RPC.
    async fn filter_chunks(
        &self,
        ctx: &CallContext,
        tenant: &str,
        interval: Interval,
        blocks: Vec<BlockAssignment>,
        plan: QueryPlan,
    ) -> Result<Vec<ChunkGroup>, GatewayError>;
}
