//! # Scatter-Gather Executor
//!
//! Sends one filter request per shard concurrently and collects the
//! responses. Shard failures fail open: the shard's unfiltered input stands
//! in for its response.

use super::context::CallContext;
use super::pool::ConnectionPool;
use crate::domain::{
    Address, ChunkGroup, GatewayError, Interval, OrchestrationError, QueryPlan, ShardWorkUnit,
};
use crate::metrics::{ClientMetrics, RequestOutcome};
use crate::ports::FilterChunkRefRequest;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, Instrument, Span};

/// Result of one shard.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShardResult {
    /// Shard address.
    pub addr: Address,
    /// Filtered groups, or the unfiltered input on failure.
    pub groups: Vec<ChunkGroup>,
    /// Whether the gateway answered.
    pub outcome: RequestOutcome,
}

/// Fan-out output, one result per unit in unit order.
#[derive(Clone, Debug, Default)]
pub struct GatherResult {
    /// Per-shard results.
    pub shards: Vec<ShardResult>,
    /// Total number of groups across shards. Only sizes the merge buffer.
    pub capacity_hint: usize,
}

impl GatherResult {
    /// Split into per-shard group lists and the capacity hint.
    pub fn into_merge_inputs(self) -> (Vec<Vec<ChunkGroup>>, usize) {
        let inputs = self.shards.into_iter().map(|s| s.groups).collect();
        (inputs, self.capacity_hint)
    }
}

/// Runs shard work units against the connection pool.
#[derive(Clone)]
pub struct ScatterGather {
    pool: Arc<ConnectionPool>,
    metrics: Arc<ClientMetrics>,
}

impl ScatterGather {
    /// Create an executor.
    pub fn new(pool: Arc<ConnectionPool>, metrics: Arc<ClientMetrics>) -> Self {
        Self { pool, metrics }
    }

    /// Run every unit concurrently.
    ///
    /// Fails only when `ctx` is cancelled or expires, or a shard task dies.
    /// In-flight shard calls are aborted in both cases.
    pub async fn execute(
        &self,
        ctx: &CallContext,
        interval: Interval,
        plan: &QueryPlan,
        units: Vec<ShardWorkUnit>,
    ) -> Result<GatherResult, GatewayError> {
        let mut slots: Vec<Option<ShardResult>> = vec![None; units.len()];
        let mut tasks = JoinSet::new();

        for (idx, unit) in units.into_iter().enumerate() {
            let this = self.clone();
            let plan = plan.clone();
            tasks.spawn(
                async move { (idx, this.run_shard(interval, plan, unit).await) }
                    .instrument(Span::current()),
            );
        }

        loop {
            tokio::select! {
                biased;
                err = ctx.done() => {
                    tasks.abort_all();
                    return Err(err);
                }
                joined = tasks.join_next() => match joined {
                    None => break,
                    Some(Ok((idx, result))) => slots[idx] = Some(result),
                    Some(Err(join_err)) => {
                        return Err(OrchestrationError::TaskFailed(join_err.to_string()).into());
                    }
                },
            }
        }

        let shards: Vec<ShardResult> = slots.into_iter().flatten().collect();
        let capacity_hint = shards.iter().map(|s| s.groups.len()).sum();
        Ok(GatherResult {
            shards,
            capacity_hint,
        })
    }

    async fn run_shard(
        &self,
        interval: Interval,
        plan: QueryPlan,
        mut unit: ShardWorkUnit,
    ) -> ShardResult {
        unit.sort_groups();
        let addr = unit.addr;
        let series = unit.groups.len();
        let blocks = unit.blocks.len();
        let request = FilterChunkRefRequest::new(interval, unit.groups, unit.blocks, plan);

        let candidates = [addr.clone()];
        let result = self
            .pool
            .try_in_order(&candidates, |client| {
                let request = request.clone();
                async move { client.filter_chunk_refs(request).await }
            })
            .await;

        match result {
            Ok(response) => {
                self.metrics.record_request(RequestOutcome::Success);
                ShardResult {
                    addr,
                    groups: response.chunk_refs,
                    outcome: RequestOutcome::Success,
                }
            }
            Err(err) => {
                error!(
                    addr = %addr,
                    series,
                    blocks,
                    err = %err,
                    "filter failed for instance, skipping"
                );
                self.metrics.record_request(RequestOutcome::Error);
                ShardResult {
                    addr,
                    groups: request.refs,
                    outcome: RequestOutcome::Error,
                }
            }
        }
    }
}
