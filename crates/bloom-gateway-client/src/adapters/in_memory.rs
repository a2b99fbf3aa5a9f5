//! In-Memory Gateway Adapters
//!
//! Implement the `BloomGatewayClient` and `GatewayConnector` ports without a
//! network. A gateway drops the chunk refs it was told to reject; everything
//! else passes through, so results are easy to predict in tests.

use crate::domain::{ChunkRef, GatewayError};
use crate::ports::outbound::{
    BloomGatewayClient, FilterChunkRefRequest, FilterChunkRefResponse, GatewayConnector,
    HealthStatus,
};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// In-memory bloom gateway.
pub struct InMemoryBloomGateway {
    /// Chunk refs reported as filtered out.
    rejected: RwLock<HashSet<ChunkRef>>,
    /// Fail every call with a shard RPC error.
    failing: AtomicBool,
    /// Reported health status.
    health: RwLock<HealthStatus>,
    /// Artificial latency per filter call.
    delay: RwLock<Option<Duration>>,
    /// Filter calls received, including failed ones.
    requests: AtomicU64,
    /// Last request received.
    last_request: RwLock<Option<FilterChunkRefRequest>>,
}

impl Default for InMemoryBloomGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBloomGateway {
    /// Create a gateway that rejects nothing.
    pub fn new() -> Self {
        Self {
            rejected: RwLock::new(HashSet::new()),
            failing: AtomicBool::new(false),
            health: RwLock::new(HealthStatus::Serving),
            delay: RwLock::new(None),
            requests: AtomicU64::new(0),
            last_request: RwLock::new(None),
        }
    }

    /// Filter out `chunk` from every response.
    pub fn reject(&self, chunk: ChunkRef) {
        self.rejected.write().insert(chunk);
    }

    /// Make every call fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Status returned by health checks.
    pub fn set_health(&self, status: HealthStatus) {
        *self.health.write() = status;
    }

    /// Delay every filter call.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.write() = Some(delay);
    }

    /// Number of filter calls received.
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::SeqCst)
    }

    /// Last filter request received.
    pub fn last_request(&self) -> Option<FilterChunkRefRequest> {
        self.last_request.read().clone()
    }

    fn rpc_error(&self, reason: &str) -> GatewayError {
        GatewayError::ShardRpc {
            addr: "in-memory".to_string(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl BloomGatewayClient for InMemoryBloomGateway {
    async fn filter_chunk_refs(
        &self,
        request: FilterChunkRefRequest,
    ) -> Result<FilterChunkRefResponse, GatewayError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        *self.last_request.write() = Some(request.clone());

        let delay = *self.delay.read();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.load(Ordering::SeqCst) {
            return Err(self.rpc_error("gateway unavailable"));
        }

        let rejected = self.rejected.read();
        let chunk_refs = request
            .refs
            .into_iter()
            .filter_map(|mut group| {
                group.refs.retain(|r| !rejected.contains(r));
                (!group.refs.is_empty()).then_some(group)
            })
            .collect();

        Ok(FilterChunkRefResponse { chunk_refs })
    }

    async fn health_check(&self) -> Result<HealthStatus, GatewayError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(self.rpc_error("health check failed"));
        }
        Ok(*self.health.read())
    }
}

/// Connector resolving addresses to registered in-memory gateways.
pub struct InMemoryConnector {
    gateways: RwLock<HashMap<String, Arc<InMemoryBloomGateway>>>,
    dials: AtomicU64,
}

impl Default for InMemoryConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryConnector {
    /// Create a connector with no reachable address.
    pub fn new() -> Self {
        Self {
            gateways: RwLock::new(HashMap::new()),
            dials: AtomicU64::new(0),
        }
    }

    /// Make `gateway` reachable at `addr`.
    pub fn register(&self, addr: impl Into<String>, gateway: Arc<InMemoryBloomGateway>) {
        self.gateways.write().insert(addr.into(), gateway);
    }

    /// Make `addr` unreachable.
    pub fn unregister(&self, addr: &str) {
        self.gateways.write().remove(addr);
    }

    /// Number of connect attempts, successful or not.
    pub fn dial_count(&self) -> u64 {
        self.dials.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GatewayConnector for InMemoryConnector {
    async fn connect(&self, addr: &str) -> Result<Arc<dyn BloomGatewayClient>, GatewayError> {
        self.dials.fetch_add(1, Ordering::SeqCst);

        match self.gateways.read().get(addr) {
            Some(gateway) => {
                debug!(addr, "connected to in-memory bloom gateway");
                Ok(Arc::clone(gateway) as Arc<dyn BloomGatewayClient>)
            }
            None => Err(GatewayError::Connection {
                addr: addr.to_string(),
                reason: "connection refused".to_string(),
            }),
        }
    }
}
