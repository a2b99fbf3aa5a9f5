//! # Gateway Client
//!
//! Long-lived entry point owning the router, the connection pool and the
//! background maintenance loop.
//!
//! ## Call Flow
//!
//! ```text
//! filter_chunks ──► partition (one router snapshot)
//!               ──► scatter-gather (one task per address, fail-open)
//!               ──► merge-dedup
//! ```
//!
//! ## Maintenance Loop
//!
//! Every `pool.check_interval` the loop refreshes discovery, swaps the
//! router snapshot if the address set changed, evicts clients of departed
//! addresses and, when enabled, health-checks the remaining ones.

use super::context::CallContext;
use super::executor::ScatterGather;
use super::pool::ConnectionPool;
use super::router::{RouterSnapshot, ShardRouter};
use crate::adapters::cache::ResultsCache;
use crate::adapters::discovery::DnsAddressProvider;
use crate::algorithms::{merge_series, partition_blocks};
use crate::domain::{
    BlockAssignment, ChunkGroup, ClientConfig, GatewayError, Interval, PoolConfig, QueryPlan,
};
use crate::metrics::{ClientMetrics, MetricsSnapshot};
use crate::ports::{AddressProvider, FilterChunksApi, GatewayConnector};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

struct Maintenance {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Shared state touched by the maintenance loop.
#[derive(Clone)]
struct Topology {
    discovery: Arc<dyn AddressProvider>,
    router: Arc<ShardRouter>,
    pool: Arc<ConnectionPool>,
    pool_config: PoolConfig,
}

impl Topology {
    async fn refresh(&self) {
        if let Err(err) = self.discovery.refresh().await {
            warn!(
                err = %err,
                "bloom gateway discovery refresh failed, keeping previous addresses"
            );
        }

        let addresses = self.discovery.addresses();
        if self.router.update(addresses.clone()) {
            info!(
                count = addresses.len(),
                addresses = ?addresses,
                "bloom gateway addresses changed"
            );
        }

        let removed = self.pool.remove_stale(&addresses);
        if removed > 0 {
            debug!(removed, "removed stale bloom gateway clients");
        }

        if self.pool_config.health_check_enabled {
            let evicted = self
                .pool
                .health_check_all(self.pool_config.health_check_timeout)
                .await;
            if evicted > 0 {
                warn!(evicted, "evicted unhealthy bloom gateway clients");
            }
        }
    }

    async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.pool_config.check_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately; construction already refreshed.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    debug!("bloom gateway maintenance loop stopped");
                    return;
                }
                _ = ticker.tick() => self.refresh().await,
            }
        }
    }
}

/// Bloom gateway client.
pub struct GatewayClient {
    topology: Topology,
    executor: ScatterGather,
    metrics: Arc<ClientMetrics>,
    maintenance: Mutex<Option<Maintenance>>,
}

impl GatewayClient {
    /// Build a client from its collaborators.
    ///
    /// Validates `config` and performs one discovery refresh. A failed
    /// refresh is logged and the client starts with whatever addresses
    /// discovery holds; the maintenance loop fills them in later. The loop
    /// is not started here; see [`GatewayClient::start`].
    pub async fn new(
        config: ClientConfig,
        connector: Arc<dyn GatewayConnector>,
        discovery: Arc<dyn AddressProvider>,
    ) -> Result<Self, GatewayError> {
        config.validate()?;
        if let Err(err) = discovery.refresh().await {
            warn!(err = %err, "initial bloom gateway discovery refresh failed");
        }

        let metrics = Arc::new(ClientMetrics::new());
        let router = Arc::new(ShardRouter::new(discovery.addresses()));

        let mut pool = ConnectionPool::new(connector, Arc::clone(&metrics));
        if config.cache_results {
            pool = pool.with_results_cache(Arc::new(ResultsCache::new(&config.cache)));
        }
        let pool = Arc::new(pool);

        info!(
            addresses = router.snapshot().len(),
            cache_results = config.cache_results,
            "bloom gateway client created"
        );

        Ok(Self {
            topology: Topology {
                discovery,
                router,
                pool: Arc::clone(&pool),
                pool_config: config.pool,
            },
            executor: ScatterGather::new(pool, Arc::clone(&metrics)),
            metrics,
            maintenance: Mutex::new(None),
        })
    }

    /// Build a client resolving the configured addresses through DNS.
    pub async fn from_config(
        config: ClientConfig,
        connector: Arc<dyn GatewayConnector>,
    ) -> Result<Self, GatewayError> {
        let entries = config.address_entries()?;
        let discovery = Arc::new(DnsAddressProvider::new(entries));
        Self::new(config, connector, discovery).await
    }

    /// Launch the maintenance loop. Calling it again while running is a
    /// no-op. Must be called from within a Tokio runtime.
    pub fn start(&self) {
        let mut maintenance = self.maintenance.lock();
        if maintenance.is_some() {
            return;
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(self.topology.clone().run(shutdown_rx));
        *maintenance = Some(Maintenance {
            shutdown_tx,
            handle,
        });
        debug!("bloom gateway maintenance loop started");
    }

    /// Stop the maintenance loop, wait for it to exit and stop discovery.
    pub async fn stop(&self) {
        let maintenance = self.maintenance.lock().take();

        if let Some(Maintenance {
            shutdown_tx,
            handle,
        }) = maintenance
        {
            if let Err(e) = shutdown_tx.send(true) {
                error!("Failed to send shutdown signal: {}", e);
            }
            if let Err(e) = handle.await {
                error!(err = %e, "bloom gateway maintenance loop failed");
            }
        }

        self.topology.discovery.stop();
        info!("bloom gateway client stopped");
    }

    /// True while the maintenance loop runs.
    pub fn is_running(&self) -> bool {
        self.maintenance.lock().is_some()
    }

    /// Run one maintenance pass immediately.
    pub async fn refresh(&self) {
        self.topology.refresh().await;
    }

    /// Current router snapshot.
    pub fn addresses(&self) -> Arc<RouterSnapshot> {
        self.topology.router.snapshot()
    }

    /// Number of cached gateway clients.
    pub fn pool_size(&self) -> usize {
        self.topology.pool.len()
    }

    /// Metrics snapshot.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

impl Drop for GatewayClient {
    fn drop(&mut self) {
        if let Some(maintenance) = self.maintenance.get_mut().take() {
            let _ = maintenance.shutdown_tx.send(true);
        }
    }
}

#[async_trait]
impl FilterChunksApi for GatewayClient {
    async fn filter_chunks(
        &self,
        ctx: &CallContext,
        tenant: &str,
        interval: Interval,
        blocks: Vec<BlockAssignment>,
        plan: QueryPlan,
    ) -> Result<Vec<ChunkGroup>, GatewayError> {
        if blocks.is_empty() {
            return Ok(Vec::new());
        }

        let span = info_span!(
            "filter_chunks",
            call_id = %Uuid::new_v4(),
            tenant,
            blocks = blocks.len()
        );

        async move {
            let snapshot = self.topology.router.snapshot();
            let partition = partition_blocks(blocks, |block| snapshot.owner(block.as_str()))?;

            if let Some(range) = partition.fingerprint_range {
                debug!(
                    min_fp = range.min,
                    max_fp = range.max,
                    shards = partition.units.len(),
                    series = partition.series_count(),
                    "partitioned filter request"
                );
            }

            let gathered = self
                .executor
                .execute(ctx, interval, &plan, partition.units)
                .await?;
            let (inputs, capacity_hint) = gathered.into_merge_inputs();
            Ok(merge_series(inputs, capacity_hint))
        }
        .instrument(span)
        .await
    }
}
