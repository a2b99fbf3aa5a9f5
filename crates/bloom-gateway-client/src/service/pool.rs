//! # Connection Pool
//!
//! Lazily dials gateway addresses, caches one client per address and
//! tries candidates in order until one answers.

use crate::adapters::cache::{CachingGatewayClient, ResultsCache};
use crate::domain::{Address, GatewayError};
use crate::metrics::ClientMetrics;
use crate::ports::{BloomGatewayClient, GatewayConnector, HealthStatus};
use futures::future::join_all;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Per-address client cache.
pub struct ConnectionPool {
    connector: Arc<dyn GatewayConnector>,
    clients: RwLock<HashMap<Address, Arc<dyn BloomGatewayClient>>>,
    results_cache: Option<Arc<ResultsCache>>,
    metrics: Arc<ClientMetrics>,
}

impl ConnectionPool {
    /// Create an empty pool.
    pub fn new(connector: Arc<dyn GatewayConnector>, metrics: Arc<ClientMetrics>) -> Self {
        Self {
            connector,
            clients: RwLock::new(HashMap::new()),
            results_cache: None,
            metrics,
        }
    }

    /// Wrap every new client with a shared results cache.
    pub fn with_results_cache(mut self, cache: Arc<ResultsCache>) -> Self {
        self.results_cache = Some(cache);
        self
    }

    /// Cached client for `addr`, dialing it on first use.
    pub async fn client_for(
        &self,
        addr: &str,
    ) -> Result<Arc<dyn BloomGatewayClient>, GatewayError> {
        if let Some(client) = self.clients.read().get(addr) {
            return Ok(Arc::clone(client));
        }

        let mut client = self.connector.connect(addr).await?;
        if let Some(cache) = &self.results_cache {
            client = Arc::new(CachingGatewayClient::new(
                client,
                Arc::clone(cache),
                Arc::clone(&self.metrics),
            ));
        }

        let mut clients = self.clients.write();
        // Another task may have dialed the same address meanwhile.
        let client = Arc::clone(clients.entry(addr.to_string()).or_insert(client));
        self.metrics.set_clients(clients.len());
        debug!(addr, "created bloom gateway client");
        Ok(client)
    }

    /// Run `f` against each address in turn until one succeeds.
    ///
    /// Returns the last error when every candidate fails.
    pub async fn try_in_order<T, F, Fut>(
        &self,
        addrs: &[Address],
        mut f: F,
    ) -> Result<T, GatewayError>
    where
        F: FnMut(Arc<dyn BloomGatewayClient>) -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        let mut last_err = GatewayError::Connection {
            addr: String::new(),
            reason: "no candidate addresses".to_string(),
        };

        for addr in addrs {
            let client = match self.client_for(addr).await {
                Ok(client) => client,
                Err(err) => {
                    error!(addr = %addr, err = %err, "failed to get client for instance");
                    last_err = err;
                    continue;
                }
            };

            match f(client).await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    error!(addr = %addr, err = %err, "client do failed for instance");
                    last_err = err;
                }
            }
        }

        Err(last_err)
    }

    /// Drop clients whose address is no longer live.
    ///
    /// Returns the number of removed clients.
    pub fn remove_stale(&self, live: &[Address]) -> usize {
        let live: HashSet<&str> = live.iter().map(String::as_str).collect();
        let mut clients = self.clients.write();
        let before = clients.len();

        clients.retain(|addr, _| {
            let keep = live.contains(addr.as_str());
            if !keep {
                debug!(addr = %addr, "removing stale bloom gateway client");
            }
            keep
        });

        self.metrics.set_clients(clients.len());
        before - clients.len()
    }

    /// Probe every cached client and evict the ones that fail.
    ///
    /// Returns the number of evicted clients.
    pub async fn health_check_all(&self, timeout: Duration) -> usize {
        let snapshot: Vec<(Address, Arc<dyn BloomGatewayClient>)> = self
            .clients
            .read()
            .iter()
            .map(|(addr, client)| (addr.clone(), Arc::clone(client)))
            .collect();

        let probes = snapshot.into_iter().map(|(addr, client)| async move {
            let healthy = match tokio::time::timeout(timeout, client.health_check()).await {
                Ok(Ok(HealthStatus::Serving)) => true,
                Ok(Ok(HealthStatus::NotServing)) => {
                    warn!(addr = %addr, "bloom gateway not serving");
                    false
                }
                Ok(Err(err)) => {
                    warn!(addr = %addr, err = %err, "bloom gateway health check failed");
                    false
                }
                Err(_) => {
                    warn!(addr = %addr, ?timeout, "bloom gateway health check timed out");
                    false
                }
            };
            (addr, healthy)
        });

        let unhealthy: Vec<Address> = join_all(probes)
            .await
            .into_iter()
            .filter(|(_, healthy)| !healthy)
            .map(|(addr, _)| addr)
            .collect();

        if unhealthy.is_empty() {
            return 0;
        }

        let mut clients = self.clients.write();
        let removed = unhealthy
            .iter()
            .filter(|addr| clients.remove(addr.as_str()).is_some())
            .count();
        self.metrics.set_clients(clients.len());
        removed
    }

    /// Number of cached clients.
    pub fn len(&self) -> usize {
        self.clients.read().len()
    }

    /// True when no client is cached.
    pub fn is_empty(&self) -> bool {
        self.clients.read().is_empty()
    }
}
