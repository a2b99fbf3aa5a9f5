//! Metrics for bloom gateway client operations
//!
//! Counters are updated with relaxed atomics and never gate behaviour.
//!
//! ## Usage
//!
//! ```ignore
//! use bloom_gateway_client::metrics::{ClientMetrics, RequestOutcome};
//!
//! let metrics = ClientMetrics::new();
//! metrics.record_request(RequestOutcome::Success);
//! assert_eq!(metrics.snapshot().requests_success, 1);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

/// Outcome of one shard request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestOutcome {
    /// The gateway filtered the shard.
    Success,
    /// The shard fell back to its unfiltered input.
    Error,
}

/// Metrics collector for the bloom gateway client
#[derive(Default)]
pub struct ClientMetrics {
    /// Shard requests answered by a gateway
    pub requests_success: AtomicU64,
    /// Shard requests that failed open
    pub requests_error: AtomicU64,
    /// Cached gateway clients (gauge)
    pub clients: AtomicU64,
    /// Filter responses served from the results cache
    pub cache_hits: AtomicU64,
    /// Filter requests that missed the results cache
    pub cache_misses: AtomicU64,
}

impl ClientMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of one shard request
    pub fn record_request(&self, outcome: RequestOutcome) {
        match outcome {
            RequestOutcome::Success => self.requests_success.fetch_add(1, Ordering::Relaxed),
            RequestOutcome::Error => self.requests_error.fetch_add(1, Ordering::Relaxed),
        };
    }

    /// Set the number of cached clients
    pub fn set_clients(&self, count: usize) {
        self.clients.store(count as u64, Ordering::Relaxed);
    }

    /// Record a results cache lookup
    pub fn record_cache_lookup(&self, hit: bool) {
        if hit {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.cache_misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_success: self.requests_success.load(Ordering::Relaxed),
            requests_error: self.requests_error.load(Ordering::Relaxed),
            clients: self.clients.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time metrics snapshot
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Shard requests answered by a gateway
    pub requests_success: u64,
    /// Shard requests that failed open
    pub requests_error: u64,
    /// Cached gateway clients
    pub clients: u64,
    /// Results cache hits
    pub cache_hits: u64,
    /// Results cache misses
    pub cache_misses: u64,
}
