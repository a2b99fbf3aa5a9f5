//! Results Cache Adapter
//!
//! Memoizes filter responses per request. The cache key is the SHA-256 of
//! the bincode encoded request, so identical requests to any gateway share
//! an entry.
//!
//! Entries hold the decoded response in process memory and are never
//! compressed; a hit returns a clone with no decode step.

use crate::domain::{CacheConfig, GatewayError};
use crate::metrics::ClientMetrics;
use crate::ports::outbound::{
    BloomGatewayClient, FilterChunkRefRequest, FilterChunkRefResponse, HealthStatus,
};
use async_trait::async_trait;
use lru::LruCache;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::trace;

/// Cache key.
pub type CacheKey = [u8; 32];

struct CacheEntry {
    response: FilterChunkRefResponse,
    inserted_at: Instant,
}

/// Bounded LRU of filter responses with a fixed time to live.
pub struct ResultsCache {
    entries: Mutex<LruCache<CacheKey, CacheEntry>>,
    ttl: Duration,
}

impl ResultsCache {
    /// Create a cache from its configuration.
    pub fn new(config: &CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl: config.ttl,
        }
    }

    /// Key of `request`, or `None` if it cannot be encoded.
    pub fn key(request: &FilterChunkRefRequest) -> Option<CacheKey> {
        let encoded = bincode::serialize(request).ok()?;
        Some(Sha256::digest(&encoded).into())
    }

    /// Fresh cached response for `key`. Expired entries are evicted.
    pub fn get(&self, key: &CacheKey) -> Option<FilterChunkRefResponse> {
        let mut entries = self.entries.lock();
        let expired = match entries.get(key) {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => {
                return Some(entry.response.clone())
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            entries.pop(key);
        }
        None
    }

    /// Store a response.
    pub fn put(&self, key: CacheKey, response: FilterChunkRefResponse) {
        self.entries.lock().put(
            key,
            CacheEntry {
                response,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Number of entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// True when the cache holds no entry.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

/// Gateway client decorator answering repeated requests from a
/// [`ResultsCache`]. Failed responses are never cached.
pub struct CachingGatewayClient {
    inner: Arc<dyn BloomGatewayClient>,
    cache: Arc<ResultsCache>,
    metrics: Arc<ClientMetrics>,
}

impl CachingGatewayClient {
    /// Wrap `inner`.
    pub fn new(
        inner: Arc<dyn BloomGatewayClient>,
        cache: Arc<ResultsCache>,
        metrics: Arc<ClientMetrics>,
    ) -> Self {
        Self {
            inner,
            cache,
            metrics,
        }
    }
}

#[async_trait]
impl BloomGatewayClient for CachingGatewayClient {
    async fn filter_chunk_refs(
        &self,
        request: FilterChunkRefRequest,
    ) -> Result<FilterChunkRefResponse, GatewayError> {
        let Some(key) = ResultsCache::key(&request) else {
            return self.inner.filter_chunk_refs(request).await;
        };

        if let Some(response) = self.cache.get(&key) {
            trace!("bloom gateway results cache hit");
            self.metrics.record_cache_lookup(true);
            return Ok(response);
        }
        self.metrics.record_cache_lookup(false);

        let response = self.inner.filter_chunk_refs(request).await?;
        self.cache.put(key, response.clone());
        Ok(response)
    }

    async fn health_check(&self) -> Result<HealthStatus, GatewayError> {
        self.inner.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::in_memory::InMemoryBloomGateway;
    use crate::domain::{ChunkGroup, ChunkRef, Interval, QueryPlan};

    fn request(fp: u64) -> FilterChunkRefRequest {
        FilterChunkRefRequest::new(
            Interval::new(0, 1_000),
            vec![ChunkGroup::new(fp, "tenant-a", vec![ChunkRef::new(0, 10, 7)])],
            vec!["block-a".to_string()],
            QueryPlan::new("{app=\"foo\"}"),
        )
    }

    fn config(ttl: Duration) -> CacheConfig {
        CacheConfig {
            max_entries: 2,
            ttl,
        }
    }

    #[test]
    fn test_key_is_stable_and_request_sensitive() {
        assert_eq!(ResultsCache::key(&request(1)), ResultsCache::key(&request(1)));
        assert_ne!(ResultsCache::key(&request(1)), ResultsCache::key(&request(2)));
    }

    #[test]
    fn test_lru_eviction() {
        let cache = ResultsCache::new(&config(Duration::from_secs(60)));
        for fp in 1..=3 {
            let key = ResultsCache::key(&request(fp)).unwrap();
            cache.put(key, FilterChunkRefResponse::default());
        }

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&ResultsCache::key(&request(1)).unwrap()).is_none());
        assert!(cache.get(&ResultsCache::key(&request(3)).unwrap()).is_some());
    }

    #[test]
    fn test_hit_returns_stored_response_unchanged() {
        let cache = ResultsCache::new(&config(Duration::from_secs(60)));
        let key = ResultsCache::key(&request(1)).unwrap();
        let response = FilterChunkRefResponse {
            chunk_refs: request(1).refs,
        };
        cache.put(key, response.clone());

        assert_eq!(cache.get(&key), Some(response.clone()));
        assert_eq!(cache.get(&key), Some(response));
    }

    #[test]
    fn test_expired_entry_is_evicted() {
        let cache = ResultsCache::new(&config(Duration::from_millis(1)));
        let key = ResultsCache::key(&request(1)).unwrap();
        cache.put(key, FilterChunkRefResponse::default());

        std::thread::sleep(Duration::from_millis(5));

        assert!(cache.get(&key).is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_repeated_request_is_served_from_cache() {
        let gateway = Arc::new(InMemoryBloomGateway::new());
        let metrics = Arc::new(ClientMetrics::new());
        let client = CachingGatewayClient::new(
            gateway.clone(),
            Arc::new(ResultsCache::new(&config(Duration::from_secs(60)))),
            metrics.clone(),
        );

        let first = client.filter_chunk_refs(request(1)).await.unwrap();
        let second = client.filter_chunk_refs(request(1)).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(gateway.request_count(), 1);
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.cache_hits, 1);
        assert_eq!(snapshot.cache_misses, 1);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let gateway = Arc::new(InMemoryBloomGateway::new());
        gateway.set_failing(true);
        let cache = Arc::new(ResultsCache::new(&config(Duration::from_secs(60))));
        let client = CachingGatewayClient::new(
            gateway.clone(),
            cache.clone(),
            Arc::new(ClientMetrics::new()),
        );

        assert!(client.filter_chunk_refs(request(1)).await.is_err());
        assert!(cache.is_empty());

        gateway.set_failing(false);
        assert!(client.filter_chunk_refs(request(1)).await.is_ok());
        assert_eq!(gateway.request_count(), 2);
    }
}
