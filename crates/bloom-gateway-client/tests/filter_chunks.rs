//! # End-to-End Tests for the Bloom Gateway Client
//!
//! Drive `GatewayClient::filter_chunks` through in-memory gateways.
//!
//! ## Test Categories
//!
//! 1. **Merge** - overlapping shards, sorted unique output
//! 2. **Fail-Open** - failing and unreachable gateways
//! 3. **Call Failures** - routing, cancellation, deadline
//! 4. **Lifecycle** - refresh loop, stale and unhealthy clients, results cache

use bloom_gateway_client::{
    invariant_normalized_refs, invariant_unique_sorted_fingerprints, Address, BlockAssignment,
    CallContext, ChunkGroup, ChunkRef, ClientConfig, ClientConfigBuilder, FilterChunksApi,
    GatewayClient, GatewayError, HealthStatus, InMemoryBloomGateway, InMemoryConnector,
    Interval, OrchestrationError, QueryPlan, RouterSnapshot, StaticAddressProvider,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// =============================================================================
// TEST HELPERS
// =============================================================================

const ADDR_1: &str = "10.0.0.1:9095";
const ADDR_2: &str = "10.0.0.2:9095";
const TENANT: &str = "tenant-a";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn c(n: u32) -> ChunkRef {
    ChunkRef::new(n as i64 * 1_000, n as i64 * 1_000 + 500, n)
}

fn group(fp: u64, refs: &[u32]) -> ChunkGroup {
    ChunkGroup::new(fp, TENANT, refs.iter().map(|n| c(*n)).collect())
}

fn interval() -> Interval {
    Interval::new(0, 100_000)
}

fn plan() -> QueryPlan {
    QueryPlan::new("{app=\"api\"} |= \"error\"")
}

fn config() -> ClientConfig {
    ClientConfigBuilder::new()
        .addresses(format!("{ADDR_1},{ADDR_2}"))
        .check_interval(Duration::from_millis(20))
        .build()
        .unwrap()
}

/// First block id in `block-0, block-1, ...` owned by `addr`.
fn block_owned_by(addr: &str, addresses: &[&str]) -> String {
    let snapshot = RouterSnapshot::new(addresses.iter().map(|a| a.to_string()).collect());
    (0..10_000)
        .map(|i| format!("bloom/table_19700/{TENANT}/blocks/block-{i}"))
        .find(|block| snapshot.owner(block).unwrap() == addr)
        .unwrap()
}

struct Fixture {
    client: Arc<GatewayClient>,
    connector: Arc<InMemoryConnector>,
    discovery: Arc<StaticAddressProvider>,
    gateway_1: Arc<InMemoryBloomGateway>,
    gateway_2: Arc<InMemoryBloomGateway>,
}

async fn fixture_with(config: ClientConfig) -> Fixture {
    init_tracing();

    let connector = Arc::new(InMemoryConnector::new());
    let gateway_1 = Arc::new(InMemoryBloomGateway::new());
    let gateway_2 = Arc::new(InMemoryBloomGateway::new());
    connector.register(ADDR_1, gateway_1.clone());
    connector.register(ADDR_2, gateway_2.clone());

    let discovery = Arc::new(StaticAddressProvider::new(vec![
        ADDR_1.to_string(),
        ADDR_2.to_string(),
    ]));
    let client = GatewayClient::new(config, connector.clone(), discovery.clone())
        .await
        .unwrap();

    Fixture {
        client: Arc::new(client),
        connector,
        discovery,
        gateway_1,
        gateway_2,
    }
}

async fn fixture() -> Fixture {
    fixture_with(config()).await
}

async fn wait_until<F: Fn() -> bool>(condition: F) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

// =============================================================================
// MERGE
// =============================================================================

#[tokio::test]
async fn test_overlapping_fingerprint_is_unioned_across_shards() {
    let f = fixture().await;
    let blocks = vec![
        BlockAssignment::new(block_owned_by(ADDR_1, &[ADDR_1, ADDR_2]), vec![group(10, &[1, 2])]),
        BlockAssignment::new(block_owned_by(ADDR_2, &[ADDR_1, ADDR_2]), vec![group(10, &[2, 3])]),
    ];

    let result = f
        .client
        .filter_chunks(&CallContext::new(), TENANT, interval(), blocks, plan())
        .await
        .unwrap();

    assert_eq!(result, vec![group(10, &[1, 2, 3])]);
    assert_eq!(f.gateway_1.request_count(), 1);
    assert_eq!(f.gateway_2.request_count(), 1);
    assert_eq!(f.client.metrics().requests_success, 2);
}

#[tokio::test]
async fn test_blocks_of_one_owner_share_one_request() {
    let f = fixture().await;
    let owned = block_owned_by(ADDR_1, &[ADDR_1, ADDR_2]);
    let blocks = vec![
        BlockAssignment::new(owned.clone(), vec![group(30, &[3])]),
        BlockAssignment::new(owned, vec![group(7, &[1])]),
    ];

    let result = f
        .client
        .filter_chunks(&CallContext::new(), TENANT, interval(), blocks, plan())
        .await
        .unwrap();

    assert_eq!(result, vec![group(7, &[1]), group(30, &[3])]);
    assert_eq!(f.gateway_1.request_count(), 1);
    assert_eq!(f.gateway_2.request_count(), 0);

    let request = f.gateway_1.last_request().unwrap();
    assert_eq!(request.blocks.len(), 2);
    assert_eq!(request.refs.iter().map(|g| g.fingerprint).collect::<Vec<_>>(), vec![7, 30]);
    assert_eq!(request.from, 0);
    assert_eq!(request.through, 100_000);
    assert_eq!(request.plan, plan());
}

#[tokio::test]
async fn test_filtered_output_is_sorted_and_unique() {
    let f = fixture().await;
    f.gateway_1.reject(c(4));
    f.gateway_2.reject(c(8));

    let mut blocks = Vec::new();
    for i in 0..20u64 {
        let refs: Vec<u32> = (0..10).filter(|n| (n + i as u32) % 3 != 0).collect();
        blocks.push(BlockAssignment::new(
            format!("bloom/table_19700/{TENANT}/blocks/block-{i}"),
            vec![group(i % 7, &refs), group(100 + i, &refs)],
        ));
    }

    let result = f
        .client
        .filter_chunks(&CallContext::new(), TENANT, interval(), blocks, plan())
        .await
        .unwrap();

    assert!(invariant_unique_sorted_fingerprints(&result));
    assert!(result.iter().all(|g| invariant_normalized_refs(&g.refs)));
    assert_eq!(result.len(), 27);
}

#[tokio::test]
async fn test_empty_input_issues_no_rpc() {
    let f = fixture().await;

    let result = f
        .client
        .filter_chunks(&CallContext::new(), TENANT, interval(), vec![], plan())
        .await
        .unwrap();

    assert!(result.is_empty());
    assert_eq!(f.connector.dial_count(), 0);
    assert_eq!(f.gateway_1.request_count() + f.gateway_2.request_count(), 0);
}

// =============================================================================
// FAIL-OPEN
// =============================================================================

#[tokio::test]
async fn test_failing_shard_returns_unfiltered_input() {
    let f = fixture().await;
    f.gateway_1.reject(c(2));
    f.gateway_2.set_failing(true);

    let blocks = vec![
        BlockAssignment::new(block_owned_by(ADDR_1, &[ADDR_1, ADDR_2]), vec![group(5, &[1, 2])]),
        BlockAssignment::new(block_owned_by(ADDR_2, &[ADDR_1, ADDR_2]), vec![group(20, &[4, 5])]),
    ];

    let result = f
        .client
        .filter_chunks(&CallContext::new(), TENANT, interval(), blocks, plan())
        .await
        .unwrap();

    assert_eq!(result, vec![group(5, &[1]), group(20, &[4, 5])]);

    let metrics = f.client.metrics();
    assert_eq!(metrics.requests_success, 1);
    assert_eq!(metrics.requests_error, 1);
}

#[tokio::test]
async fn test_unreachable_shard_fails_open() {
    let f = fixture().await;
    f.connector.unregister(ADDR_2);

    let blocks = vec![BlockAssignment::new(
        block_owned_by(ADDR_2, &[ADDR_1, ADDR_2]),
        vec![group(42, &[1, 2, 3])],
    )];

    let result = f
        .client
        .filter_chunks(&CallContext::new(), TENANT, interval(), blocks, plan())
        .await
        .unwrap();

    assert_eq!(result, vec![group(42, &[1, 2, 3])]);
    assert_eq!(f.client.metrics().requests_error, 1);
    assert_eq!(f.client.pool_size(), 0);
}

// =============================================================================
// CALL FAILURES
// =============================================================================

#[tokio::test]
async fn test_empty_address_set_fails_routing() {
    init_tracing();
    let connector = Arc::new(InMemoryConnector::new());
    let discovery = Arc::new(StaticAddressProvider::default());
    let client = GatewayClient::new(config(), connector.clone(), discovery)
        .await
        .unwrap();

    let result = client
        .filter_chunks(
            &CallContext::new(),
            TENANT,
            interval(),
            vec![BlockAssignment::new("block-a", vec![group(1, &[1])])],
            plan(),
        )
        .await;

    assert!(matches!(result, Err(GatewayError::Routing { .. })));
    assert_eq!(connector.dial_count(), 0);
}

#[tokio::test]
async fn test_cancelled_call_fails() {
    let f = fixture().await;
    let ctx = CallContext::new();
    ctx.cancel();

    let blocks = vec![BlockAssignment::new("block-a", vec![group(1, &[1])])];
    let result = f
        .client
        .filter_chunks(&ctx, TENANT, interval(), blocks, plan())
        .await;

    assert!(matches!(
        result,
        Err(GatewayError::Orchestration(OrchestrationError::Cancelled))
    ));
}

#[tokio::test]
async fn test_deadline_fails_call_without_partial_result() {
    let f = fixture().await;
    f.gateway_1.set_delay(Duration::from_secs(5));
    f.gateway_2.set_delay(Duration::from_secs(5));

    let blocks = vec![
        BlockAssignment::new(block_owned_by(ADDR_1, &[ADDR_1, ADDR_2]), vec![group(1, &[1])]),
        BlockAssignment::new(block_owned_by(ADDR_2, &[ADDR_1, ADDR_2]), vec![group(2, &[2])]),
    ];
    let ctx = CallContext::with_timeout(Duration::from_millis(50));

    let result = f
        .client
        .filter_chunks(&ctx, TENANT, interval(), blocks, plan())
        .await;

    assert!(matches!(
        result,
        Err(GatewayError::Orchestration(OrchestrationError::DeadlineExceeded))
    ));
}

#[tokio::test]
async fn test_concurrent_calls() {
    let f = fixture().await;

    let calls: Vec<_> = (0..16u64)
        .map(|i| {
            let client = Arc::clone(&f.client);
            tokio::spawn(async move {
                let blocks = vec![BlockAssignment::new(
                    format!("block-{i}"),
                    vec![group(i, &[1, 2])],
                )];
                client
                    .filter_chunks(&CallContext::new(), TENANT, interval(), blocks, plan())
                    .await
            })
        })
        .collect();

    for (i, call) in calls.into_iter().enumerate() {
        let result = call.await.unwrap().unwrap();
        assert_eq!(result, vec![group(i as u64, &[1, 2])]);
    }
    assert_eq!(f.client.metrics().requests_success, 16);
}

// =============================================================================
// LIFECYCLE
// =============================================================================

#[tokio::test]
async fn test_refresh_swaps_addresses_and_evicts_stale_clients() {
    let f = fixture().await;
    let blocks = vec![
        BlockAssignment::new(block_owned_by(ADDR_1, &[ADDR_1, ADDR_2]), vec![group(1, &[1])]),
        BlockAssignment::new(block_owned_by(ADDR_2, &[ADDR_1, ADDR_2]), vec![group(2, &[2])]),
    ];
    f.client
        .filter_chunks(&CallContext::new(), TENANT, interval(), blocks.clone(), plan())
        .await
        .unwrap();
    assert_eq!(f.client.pool_size(), 2);

    f.discovery.set_addresses(vec![ADDR_1.to_string()]);
    f.client.refresh().await;

    let addresses: Vec<Address> = f.client.addresses().addresses().to_vec();
    assert_eq!(addresses, vec![ADDR_1.to_string()]);
    assert_eq!(f.client.pool_size(), 1);

    f.client
        .filter_chunks(&CallContext::new(), TENANT, interval(), blocks, plan())
        .await
        .unwrap();
    assert_eq!(f.gateway_1.request_count(), 2);
    assert_eq!(f.gateway_2.request_count(), 1);
}

#[tokio::test]
async fn test_refresh_evicts_unhealthy_clients() {
    let f = fixture().await;
    let blocks = vec![
        BlockAssignment::new(block_owned_by(ADDR_1, &[ADDR_1, ADDR_2]), vec![group(1, &[1])]),
        BlockAssignment::new(block_owned_by(ADDR_2, &[ADDR_1, ADDR_2]), vec![group(2, &[2])]),
    ];
    f.client
        .filter_chunks(&CallContext::new(), TENANT, interval(), blocks, plan())
        .await
        .unwrap();

    f.gateway_2.set_health(HealthStatus::NotServing);
    f.client.refresh().await;

    assert_eq!(f.client.pool_size(), 1);
    assert_eq!(f.client.addresses().len(), 2);
}

#[tokio::test]
async fn test_maintenance_loop_follows_discovery() {
    let f = fixture().await;
    f.client.start();

    f.discovery.set_addresses(vec![ADDR_2.to_string()]);
    let client = Arc::clone(&f.client);
    assert!(wait_until(move || client.addresses().len() == 1).await);
    assert_eq!(f.client.addresses().addresses(), [ADDR_2.to_string()]);

    f.client.stop().await;
    assert!(!f.client.is_running());

    f.discovery.set_addresses(vec![ADDR_1.to_string(), ADDR_2.to_string()]);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(f.client.addresses().len(), 1);
}

#[tokio::test]
async fn test_results_cache_serves_repeated_calls() {
    let config = ClientConfigBuilder::new()
        .addresses(format!("{ADDR_1},{ADDR_2}"))
        .cache_results(true)
        .build()
        .unwrap();
    let f = fixture_with(config).await;
    let blocks = vec![BlockAssignment::new(
        block_owned_by(ADDR_1, &[ADDR_1, ADDR_2]),
        vec![group(9, &[1, 2])],
    )];

    let first = f
        .client
        .filter_chunks(&CallContext::new(), TENANT, interval(), blocks.clone(), plan())
        .await
        .unwrap();
    let second = f
        .client
        .filter_chunks(&CallContext::new(), TENANT, interval(), blocks, plan())
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(f.gateway_1.request_count(), 1);

    let metrics = f.client.metrics();
    assert_eq!(metrics.cache_hits, 1);
    assert_eq!(metrics.cache_misses, 1);
    assert_eq!(metrics.requests_success, 2);
}
