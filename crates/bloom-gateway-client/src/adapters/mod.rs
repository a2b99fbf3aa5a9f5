//! # Adapters Layer (Hexagonal Architecture)
//!
//! Implements the outbound port traits: address discovery, the results
//! cache decorator and in-memory gateways.

pub mod cache;
pub mod discovery;
pub mod in_memory;

pub use cache::{CacheKey, CachingGatewayClient, ResultsCache};
pub use discovery::{DnsAddressProvider, StaticAddressProvider};
pub use in_memory::{InMemoryBloomGateway, InMemoryConnector};
