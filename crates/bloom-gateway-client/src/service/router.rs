//! # Shard Router
//!
//! Maps routing keys to gateway addresses over a swappable address
//! snapshot. Readers never observe a partially updated address set and
//! never wait on a swap.

use crate::algorithms::assign_owner;
use crate::domain::{Address, GatewayError};
use arc_swap::ArcSwap;
use std::sync::Arc;
use tracing::debug;

/// Immutable, sorted and deduplicated address set.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RouterSnapshot {
    addresses: Vec<Address>,
}

impl RouterSnapshot {
    /// Build a snapshot from an unordered address list.
    pub fn new(mut addresses: Vec<Address>) -> Self {
        addresses.sort();
        addresses.dedup();
        Self { addresses }
    }

    /// Owner of `key` within this snapshot.
    pub fn owner(&self, key: &str) -> Result<Address, GatewayError> {
        assign_owner(key, &self.addresses)
            .cloned()
            .ok_or_else(|| GatewayError::empty_address_set(key))
    }

    /// Sorted addresses.
    pub fn addresses(&self) -> &[Address] {
        &self.addresses
    }

    /// Number of addresses.
    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    /// True when no address is known.
    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

/// Consistent-hash router over the current gateway address set.
///
/// Owners come from jump hashing over the sorted address list, so a bucket
/// index is a position in that list. Growing the set by an address that
/// sorts last, or removing the last one, moves about 1/N of the keys.
/// Removing or inserting anywhere else shifts the positions of every later
/// address and remaps most keys.
#[derive(Debug, Default)]
pub struct ShardRouter {
    current: ArcSwap<RouterSnapshot>,
}

impl ShardRouter {
    /// Router over an initial address set.
    pub fn new(addresses: Vec<Address>) -> Self {
        Self {
            current: ArcSwap::from_pointee(RouterSnapshot::new(addresses)),
        }
    }

    /// Replace the address set.
    ///
    /// Returns `false` when the normalized set is unchanged.
    pub fn update(&self, addresses: Vec<Address>) -> bool {
        let next = RouterSnapshot::new(addresses);
        if **self.current.load() == next {
            return false;
        }

        debug!(addresses = ?next.addresses(), "updating bloom gateway addresses");
        self.current.store(Arc::new(next));
        true
    }

    /// Owner of `key` under the current snapshot.
    pub fn owner(&self, key: &str) -> Result<Address, GatewayError> {
        self.snapshot().owner(key)
    }

    /// Current snapshot. Hold on to it to route a whole call consistently.
    pub fn snapshot(&self) -> Arc<RouterSnapshot> {
        self.current.load_full()
    }
}
