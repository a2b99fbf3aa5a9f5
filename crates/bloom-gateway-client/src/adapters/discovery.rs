//! Address Discovery Adapters
//!
//! Implement the `AddressProvider` port for fixed address lists and for
//! `dns+host:port` entries resolved through the system resolver.

use crate::domain::{Address, AddressEntry, GatewayError};
use crate::ports::outbound::AddressProvider;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Fixed address list, replaceable at runtime.
#[derive(Default)]
pub struct StaticAddressProvider {
    addresses: RwLock<Vec<Address>>,
}

impl StaticAddressProvider {
    /// Provider serving `addresses`.
    pub fn new(addresses: Vec<Address>) -> Self {
        Self {
            addresses: RwLock::new(addresses),
        }
    }

    /// Replace the served addresses. Takes effect on the next refresh.
    pub fn set_addresses(&self, addresses: Vec<Address>) {
        *self.addresses.write() = addresses;
    }
}

#[async_trait]
impl AddressProvider for StaticAddressProvider {
    fn addresses(&self) -> Vec<Address> {
        self.addresses.read().clone()
    }

    async fn refresh(&self) -> Result<(), GatewayError> {
        Ok(())
    }
}

/// Provider resolving `dns+` entries to one address per A/AAAA record.
///
/// Static entries pass through unchanged. A failed refresh keeps the
/// previously resolved set.
pub struct DnsAddressProvider {
    entries: Vec<AddressEntry>,
    resolved: RwLock<Vec<Address>>,
}

impl DnsAddressProvider {
    /// Provider for parsed address entries. Nothing is resolved until the
    /// first [`AddressProvider::refresh`].
    pub fn new(entries: Vec<AddressEntry>) -> Self {
        Self {
            entries,
            resolved: RwLock::new(Vec::new()),
        }
    }

    async fn resolve(&self) -> Result<Vec<Address>, GatewayError> {
        let mut addresses = BTreeSet::new();

        for entry in &self.entries {
            match entry {
                AddressEntry::Static(addr) => {
                    addresses.insert(addr.clone());
                }
                AddressEntry::Dns(target) => {
                    let resolved = tokio::net::lookup_host(target.as_str())
                        .await
                        .map_err(|e| GatewayError::Discovery(format!("lookup {target}: {e}")))?;
                    for socket in resolved {
                        addresses.insert(socket.to_string());
                    }
                }
            }
        }

        Ok(addresses.into_iter().collect())
    }
}

#[async_trait]
impl AddressProvider for DnsAddressProvider {
    fn addresses(&self) -> Vec<Address> {
        self.resolved.read().clone()
    }

    async fn refresh(&self) -> Result<(), GatewayError> {
        match self.resolve().await {
            Ok(addresses) => {
                debug!(count = addresses.len(), "resolved bloom gateway addresses");
                *self.resolved.write() = addresses;
                Ok(())
            }
            Err(err) => {
                warn!(
                    err = %err,
                    "failed to resolve bloom gateway addresses, keeping previous set"
                );
                Err(err)
            }
        }
    }
}
