//! Client configuration and validation
//!
//! # Example
//!
//! ```ignore
//! use bloom_gateway_client::domain::ClientConfigBuilder;
//!
//! let config = ClientConfigBuilder::new()
//!     .addresses("dns+bloom-gateway.loki.svc:9095")
//!     .check_interval(Duration::from_secs(10))
//!     .cache_results(true)
//!     .build()?;
//! ```

use crate::domain::GatewayError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Prefix selecting A/AAAA lookup for an address entry.
pub const DNS_PREFIX: &str = "dns+";

/// Bloom gateway client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Comma separated gateway addresses (`host:port` or `dns+host:port`).
    pub addresses: String,
    /// Connection pool behaviour.
    pub pool: PoolConfig,
    /// Cache filter responses.
    pub cache_results: bool,
    /// Results cache configuration.
    pub cache: CacheConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            addresses: String::new(),
            pool: PoolConfig::default(),
            cache_results: false,
            cache: CacheConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), GatewayError> {
        self.pool.validate()?;

        if self.cache_results {
            self.cache.validate()?;
        }

        if self.addresses.trim().is_empty() {
            return Err(GatewayError::InvalidConfig(
                concat!(
                    "addresses requires a list of comma separated strings ",
                    "in DNS service discovery format with at least one item"
                )
                .into(),
            ));
        }

        parse_address_entries(&self.addresses)?;
        Ok(())
    }

    /// Parsed address entries.
    pub fn address_entries(&self) -> Result<Vec<AddressEntry>, GatewayError> {
        parse_address_entries(&self.addresses)
    }
}

/// Connection pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Interval between discovery refreshes, stale-client removal and
    /// health checks.
    #[serde(with = "humantime_serde")]
    pub check_interval: Duration,
    /// Probe cached clients and evict unhealthy ones.
    pub health_check_enabled: bool,
    /// Timeout of a single health probe.
    #[serde(with = "humantime_serde")]
    pub health_check_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(15),
            health_check_enabled: true,
            health_check_timeout: Duration::from_secs(1),
        }
    }
}

impl PoolConfig {
    /// Validate pool settings.
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.check_interval.is_zero() {
            return Err(GatewayError::InvalidConfig(
                "pool.check_interval cannot be 0".into(),
            ));
        }

        if self.health_check_enabled && self.health_check_timeout.is_zero() {
            return Err(GatewayError::InvalidConfig(
                "pool.health_check_timeout cannot be 0 when health checks are enabled".into(),
            ));
        }

        Ok(())
    }
}

/// Results cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of cached responses.
    pub max_entries: usize,
    /// Lifetime of a cached response.
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1024,
            ttl: Duration::from_secs(300),
        }
    }
}

impl CacheConfig {
    /// Validate cache settings.
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.max_entries == 0 {
            return Err(GatewayError::InvalidConfig(
                "cache.max_entries cannot be 0".into(),
            ));
        }

        if self.ttl.is_zero() {
            return Err(GatewayError::InvalidConfig("cache.ttl cannot be 0".into()));
        }

        Ok(())
    }
}

/// One entry of the `addresses` setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressEntry {
    /// Used verbatim.
    Static(String),
    /// Resolved to one address per A/AAAA record.
    Dns(String),
}

/// Parse a comma separated address list.
pub fn parse_address_entries(raw: &str) -> Result<Vec<AddressEntry>, GatewayError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            if let Some(target) = entry.strip_prefix(DNS_PREFIX) {
                check_host_port(entry, target)?;
                return Ok(AddressEntry::Dns(target.to_string()));
            }

            if let Some((scheme, _)) = entry.split_once('+') {
                return Err(GatewayError::InvalidConfig(format!(
                    "unsupported discovery scheme '{scheme}+' in address '{entry}'"
                )));
            }

            check_host_port(entry, entry)?;
            Ok(AddressEntry::Static(entry.to_string()))
        })
        .collect()
}

fn check_host_port(entry: &str, target: &str) -> Result<(), GatewayError> {
    match target.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => Ok(()),
        _ => Err(GatewayError::InvalidConfig(format!(
            "address '{entry}' must be in host:port form"
        ))),
    }
}

/// Builder for [`ClientConfig`] with validation.
#[derive(Default)]
pub struct ClientConfigBuilder {
    addresses: Option<String>,
    check_interval: Option<Duration>,
    health_check_enabled: Option<bool>,
    health_check_timeout: Option<Duration>,
    cache_results: Option<bool>,
    cache_max_entries: Option<usize>,
    cache_ttl: Option<Duration>,
}

impl ClientConfigBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the comma separated address list
    pub fn addresses(mut self, addresses: impl Into<String>) -> Self {
        self.addresses = Some(addresses.into());
        self
    }

    /// Set the discovery refresh / pool maintenance interval
    pub fn check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = Some(interval);
        self
    }

    /// Enable or disable health checks
    pub fn health_check_enabled(mut self, enabled: bool) -> Self {
        self.health_check_enabled = Some(enabled);
        self
    }

    /// Set the health probe timeout
    pub fn health_check_timeout(mut self, timeout: Duration) -> Self {
        self.health_check_timeout = Some(timeout);
        self
    }

    /// Enable or disable the results cache
    pub fn cache_results(mut self, enabled: bool) -> Self {
        self.cache_results = Some(enabled);
        self
    }

    /// Set the maximum number of cached responses
    pub fn cache_max_entries(mut self, entries: usize) -> Self {
        self.cache_max_entries = Some(entries);
        self
    }

    /// Set the cached response lifetime
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    /// Build the configuration, validating all parameters
    pub fn build(self) -> Result<ClientConfig, GatewayError> {
        let defaults = ClientConfig::default();

        let config = ClientConfig {
            addresses: self.addresses.unwrap_or(defaults.addresses),
            pool: PoolConfig {
                check_interval: self
                    .check_interval
                    .unwrap_or(defaults.pool.check_interval),
                health_check_enabled: self
                    .health_check_enabled
                    .unwrap_or(defaults.pool.health_check_enabled),
                health_check_timeout: self
                    .health_check_timeout
                    .unwrap_or(defaults.pool.health_check_timeout),
            },
            cache_results: self.cache_results.unwrap_or(defaults.cache_results),
            cache: CacheConfig {
                max_entries: self.cache_max_entries.unwrap_or(defaults.cache.max_entries),
                ttl: self.cache_ttl.unwrap_or(defaults.cache.ttl),
            },
        };

        config.validate()?;
        Ok(config)
    }
}
