//! # Domain Errors
//!
//! Error taxonomy for the bloom gateway client.
//!
//! Only [`GatewayError::Routing`] and [`GatewayError::Orchestration`] fail a
//! `filter_chunks` call. Connection and shard RPC failures are contained per
//! shard and degrade to fail-open behaviour.

use thiserror::Error;

/// Series identifier used as the sort, merge and dedup key.
pub type Fingerprint = u64;

/// Network address of a bloom gateway replica (`host:port`).
pub type Address = String;

/// Failures of the fan-out orchestration itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrchestrationError {
    /// The caller cancelled the call.
    #[error("call cancelled")]
    Cancelled,

    /// The call-wide deadline passed before all shards answered.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// A shard task panicked or was aborted outside of cancellation.
    #[error("shard task failed: {0}")]
    TaskFailed(String),
}

/// Bloom gateway client error types.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// A routing key could not be resolved to an address.
    #[error("Routing error for key {key}: {reason}")]
    Routing {
        /// Routing key (block identifier)
        key: String,
        /// Why resolution failed
        reason: String,
    },

    /// A candidate address could not produce a usable client.
    #[error("Connection error for {addr}: {reason}")]
    Connection {
        /// Gateway address
        addr: Address,
        /// Dial failure description
        reason: String,
    },

    /// The filter RPC failed against a gateway.
    #[error("Shard RPC error for {addr}: {reason}")]
    ShardRpc {
        /// Gateway address
        addr: Address,
        /// Remote or transport failure description
        reason: String,
    },

    /// The fan-out could not complete.
    #[error("Orchestration error: {0}")]
    Orchestration(#[from] OrchestrationError),

    /// Endpoint discovery failed to refresh.
    #[error("Discovery error: {0}")]
    Discovery(String),

    /// Invalid client configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl GatewayError {
    /// Routing failure caused by an empty address set.
    pub fn empty_address_set(key: impl Into<String>) -> Self {
        GatewayError::Routing {
            key: key.into(),
            reason: "no bloom gateway addresses available".to_string(),
        }
    }

    /// True for errors that fail a whole `filter_chunks` call.
    pub fn is_call_level(&self) -> bool {
        matches!(
            self,
            GatewayError::Routing { .. } | GatewayError::Orchestration(_)
        )
    }

    /// True for errors that are contained per shard and converted to
    /// unfiltered results.
    pub fn is_fail_open(&self) -> bool {
        matches!(
            self,
            GatewayError::Connection { .. } | GatewayError::ShardRpc { .. }
        )
    }
}
