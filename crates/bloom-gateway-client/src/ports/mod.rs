//! # Ports Module
//!
//! Inbound API and outbound collaborator traits.

pub mod inbound;
pub mod outbound;

pub use inbound::FilterChunksApi;
pub use outbound::{
    AddressProvider, BloomGatewayClient, FilterChunkRefRequest, FilterChunkRefResponse,
    GatewayConnector, HealthStatus,
};
