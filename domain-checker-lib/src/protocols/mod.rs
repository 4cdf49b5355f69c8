//! Protocol implementations.
//!
//! Each client performs one request/response exchange against one endpoint and
//! hands back the raw payload. Endpoint discovery lives in [`registry`].

use crate::error::LookupError;
use crate::types::{Endpoint, Protocol, QueryTarget, RawResponse};
use async_trait::async_trait;
use std::time::Duration;

/// DNS lookups through hickory-resolver
pub mod dns;

/// RDAP (Registration Data Access Protocol) implementation
pub mod rdap;

/// Registry mappings and bootstrap discovery
pub mod registry;

/// WHOIS protocol implementation
pub mod whois;

pub use dns::DnsClient;
pub use rdap::RdapClient;
pub use registry::{
    BootstrapCache, BootstrapCategory, BootstrapRegistry, BootstrapSource, EndpointResolver,
    IanaBootstrapSource,
};
pub use whois::WhoisClient;

/// A single-exchange protocol client.
///
/// Implementations must honor `timeout` and must not retry on their own; the
/// orchestrator owns fallback and the overall budget.
#[async_trait]
pub trait LookupClient: Send + Sync {
    /// Protocol tag this client answers for.
    fn protocol(&self) -> Protocol;

    async fn lookup(
        &self,
        endpoint: &Endpoint,
        target: &QueryTarget,
        timeout: Duration,
    ) -> Result<RawResponse, LookupError>;
}
