//! # Domain Checker Library
//!
//! A multi-protocol resolution engine: WHOIS, RDAP and DNS lookups for domains,
//! IP addresses and autonomous systems, with one normalized record format,
//! bulk lookups and DNS propagation checks.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use domain_checker_lib::DomainChecker;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let checker = DomainChecker::new()?;
//!     let outcome = checker.lookup("example.com").await;
//!
//!     println!("{} is {}", outcome.target, outcome.status);
//!     if let Some(record) = &outcome.record {
//!         println!("Registrar: {:?}", record.registrar);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **RDAP**: JSON lookups with IANA bootstrap discovery
//! - **WHOIS Fallback**: `auto` mode falls back to port 43 when RDAP fails
//! - **DNS**: native record queries and reverse lookups
//! - **Propagation**: agreement across a roster of public resolvers
//! - **Bulk Lookups**: bounded concurrency, rate limiting, input order preserved

// Re-export main public API types and functions
pub use checker::{record_differences, DomainChecker};
pub use config::{
    load_env_config, merge_configs, parse_timeout_string, ConfigManager, DefaultsConfig,
    EnvConfig, FileConfig,
};
pub use error::{ErrorKind, LookupError};
pub use propagation::default_resolvers;
pub use protocols::LookupClient;
pub use types::{
    BatchResult, CheckConfig, Comparison, Contact, DnsRecord, DnsRecordType, Endpoint,
    FieldDifference, LookupMethod, LookupOutcome, NormalizedRecord, PropagationResult, Protocol,
    PublicResolver, QueryTarget, RawResponse, RegistrationStatus, ResolverResult, ValueSetGroup,
    MAX_TIMEOUT,
};
pub use utils::{read_targets_file, reverse_pointer_name, validate_domain};

// Public modules
pub mod concurrent;
pub mod normalize;
pub mod propagation;
pub mod protocols;
pub mod status;

// Internal modules
mod checker;
mod config;
mod error;
mod types;
mod utils;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, LookupError>;

// Library version and metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const AUTHOR: &str = env!("CARGO_PKG_AUTHORS");

/// Get library information for debugging or display purposes.
pub fn info() -> LibraryInfo {
    LibraryInfo {
        name: env!("CARGO_PKG_NAME"),
        version: VERSION,
        author: AUTHOR,
        features: get_enabled_features(),
    }
}

/// Information about the library build and features
#[derive(Debug, Clone)]
pub struct LibraryInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub author: &'static str,
    pub features: Vec<&'static str>,
}

/// Get list of enabled features at compile time
#[allow(clippy::vec_init_then_push)]
fn get_enabled_features() -> Vec<&'static str> {
    let mut features = Vec::new();

    #[cfg(feature = "rdap")]
    features.push("rdap");

    #[cfg(feature = "whois")]
    features.push("whois");

    #[cfg(feature = "dns")]
    features.push("dns");

    #[cfg(feature = "bootstrap")]
    features.push("bootstrap");

    features
}
