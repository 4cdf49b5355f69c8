//! Core data types for multi-protocol lookups.
//!
//! This module defines the value objects that flow through the engine: query
//! targets, endpoints, raw protocol payloads, normalized records, lookup outcomes,
//! batch and propagation aggregates, and the engine configuration.

use crate::error::LookupError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;

/// What is being resolved. Immutable once validated.
///
/// Build one with [`QueryTarget::parse`], which normalizes domains to lowercase
/// punycode and rejects malformed input.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryTarget {
    /// A normalized domain name (lowercase ASCII, no trailing dot)
    Domain(String),
    /// An IPv4 or IPv6 address
    Ip(IpAddr),
    /// An autonomous system number
    Asn(u32),
}

impl QueryTarget {
    /// Validate and normalize user input into a target.
    pub fn parse(input: &str) -> Result<Self, LookupError> {
        crate::utils::parse_target(input)
    }

    /// The top-level label of a domain target.
    pub fn tld(&self) -> Option<&str> {
        match self {
            Self::Domain(name) => name.rsplit('.').next(),
            _ => None,
        }
    }

    pub fn is_domain(&self) -> bool {
        matches!(self, Self::Domain(_))
    }
}

impl fmt::Display for QueryTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Domain(name) => f.write_str(name),
            Self::Ip(ip) => write!(f, "{}", ip),
            Self::Asn(asn) => write!(f, "AS{}", asn),
        }
    }
}

impl Serialize for QueryTarget {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Wire protocol that produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Whois,
    Rdap,
    Dns,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Whois => write!(f, "WHOIS"),
            Protocol::Rdap => write!(f, "RDAP"),
            Protocol::Dns => write!(f, "DNS"),
        }
    }
}

/// Method requested by the caller.
///
/// `Auto` tries RDAP first and falls back to WHOIS. The explicit methods
/// never fall back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LookupMethod {
    #[default]
    Auto,
    Rdap,
    Whois,
    Dig,
}

impl LookupMethod {
    /// Whether requests made with this method go through the spacing limiter.
    ///
    /// WHOIS and RDAP servers throttle abusive clients; single UDP DNS
    /// queries are exempt.
    pub fn is_rate_limited(&self) -> bool {
        !matches!(self, LookupMethod::Dig)
    }
}

impl FromStr for LookupMethod {
    type Err = LookupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "rdap" => Ok(Self::Rdap),
            "whois" => Ok(Self::Whois),
            "dig" | "dns" => Ok(Self::Dig),
            other => Err(LookupError::config(format!(
                "Unknown lookup method '{}'. Use auto, rdap, whois or dig",
                other
            ))),
        }
    }
}

impl fmt::Display for LookupMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupMethod::Auto => write!(f, "auto"),
            LookupMethod::Rdap => write!(f, "rdap"),
            LookupMethod::Whois => write!(f, "whois"),
            LookupMethod::Dig => write!(f, "dig"),
        }
    }
}

/// DNS record types the DNS client can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DnsRecordType {
    A,
    Aaaa,
    Cname,
    Mx,
    Ns,
    Ptr,
    Soa,
    Txt,
    Caa,
    Srv,
    /// Meta type: every type in [`DnsRecordType::ALL_CONSTITUENTS`], queried one by one.
    All,
}

impl DnsRecordType {
    /// Types queried for `ALL`, in merge order.
    pub const ALL_CONSTITUENTS: [DnsRecordType; 8] = [
        DnsRecordType::A,
        DnsRecordType::Aaaa,
        DnsRecordType::Cname,
        DnsRecordType::Mx,
        DnsRecordType::Ns,
        DnsRecordType::Soa,
        DnsRecordType::Txt,
        DnsRecordType::Caa,
    ];

    pub fn is_meta(&self) -> bool {
        matches!(self, DnsRecordType::All)
    }

    /// Concrete types to query for this request.
    pub fn constituents(&self) -> Vec<DnsRecordType> {
        match self {
            DnsRecordType::All => Self::ALL_CONSTITUENTS.to_vec(),
            other => vec![*other],
        }
    }
}

impl FromStr for DnsRecordType {
    type Err = LookupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Self::A),
            "AAAA" => Ok(Self::Aaaa),
            "CNAME" => Ok(Self::Cname),
            "MX" => Ok(Self::Mx),
            "NS" => Ok(Self::Ns),
            "PTR" => Ok(Self::Ptr),
            "SOA" => Ok(Self::Soa),
            "TXT" => Ok(Self::Txt),
            "CAA" => Ok(Self::Caa),
            "SRV" => Ok(Self::Srv),
            "ALL" | "ANY" => Ok(Self::All),
            other => Err(LookupError::config(format!(
                "Unsupported DNS record type '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for DnsRecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DnsRecordType::A => "A",
            DnsRecordType::Aaaa => "AAAA",
            DnsRecordType::Cname => "CNAME",
            DnsRecordType::Mx => "MX",
            DnsRecordType::Ns => "NS",
            DnsRecordType::Ptr => "PTR",
            DnsRecordType::Soa => "SOA",
            DnsRecordType::Txt => "TXT",
            DnsRecordType::Caa => "CAA",
            DnsRecordType::Srv => "SRV",
            DnsRecordType::All => "ALL",
        };
        f.write_str(name)
    }
}

/// The authoritative address a protocol client talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// RDAP base URL, always ending in `/`
    Rdap { base_url: String },
    /// WHOIS server, port 43 unless overridden
    Whois { host: String, port: u16 },
    /// DNS resolver (`None` = system configuration) and the record set to ask for
    Dns {
        resolver: Option<IpAddr>,
        record_type: DnsRecordType,
    },
}

impl Endpoint {
    pub const WHOIS_PORT: u16 = 43;

    pub fn whois<H: Into<String>>(host: H) -> Self {
        Endpoint::Whois {
            host: host.into(),
            port: Self::WHOIS_PORT,
        }
    }

    pub fn rdap<U: Into<String>>(base_url: U) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Endpoint::Rdap { base_url }
    }

    pub fn protocol(&self) -> Protocol {
        match self {
            Endpoint::Rdap { .. } => Protocol::Rdap,
            Endpoint::Whois { .. } => Protocol::Whois,
            Endpoint::Dns { .. } => Protocol::Dns,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Rdap { base_url } => f.write_str(base_url),
            Endpoint::Whois { host, port } => write!(f, "{}:{}", host, port),
            Endpoint::Dns {
                resolver: Some(ip),
                record_type,
            } => write!(f, "{} @{}", record_type, ip),
            Endpoint::Dns {
                resolver: None,
                record_type,
            } => write!(f, "{} @system", record_type),
        }
    }
}

/// One DNS answer record, rendered to text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DnsRecord {
    pub record_type: DnsRecordType,
    pub name: String,
    pub value: String,
    pub ttl: u32,
}

impl fmt::Display for DnsRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\tIN\t{}\t{}",
            self.name, self.ttl, self.record_type, self.value
        )
    }
}

/// Unprocessed payload returned by a protocol client.
#[derive(Debug, Clone, PartialEq)]
pub enum RawResponse {
    Whois {
        server: String,
        text: String,
    },
    Rdap {
        url: String,
        /// Response body exactly as received
        body: String,
        json: serde_json::Value,
    },
    Dns {
        resolver: Option<IpAddr>,
        /// Answer records of the requested type(s), merged in type order
        records: Vec<DnsRecord>,
        /// Name servers from an auxiliary NS query
        name_servers: Vec<String>,
    },
}

impl RawResponse {
    pub fn protocol(&self) -> Protocol {
        match self {
            RawResponse::Whois { .. } => Protocol::Whois,
            RawResponse::Rdap { .. } => Protocol::Rdap,
            RawResponse::Dns { .. } => Protocol::Dns,
        }
    }

    /// The payload as text, kept on the normalized record for audit.
    pub fn raw_text(&self) -> String {
        match self {
            RawResponse::Whois { text, .. } => text.clone(),
            RawResponse::Rdap { body, .. } => body.clone(),
            RawResponse::Dns { records, .. } => records
                .iter()
                .map(|r| r.to_string())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// Contact details for one role (registrant, admin, technical).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Contact {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl Contact {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.organization.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.address.is_none()
    }

    /// `Some(self)` unless every field is empty.
    pub fn non_empty(self) -> Option<Self> {
        if self.is_empty() {
            None
        } else {
            Some(self)
        }
    }
}

/// Canonical registration and DNS information, whatever the source protocol.
///
/// Built once per successful lookup and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRecord {
    /// The domain (or IP / ASN) the record describes
    pub domain: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub registrar: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_date: Option<DateTime<Utc>>,

    /// Status codes (e.g., "clientTransferProhibited")
    pub status: Vec<String>,

    pub name_servers: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub registrant: Option<Contact>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_contact: Option<Contact>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tech_contact: Option<Contact>,

    /// Answer records (DNS only)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dns_records: Vec<DnsRecord>,

    /// Protocol payload, verbatim
    pub raw_data: String,

    pub source: Protocol,
}

impl NormalizedRecord {
    /// An empty record for `domain`, carrying only the raw payload.
    pub fn empty(domain: &str, source: Protocol, raw_data: String) -> Self {
        Self {
            domain: domain.to_string(),
            registrar: None,
            creation_date: None,
            expiration_date: None,
            updated_date: None,
            status: Vec::new(),
            name_servers: Vec::new(),
            registrant: None,
            admin_contact: None,
            tech_contact: None,
            dns_records: Vec::new(),
            raw_data,
            source,
        }
    }

    /// Whether any field that proves a registration exists is populated.
    pub fn has_registration_data(&self) -> bool {
        self.registrar.is_some()
            || self.creation_date.is_some()
            || self.expiration_date.is_some()
            || !self.name_servers.is_empty()
    }
}

/// Derived registration verdict for a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    Registered,
    NotRegistered,
    PossiblyRegistered,
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationStatus::Registered => write!(f, "registered"),
            RegistrationStatus::NotRegistered => write!(f, "not_registered"),
            RegistrationStatus::PossiblyRegistered => write!(f, "possibly_registered"),
        }
    }
}

/// Result of one lookup attempt: a record or a typed failure.
///
/// Created exactly once per attempt; `success` is true iff `record` is set.
#[derive(Debug, Clone, Serialize)]
pub struct LookupOutcome {
    /// The target exactly as the caller supplied it
    pub target: String,

    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<NormalizedRecord>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<LookupError>,

    /// Method the caller asked for
    pub method: LookupMethod,

    /// Protocol that produced the record (or the primary failure)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<Protocol>,

    #[serde(with = "duration_secs")]
    pub elapsed: Duration,

    pub status: RegistrationStatus,
}

impl LookupOutcome {
    pub fn succeeded(
        target: &str,
        method: LookupMethod,
        record: NormalizedRecord,
        elapsed: Duration,
    ) -> Self {
        let protocol = Some(record.source);
        let status = crate::status::evaluate(Some(&record), None);
        Self {
            target: target.to_string(),
            success: true,
            record: Some(record),
            error: None,
            method,
            protocol,
            elapsed,
            status,
        }
    }

    pub fn failed(
        target: &str,
        method: LookupMethod,
        protocol: Option<Protocol>,
        error: LookupError,
        elapsed: Duration,
    ) -> Self {
        let status = crate::status::evaluate(None, Some(&error));
        Self {
            target: target.to_string(),
            success: false,
            record: None,
            error: Some(error),
            method,
            protocol,
            elapsed,
            status,
        }
    }
}

/// Ordered outcomes of a batch plus aggregate counts.
#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    /// One outcome per input target, in input order
    pub outcomes: Vec<LookupOutcome>,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub registered: usize,
    pub not_registered: usize,
    pub possibly_registered: usize,
    #[serde(with = "duration_secs")]
    pub total_time: Duration,
    #[serde(with = "duration_secs")]
    pub average_time: Duration,
}

/// A named public DNS resolver in the propagation roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicResolver {
    pub name: String,
    pub ip: IpAddr,
    pub location: String,
}

/// One roster entry's answer during a propagation check.
#[derive(Debug, Clone, Serialize)]
pub struct ResolverResult {
    pub resolver: PublicResolver,
    pub outcome: LookupOutcome,
    /// Sorted, de-duplicated answer values (empty on failure)
    pub values: Vec<String>,
}

impl ResolverResult {
    /// Whether this resolver gave a usable answer. An empty answer counts.
    pub fn answered(&self) -> bool {
        self.outcome.success
            || self
                .outcome
                .error
                .as_ref()
                .is_some_and(|e| e.kind() == crate::error::ErrorKind::NotFound)
    }
}

/// A distinct answer and how many resolvers returned it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueSetGroup {
    pub values: Vec<String>,
    pub resolvers: Vec<String>,
}

/// Propagation verdict for one target and record type.
#[derive(Debug, Clone, Serialize)]
pub struct PropagationResult {
    pub target: String,
    pub record_type: DnsRecordType,
    pub results: Vec<ResolverResult>,
    /// Distinct answers, largest group first
    pub value_sets: Vec<ValueSetGroup>,
    pub total_resolvers: usize,
    pub successful: usize,
    pub failed: usize,
    pub majority_size: usize,
    /// Majority group size over successful resolvers, 0.0 when none answered
    pub propagation_percentage: f64,
    pub fully_propagated: bool,
    #[serde(with = "duration_secs")]
    pub total_time: Duration,
}

/// Side-by-side WHOIS and RDAP outcomes for one target.
#[derive(Debug, Clone, Serialize)]
pub struct Comparison {
    pub target: String,
    pub whois: LookupOutcome,
    pub rdap: LookupOutcome,
    /// Fields where both protocols answered but disagree
    pub differences: Vec<FieldDifference>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDifference {
    pub field: String,
    pub whois: Option<String>,
    pub rdap: Option<String>,
}

/// Configuration for lookup operations.
///
/// Defaults: 30 s timeout, 10 concurrent lookups, 1 request per second,
/// `auto` method, `ALL` record type for dig lookups, 10 s propagation timeout.
#[derive(Debug, Clone)]
pub struct CheckConfig {
    /// Budget for one whole lookup, fallback included
    pub timeout: Duration,

    /// Maximum simultaneous in-flight lookups in a batch
    /// Default: 10, Range: 1-100
    pub concurrency: usize,

    /// Requests per second across a batch (WHOIS and RDAP only)
    pub rate_limit: f64,

    pub method: LookupMethod,

    /// Record type for `dig` lookups
    pub record_type: DnsRecordType,

    /// Whether to fetch IANA bootstrap files for TLDs missing from the static table
    pub enable_bootstrap: bool,

    /// Resolver for `dig` lookups; `None` uses the system configuration
    pub dns_resolver: Option<IpAddr>,

    /// Per-resolver timeout during propagation checks
    pub propagation_timeout: Duration,

    pub propagation_record_type: DnsRecordType,

    /// Replaces the built-in propagation roster when set
    pub resolvers: Option<Vec<PublicResolver>>,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            concurrency: 10,
            rate_limit: 1.0,
            method: LookupMethod::Auto,
            record_type: DnsRecordType::All,
            enable_bootstrap: true,
            dns_resolver: None,
            propagation_timeout: Duration::from_secs(10),
            propagation_record_type: DnsRecordType::A,
            resolvers: None,
        }
    }
}

impl CheckConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_rate_limit(mut self, rate_limit: f64) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    pub fn with_method(mut self, method: LookupMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_record_type(mut self, record_type: DnsRecordType) -> Self {
        self.record_type = record_type;
        self
    }

    /// Enable or disable IANA bootstrap discovery.
    pub fn with_bootstrap(mut self, enabled: bool) -> Self {
        self.enable_bootstrap = enabled;
        self
    }

    pub fn with_dns_resolver(mut self, resolver: Option<IpAddr>) -> Self {
        self.dns_resolver = resolver;
        self
    }

    pub fn with_propagation_timeout(mut self, timeout: Duration) -> Self {
        self.propagation_timeout = timeout;
        self
    }

    pub fn with_resolvers(mut self, resolvers: Vec<PublicResolver>) -> Self {
        self.resolvers = Some(resolvers);
        self
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<(), LookupError> {
        if self.concurrency == 0 || self.concurrency > 100 {
            return Err(LookupError::config(
                "Concurrency must be between 1 and 100",
            ));
        }
        validate_rate_limit(self.rate_limit)?;
        validate_timeout("Timeout", self.timeout)?;
        validate_timeout("Propagation timeout", self.propagation_timeout)?;
        if self.resolvers.as_ref().is_some_and(|r| r.is_empty()) {
            return Err(LookupError::config("Resolver roster cannot be empty"));
        }
        Ok(())
    }
}

/// Longest accepted lookup or propagation timeout.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(60 * 60);

fn validate_timeout(name: &str, timeout: Duration) -> Result<(), LookupError> {
    if timeout.is_zero() {
        return Err(LookupError::config(format!(
            "{} must be greater than zero",
            name
        )));
    }
    if timeout > MAX_TIMEOUT {
        return Err(LookupError::config(format!(
            "{} must be at most {}s (got {}s)",
            name,
            MAX_TIMEOUT.as_secs(),
            timeout.as_secs()
        )));
    }
    Ok(())
}

/// Spacing between request starts for `rate_limit` requests per second.
pub(crate) fn rate_limit_interval(rate_limit: f64) -> Result<Duration, LookupError> {
    let invalid = || {
        LookupError::config(format!(
            "Rate limit must be a positive number of requests per second (got {})",
            rate_limit
        ))
    };
    if !rate_limit.is_finite() || rate_limit <= 0.0 {
        return Err(invalid());
    }
    Duration::try_from_secs_f64(1.0 / rate_limit).map_err(|_| invalid())
}

pub(crate) fn validate_rate_limit(rate_limit: f64) -> Result<(), LookupError> {
    rate_limit_interval(rate_limit).map(|_| ())
}

/// Serialize a `Duration` as fractional seconds.
pub(crate) mod duration_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(duration.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_type_parsing() {
        assert_eq!("aaaa".parse::<DnsRecordType>().unwrap(), DnsRecordType::Aaaa);
        assert_eq!("ANY".parse::<DnsRecordType>().unwrap(), DnsRecordType::All);
        assert!("HINFO".parse::<DnsRecordType>().is_err());
        assert_eq!(DnsRecordType::All.constituents().len(), 8);
        assert_eq!(DnsRecordType::Mx.constituents(), vec![DnsRecordType::Mx]);
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!("RDAP".parse::<LookupMethod>().unwrap(), LookupMethod::Rdap);
        assert_eq!("dig".parse::<LookupMethod>().unwrap(), LookupMethod::Dig);
        assert!("finger".parse::<LookupMethod>().is_err());
        assert!(!LookupMethod::Dig.is_rate_limited());
        assert!(LookupMethod::Auto.is_rate_limited());
    }

    #[test]
    fn test_endpoint_display() {
        assert_eq!(
            Endpoint::whois("whois.verisign-grs.com").to_string(),
            "whois.verisign-grs.com:43"
        );
        assert_eq!(
            Endpoint::rdap("https://rdap.org").to_string(),
            "https://rdap.org/"
        );
    }

    #[test]
    fn test_config_validation() {
        assert!(CheckConfig::default().validate().is_ok());
        assert!(CheckConfig::default().with_concurrency(0).validate().is_err());
        assert!(CheckConfig::default().with_rate_limit(0.0).validate().is_err());
        assert!(CheckConfig::default()
            .with_rate_limit(f64::NAN)
            .validate()
            .is_err());
        assert!(CheckConfig::default()
            .with_resolvers(vec![])
            .validate()
            .is_err());
    }

    #[test]
    fn test_config_rejects_unrepresentable_limits() {
        let tiny_rate = CheckConfig::default().with_rate_limit(1e-20).validate();
        assert!(matches!(tiny_rate, Err(LookupError::Config { .. })));

        let huge_timeout = CheckConfig::default()
            .with_timeout(Duration::from_secs(u64::MAX))
            .validate();
        assert!(matches!(huge_timeout, Err(LookupError::Config { .. })));

        let huge_propagation = CheckConfig::default()
            .with_propagation_timeout(MAX_TIMEOUT + Duration::from_secs(1))
            .validate();
        assert!(matches!(huge_propagation, Err(LookupError::Config { .. })));

        assert!(CheckConfig::default()
            .with_timeout(MAX_TIMEOUT)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_outcome_serializes_status() {
        let outcome = LookupOutcome::failed(
            "example.com",
            LookupMethod::Rdap,
            Some(Protocol::Rdap),
            LookupError::not_found("example.com", "HTTP 404"),
            Duration::from_millis(250),
        );
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "not_registered");
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["kind"], "not_found");
    }
}
