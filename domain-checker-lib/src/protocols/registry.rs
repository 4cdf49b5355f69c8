//! Endpoint discovery: static server tables and IANA bootstrap registries.
//!
//! RDAP endpoints come from a built-in TLD table first, then from the IANA
//! bootstrap files (`dns.json`, `ipv4.json`, `ipv6.json`, `asn.json`). WHOIS
//! servers come from a built-in TLD table only.
//!
//! Bootstrap files are fetched at most once per [`BootstrapCache`] and kept for
//! the lifetime of that cache. Concurrent resolutions that need the same file
//! wait on the single in-flight fetch.

use crate::error::LookupError;
use crate::types::{DnsRecordType, Endpoint, Protocol, QueryTarget};
use async_trait::async_trait;
use ipnetwork::IpNetwork;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

/// Where IANA publishes the RDAP bootstrap files.
pub const IANA_BOOTSTRAP_BASE: &str = "https://data.iana.org/rdap/";

/// Server used for IP and ASN WHOIS queries; it refers to the regional registry.
pub const IANA_WHOIS_SERVER: &str = "whois.iana.org";

lazy_static::lazy_static! {
    /// Built-in RDAP base URLs for common TLDs.
    static ref RDAP_SERVERS: HashMap<&'static str, &'static str> = HashMap::from([
        // Popular gTLDs
        ("com", "https://rdap.verisign.com/com/v1/"),
        ("net", "https://rdap.verisign.com/net/v1/"),
        ("org", "https://rdap.publicinterestregistry.org/rdap/"),
        ("info", "https://rdap.identitydigital.services/rdap/"),
        ("biz", "https://rdap.nic.biz/"),
        ("app", "https://pubapi.registry.google/rdap/"),
        ("dev", "https://pubapi.registry.google/rdap/"),
        ("page", "https://pubapi.registry.google/rdap/"),
        ("xyz", "https://rdap.centralnic.com/xyz/"),
        ("tech", "https://rdap.centralnic.com/tech/"),
        ("online", "https://rdap.centralnic.com/online/"),
        ("site", "https://rdap.centralnic.com/site/"),
        ("shop", "https://rdap.gmoregistry.net/rdap/"),
        ("ai", "https://rdap.identitydigital.services/rdap/"),
        ("io", "https://rdap.identitydigital.services/rdap/"),
        ("me", "https://rdap.identitydigital.services/rdap/"),
        // ccTLDs with working RDAP
        ("us", "https://rdap.nic.us/"),
        ("uk", "https://rdap.nominet.uk/"),
        ("de", "https://rdap.denic.de/"),
        ("ca", "https://rdap.ca.fury.ca/rdap/"),
        ("au", "https://rdap.cctld.au/rdap/"),
        ("fr", "https://rdap.nic.fr/"),
        ("nl", "https://rdap.sidn.nl/"),
        ("br", "https://rdap.registro.br/"),
        ("tv", "https://rdap.nic.tv/"),
        ("cc", "https://tld-rdap.verisign.com/cc/v1/"),
    ]);

    /// Built-in WHOIS servers (port 43) per TLD.
    static ref WHOIS_SERVERS: HashMap<&'static str, &'static str> = HashMap::from([
        ("com", "whois.verisign-grs.com"),
        ("net", "whois.verisign-grs.com"),
        ("org", "whois.pir.org"),
        ("info", "whois.nic.info"),
        ("biz", "whois.nic.biz"),
        ("name", "whois.nic.name"),
        ("mobi", "whois.nic.mobi"),
        ("pro", "whois.nic.pro"),
        ("edu", "whois.educause.edu"),
        ("gov", "whois.dotgov.gov"),
        ("int", "whois.iana.org"),
        ("arpa", "whois.iana.org"),
        ("app", "whois.nic.google"),
        ("dev", "whois.nic.google"),
        ("page", "whois.nic.google"),
        ("xyz", "whois.nic.xyz"),
        ("tech", "whois.nic.tech"),
        ("online", "whois.nic.online"),
        ("site", "whois.nic.site"),
        ("shop", "whois.nic.shop"),
        ("blog", "whois.nic.blog"),
        ("cloud", "whois.nic.cloud"),
        ("io", "whois.nic.io"),
        ("ai", "whois.nic.ai"),
        ("me", "whois.nic.me"),
        ("co", "whois.nic.co"),
        ("tv", "whois.nic.tv"),
        ("cc", "ccwhois.verisign-grs.com"),
        ("us", "whois.nic.us"),
        ("uk", "whois.nic.uk"),
        ("de", "whois.denic.de"),
        ("eu", "whois.eu"),
        ("fr", "whois.nic.fr"),
        ("it", "whois.nic.it"),
        ("es", "whois.nic.es"),
        ("nl", "whois.domain-registry.nl"),
        ("be", "whois.dns.be"),
        ("ch", "whois.nic.ch"),
        ("se", "whois.iis.se"),
        ("ru", "whois.tcinet.ru"),
        ("ca", "whois.cira.ca"),
        ("au", "whois.auda.org.au"),
        ("br", "whois.registro.br"),
        ("in", "whois.registry.in"),
        ("jp", "whois.jprs.jp"),
        ("cn", "whois.cnnic.cn"),
    ]);
}

/// Look up the built-in RDAP base URL for a TLD.
pub fn static_rdap_server(tld: &str) -> Option<&'static str> {
    RDAP_SERVERS.get(tld.to_ascii_lowercase().as_str()).copied()
}

/// Look up the built-in WHOIS server for a TLD.
pub fn static_whois_server(tld: &str) -> Option<&'static str> {
    WHOIS_SERVERS.get(tld.to_ascii_lowercase().as_str()).copied()
}

/// One IANA bootstrap file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BootstrapCategory {
    Dns,
    Ipv4,
    Ipv6,
    Asn,
}

impl BootstrapCategory {
    pub fn file_name(&self) -> &'static str {
        match self {
            BootstrapCategory::Dns => "dns.json",
            BootstrapCategory::Ipv4 => "ipv4.json",
            BootstrapCategory::Ipv6 => "ipv6.json",
            BootstrapCategory::Asn => "asn.json",
        }
    }

    /// Bootstrap file that covers a target.
    pub fn for_target(target: &QueryTarget) -> Self {
        match target {
            QueryTarget::Domain(_) => BootstrapCategory::Dns,
            QueryTarget::Ip(IpAddr::V4(_)) => BootstrapCategory::Ipv4,
            QueryTarget::Ip(IpAddr::V6(_)) => BootstrapCategory::Ipv6,
            QueryTarget::Asn(_) => BootstrapCategory::Asn,
        }
    }
}

/// Parsed bootstrap file, indexed for lookups.
#[derive(Debug, Default)]
pub struct BootstrapRegistry {
    /// Lowercase TLD (or suffix) -> base URL
    domains: HashMap<String, String>,
    networks: Vec<(IpNetwork, String)>,
    asn_ranges: Vec<(u32, u32, String)>,
}

impl BootstrapRegistry {
    /// Build the index from a bootstrap JSON document.
    ///
    /// Each `services` entry is `[[keys...], [urls...]]`; some files prepend an
    /// extra array, so the last two members are used.
    pub fn from_json(
        category: BootstrapCategory,
        json: &serde_json::Value,
    ) -> Result<Self, LookupError> {
        let services = json
            .get("services")
            .and_then(|s| s.as_array())
            .ok_or_else(|| {
                LookupError::protocol(
                    category.file_name(),
                    "Invalid bootstrap JSON: missing or invalid 'services' array",
                )
            })?;

        let mut registry = BootstrapRegistry::default();

        for service in services {
            let Some(entry) = service.as_array() else {
                continue;
            };
            if entry.len() < 2 {
                continue;
            }
            let keys = string_list(&entry[entry.len() - 2]);
            let urls = string_list(&entry[entry.len() - 1]);
            let Some(url) = preferred_url(&urls) else {
                continue;
            };

            for key in keys {
                match category {
                    BootstrapCategory::Dns => {
                        registry.domains.insert(key.to_ascii_lowercase(), url.clone());
                    }
                    BootstrapCategory::Ipv4 | BootstrapCategory::Ipv6 => {
                        if let Ok(network) = key.parse::<IpNetwork>() {
                            registry.networks.push((network, url.clone()));
                        }
                    }
                    BootstrapCategory::Asn => {
                        if let Some((low, high)) = parse_asn_range(&key) {
                            registry.asn_ranges.push((low, high, url.clone()));
                        }
                    }
                }
            }
        }

        Ok(registry)
    }

    /// Longest-suffix match of a domain's labels against the TLD lists.
    pub fn lookup_domain(&self, domain: &str) -> Option<&str> {
        let labels: Vec<&str> = domain.split('.').collect();
        (0..labels.len()).find_map(|i| {
            self.domains
                .get(&labels[i..].join("."))
                .map(String::as_str)
        })
    }

    /// Most specific network containing the address.
    pub fn lookup_ip(&self, ip: IpAddr) -> Option<&str> {
        self.networks
            .iter()
            .filter(|(network, _)| network.contains(ip))
            .max_by_key(|(network, _)| network.prefix())
            .map(|(_, url)| url.as_str())
    }

    pub fn lookup_asn(&self, asn: u32) -> Option<&str> {
        self.asn_ranges
            .iter()
            .find(|(low, high, _)| (*low..=*high).contains(&asn))
            .map(|(_, _, url)| url.as_str())
    }

    pub fn lookup(&self, target: &QueryTarget) -> Option<&str> {
        match target {
            QueryTarget::Domain(name) => self.lookup_domain(name),
            QueryTarget::Ip(ip) => self.lookup_ip(*ip),
            QueryTarget::Asn(asn) => self.lookup_asn(*asn),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty() && self.networks.is_empty() && self.asn_ranges.is_empty()
    }
}

fn string_list(value: &serde_json::Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Prefer an `https` URL; always return it with a trailing slash.
fn preferred_url(urls: &[String]) -> Option<String> {
    let url = urls
        .iter()
        .find(|u| u.starts_with("https://"))
        .or_else(|| urls.first())?;
    Some(format!("{}/", url.trim_end_matches('/')))
}

fn parse_asn_range(key: &str) -> Option<(u32, u32)> {
    match key.split_once('-') {
        Some((low, high)) => Some((low.trim().parse().ok()?, high.trim().parse().ok()?)),
        None => {
            let single = key.trim().parse().ok()?;
            Some((single, single))
        }
    }
}

/// Something that can produce bootstrap files.
#[async_trait]
pub trait BootstrapSource: Send + Sync {
    async fn fetch(&self, category: BootstrapCategory) -> Result<BootstrapRegistry, LookupError>;
}

/// Fetches bootstrap files from IANA over HTTPS.
pub struct IanaBootstrapSource {
    http: reqwest::Client,
    base_url: String,
}

impl IanaBootstrapSource {
    pub fn new() -> Self {
        Self::with_base_url(IANA_BOOTSTRAP_BASE)
    }

    /// Fetch from a mirror instead of data.iana.org.
    pub fn with_base_url<U: Into<String>>(base_url: U) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(concat!("domain-checker/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            base_url: base_url.into(),
        }
    }
}

impl Default for IanaBootstrapSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BootstrapSource for IanaBootstrapSource {
    async fn fetch(&self, category: BootstrapCategory) -> Result<BootstrapRegistry, LookupError> {
        let url = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            category.file_name()
        );
        tracing::info!(url = %url, "fetching RDAP bootstrap file");

        let response = self.http.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(LookupError::protocol(
                &url,
                format!("Bootstrap registry returned HTTP {}", response.status()),
            ));
        }

        let json: serde_json::Value = response.json().await?;
        BootstrapRegistry::from_json(category, &json)
    }
}

/// Process-lifetime cache of bootstrap registries, one slot per category.
///
/// Owned by an [`EndpointResolver`]; independent resolvers never share it.
pub struct BootstrapCache {
    source: Arc<dyn BootstrapSource>,
    dns: OnceCell<Arc<BootstrapRegistry>>,
    ipv4: OnceCell<Arc<BootstrapRegistry>>,
    ipv6: OnceCell<Arc<BootstrapRegistry>>,
    asn: OnceCell<Arc<BootstrapRegistry>>,
}

impl BootstrapCache {
    pub fn new(source: Arc<dyn BootstrapSource>) -> Self {
        Self {
            source,
            dns: OnceCell::new(),
            ipv4: OnceCell::new(),
            ipv6: OnceCell::new(),
            asn: OnceCell::new(),
        }
    }

    fn slot(&self, category: BootstrapCategory) -> &OnceCell<Arc<BootstrapRegistry>> {
        match category {
            BootstrapCategory::Dns => &self.dns,
            BootstrapCategory::Ipv4 => &self.ipv4,
            BootstrapCategory::Ipv6 => &self.ipv6,
            BootstrapCategory::Asn => &self.asn,
        }
    }

    /// Get a registry, fetching it on first use.
    ///
    /// A failed fetch leaves the slot empty so a later call can try again.
    pub async fn get(
        &self,
        category: BootstrapCategory,
    ) -> Result<Arc<BootstrapRegistry>, LookupError> {
        self.slot(category)
            .get_or_try_init(|| async {
                let registry = self.source.fetch(category).await?;
                Ok::<_, LookupError>(Arc::new(registry))
            })
            .await
            .cloned()
    }

    pub fn is_loaded(&self, category: BootstrapCategory) -> bool {
        self.slot(category).initialized()
    }
}

/// Determines which server to contact for a target and protocol.
pub struct EndpointResolver {
    bootstrap: BootstrapCache,
    use_bootstrap: bool,
    dns_resolver: Option<IpAddr>,
}

impl EndpointResolver {
    /// Resolver backed by the live IANA bootstrap files.
    pub fn new(use_bootstrap: bool) -> Self {
        Self::with_source(Arc::new(IanaBootstrapSource::new()), use_bootstrap)
    }

    pub fn with_source(source: Arc<dyn BootstrapSource>, use_bootstrap: bool) -> Self {
        Self {
            bootstrap: BootstrapCache::new(source),
            use_bootstrap,
            dns_resolver: None,
        }
    }

    /// Resolver address used for `dig` lookups (`None` = system configuration).
    pub fn with_dns_resolver(mut self, resolver: Option<IpAddr>) -> Self {
        self.dns_resolver = resolver;
        self
    }

    pub fn bootstrap_cache(&self) -> &BootstrapCache {
        &self.bootstrap
    }

    /// Resolve the endpoint for `target` over `protocol`.
    ///
    /// DNS endpoints default to `ALL` records for names and `PTR` for addresses;
    /// use [`EndpointResolver::resolve_dns`] to choose the record type.
    pub async fn resolve(
        &self,
        target: &QueryTarget,
        protocol: Protocol,
    ) -> Result<Endpoint, LookupError> {
        let endpoint = match protocol {
            Protocol::Rdap => self.resolve_rdap(target).await?,
            Protocol::Whois => self.resolve_whois(target)?,
            Protocol::Dns => {
                let record_type = match target {
                    QueryTarget::Ip(_) => DnsRecordType::Ptr,
                    _ => DnsRecordType::All,
                };
                self.resolve_dns(target, record_type)?
            }
        };
        tracing::debug!(query = %target, endpoint = %endpoint, "resolved endpoint");
        Ok(endpoint)
    }

    async fn resolve_rdap(&self, target: &QueryTarget) -> Result<Endpoint, LookupError> {
        if let Some(base) = target.tld().and_then(static_rdap_server) {
            return Ok(Endpoint::rdap(base));
        }

        if !self.use_bootstrap {
            return Err(self.no_rdap_server(target, "bootstrap disabled"));
        }

        let category = BootstrapCategory::for_target(target);
        let registry = self.bootstrap.get(category).await.map_err(|e| {
            tracing::warn!(file = category.file_name(), error = %e, "bootstrap fetch failed");
            LookupError::endpoint_resolution(
                target.to_string(),
                "RDAP",
                format!("bootstrap file {} unavailable: {}", category.file_name(), e),
            )
        })?;

        registry
            .lookup(target)
            .map(Endpoint::rdap)
            .ok_or_else(|| self.no_rdap_server(target, "not in IANA bootstrap registry"))
    }

    fn no_rdap_server(&self, target: &QueryTarget, reason: &str) -> LookupError {
        match target.tld() {
            Some(tld) => LookupError::unsupported_tld(tld, "RDAP"),
            None => LookupError::endpoint_resolution(target.to_string(), "RDAP", reason),
        }
    }

    fn resolve_whois(&self, target: &QueryTarget) -> Result<Endpoint, LookupError> {
        match target {
            QueryTarget::Domain(_) => {
                let tld = target.tld().unwrap_or_default();
                static_whois_server(tld)
                    .map(Endpoint::whois)
                    .ok_or_else(|| LookupError::unsupported_tld(tld, "WHOIS"))
            }
            QueryTarget::Ip(_) | QueryTarget::Asn(_) => Ok(Endpoint::whois(IANA_WHOIS_SERVER)),
        }
    }

    /// DNS endpoint for the configured resolver.
    pub fn resolve_dns(
        &self,
        target: &QueryTarget,
        record_type: DnsRecordType,
    ) -> Result<Endpoint, LookupError> {
        if let QueryTarget::Asn(_) = target {
            return Err(LookupError::validation(
                target.to_string(),
                "DNS lookups need a domain name or an IP address",
            ));
        }
        Ok(Endpoint::Dns {
            resolver: self.dns_resolver,
            record_type,
        })
    }
}
