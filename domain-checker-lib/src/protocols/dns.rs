//! DNS lookups through hickory-resolver.
//!
//! A resolver is built per lookup against the endpoint's nameserver (or the
//! system configuration), with caching off so repeated checks see live answers.

use super::LookupClient;
use crate::error::{ErrorKind, LookupError};
use crate::types::{DnsRecord, DnsRecordType, Endpoint, Protocol, QueryTarget, RawResponse};
use crate::utils::reverse_pointer_name;
use async_trait::async_trait;
use futures::future::join_all;
use hickory_resolver::{
    config::{NameServerConfigGroup, ResolverConfig, ResolverOpts},
    name_server::TokioConnectionProvider,
    proto::{
        rr::{record_data::RData, Record, RecordType},
        ProtoErrorKind,
    },
    ResolveError, TokioResolver,
};
use std::net::IpAddr;
use std::time::Duration;

/// DNS client. Stateless; every lookup gets a fresh resolver.
#[derive(Debug, Clone, Default)]
pub struct DnsClient;

impl DnsClient {
    pub fn new() -> Self {
        Self
    }

    async fn resolve(
        &self,
        resolver_ip: Option<IpAddr>,
        record_type: DnsRecordType,
        target: &QueryTarget,
        timeout: Duration,
    ) -> Result<RawResponse, LookupError> {
        let (name, record_type) = match target {
            QueryTarget::Domain(name) => (name.clone(), record_type),
            // Addresses always go through their reverse zone.
            QueryTarget::Ip(ip) => (reverse_pointer_name(ip), DnsRecordType::Ptr),
            QueryTarget::Asn(_) => {
                return Err(LookupError::validation(
                    target.to_string(),
                    "DNS lookups need a domain name or an IP address",
                ))
            }
        };

        let resolver = build_resolver(resolver_ip, timeout);
        let server = resolver_label(resolver_ip);
        tracing::debug!(name = %name, record_type = %record_type, server = %server, "DNS query");

        let types = record_type.constituents();
        let answers = join_all(
            types
                .iter()
                .map(|t| query_type(&resolver, &name, *t, &server)),
        )
        .await;

        let records = merge_answers(&name, answers)?;

        let name_servers = if types.contains(&DnsRecordType::Ns) {
            records
                .iter()
                .filter(|r| r.record_type == DnsRecordType::Ns)
                .map(|r| r.value.clone())
                .collect()
        } else if record_type == DnsRecordType::Ptr {
            Vec::new()
        } else {
            match query_type(&resolver, &name, DnsRecordType::Ns, &server).await {
                Ok(ns) => ns.into_iter().map(|r| r.value).collect(),
                Err(e) => {
                    tracing::debug!(name = %name, error = %e, "auxiliary NS query failed");
                    Vec::new()
                }
            }
        };

        Ok(RawResponse::Dns {
            resolver: resolver_ip,
            records,
            name_servers,
        })
    }
}

#[async_trait]
impl LookupClient for DnsClient {
    fn protocol(&self) -> Protocol {
        Protocol::Dns
    }

    async fn lookup(
        &self,
        endpoint: &Endpoint,
        target: &QueryTarget,
        timeout: Duration,
    ) -> Result<RawResponse, LookupError> {
        let Endpoint::Dns {
            resolver,
            record_type,
        } = endpoint
        else {
            return Err(LookupError::internal(format!(
                "DNS client cannot use endpoint {}",
                endpoint
            )));
        };

        match tokio::time::timeout(timeout, self.resolve(*resolver, *record_type, target, timeout))
            .await
        {
            Ok(result) => result.map_err(|e| e.with_budget(timeout)),
            Err(_) => Err(LookupError::timeout(
                format!("DNS {} lookup via {}", record_type, resolver_label(*resolver)),
                timeout,
            )),
        }
    }
}

/// Merge per-type answers, in query order, dropping repeated records.
///
/// One answered type is enough for success. With no answer at all, an
/// authoritative negative (NotFound) outranks a transport failure.
pub fn merge_answers(
    name: &str,
    answers: Vec<Result<Vec<DnsRecord>, LookupError>>,
) -> Result<Vec<DnsRecord>, LookupError> {
    let mut records: Vec<DnsRecord> = Vec::new();
    let mut first_error: Option<LookupError> = None;
    let mut not_found: Option<LookupError> = None;
    let mut answered = false;

    for answer in answers {
        match answer {
            Ok(batch) => {
                answered = true;
                for record in batch {
                    if !records.contains(&record) {
                        records.push(record);
                    }
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                not_found.get_or_insert(e);
            }
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }

    if answered {
        Ok(records)
    } else {
        Err(not_found
            .or(first_error)
            .unwrap_or_else(|| LookupError::not_found(name, "No records found")))
    }
}

/// Build a non-caching resolver for one nameserver, or for the system
/// configuration when `ns_ip` is `None`.
fn build_resolver(ns_ip: Option<IpAddr>, timeout: Duration) -> TokioResolver {
    let mut opts = ResolverOpts::default();
    opts.timeout = timeout;
    opts.attempts = 1;
    opts.cache_size = 0;

    if let Some(ns_ip) = ns_ip {
        let config = ResolverConfig::from_parts(
            None,
            vec![],
            NameServerConfigGroup::from_ips_clear(&[ns_ip], 53, true),
        );
        return TokioResolver::builder_with_config(config, TokioConnectionProvider::default())
            .with_options(opts)
            .build();
    }

    match TokioResolver::builder_tokio() {
        Ok(builder) => builder.with_options(opts).build(),
        Err(e) => {
            tracing::warn!(error = %e, "failed to load system DNS configuration, using defaults");
            TokioResolver::builder_with_config(
                ResolverConfig::default(),
                TokioConnectionProvider::default(),
            )
            .with_options(opts)
            .build()
        }
    }
}

fn resolver_label(ns_ip: Option<IpAddr>) -> String {
    ns_ip
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| "system resolver".to_string())
}

async fn query_type(
    resolver: &TokioResolver,
    name: &str,
    record_type: DnsRecordType,
    server: &str,
) -> Result<Vec<DnsRecord>, LookupError> {
    let Some(wire_type) = wire_type(record_type) else {
        return Err(LookupError::internal(format!(
            "{} is not a concrete record type",
            record_type
        )));
    };

    let lookup = resolver
        .lookup(name, wire_type)
        .await
        .map_err(|e| map_resolve_error(e, name, record_type, server))?;

    // Answers may carry a CNAME chain; keep only the type that was asked for.
    Ok(lookup
        .record_iter()
        .filter(|r| r.record_type() == wire_type)
        .map(|r| to_dns_record(r, record_type))
        .collect())
}

fn to_dns_record(record: &Record, record_type: DnsRecordType) -> DnsRecord {
    DnsRecord {
        record_type,
        name: record.name().to_string().trim_end_matches('.').to_string(),
        value: format_rdata(record.data()),
        ttl: record.ttl(),
    }
}

/// The wire type for a concrete record type.
fn wire_type(record_type: DnsRecordType) -> Option<RecordType> {
    match record_type {
        DnsRecordType::A => Some(RecordType::A),
        DnsRecordType::Aaaa => Some(RecordType::AAAA),
        DnsRecordType::Cname => Some(RecordType::CNAME),
        DnsRecordType::Mx => Some(RecordType::MX),
        DnsRecordType::Ns => Some(RecordType::NS),
        DnsRecordType::Ptr => Some(RecordType::PTR),
        DnsRecordType::Soa => Some(RecordType::SOA),
        DnsRecordType::Txt => Some(RecordType::TXT),
        DnsRecordType::Caa => Some(RecordType::CAA),
        DnsRecordType::Srv => Some(RecordType::SRV),
        DnsRecordType::All => None,
    }
}

/// Render record data the way `dig +short` does, minus trailing dots.
pub fn format_rdata(data: &RData) -> String {
    fn host(name: &impl ToString) -> String {
        name.to_string().trim_end_matches('.').to_string()
    }

    match data {
        RData::A(a) => a.0.to_string(),
        RData::AAAA(aaaa) => aaaa.0.to_string(),
        RData::CNAME(cname) => host(&cname.0),
        RData::NS(ns) => host(&ns.0),
        RData::PTR(ptr) => host(&ptr.0),
        RData::MX(mx) => format!("{} {}", mx.preference(), host(mx.exchange())),
        RData::TXT(txt) => txt
            .iter()
            .map(|part| String::from_utf8_lossy(part).into_owned())
            .collect::<String>(),
        RData::SOA(soa) => format!(
            "{} {} {} {} {} {} {}",
            host(soa.mname()),
            host(soa.rname()),
            soa.serial(),
            soa.refresh(),
            soa.retry(),
            soa.expire(),
            soa.minimum()
        ),
        RData::SRV(srv) => format!(
            "{} {} {} {}",
            srv.priority(),
            srv.weight(),
            srv.port(),
            host(srv.target())
        ),
        RData::CAA(caa) => format!(
            "{} {} \"{}\"",
            if caa.issuer_critical() { 128 } else { 0 },
            caa.tag().as_str(),
            String::from_utf8_lossy(caa.raw_value())
        ),
        other => other.to_string(),
    }
}

fn map_resolve_error(
    err: ResolveError,
    name: &str,
    record_type: DnsRecordType,
    server: &str,
) -> LookupError {
    if err.is_nx_domain() {
        return LookupError::not_found(name, format!("NXDOMAIN from {}", server));
    }
    if err.is_no_records_found() {
        return LookupError::not_found(name, format!("no {} records at {}", record_type, server));
    }

    match err.proto().map(|p| p.kind()) {
        Some(ProtoErrorKind::Timeout) => LookupError::timeout(
            format!("DNS {} query to {}", record_type, server),
            Duration::ZERO,
        ),
        Some(ProtoErrorKind::Io(_)) | Some(ProtoErrorKind::NoConnections) => {
            LookupError::connection(server, err.to_string())
        }
        _ => LookupError::protocol(server, err.to_string()),
    }
}
