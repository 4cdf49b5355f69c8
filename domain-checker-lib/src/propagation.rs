//! DNS propagation checks.
//!
//! The same query goes to every resolver of a roster at once. Answers are
//! grouped by their value set; the largest group over the number of resolvers
//! that answered at all is the propagation percentage.

use crate::error::LookupError;
use crate::normalize::normalize;
use crate::protocols::LookupClient;
use crate::types::{
    DnsRecord, DnsRecordType, Endpoint, LookupMethod, LookupOutcome, PropagationResult, Protocol,
    PublicResolver, QueryTarget, RawResponse, ResolverResult, ValueSetGroup,
};
use futures::future::join_all;
use std::net::{IpAddr, Ipv4Addr};
use std::time::{Duration, Instant};

/// Built-in roster: (name, address, region).
const DEFAULT_ROSTER: [(&str, [u8; 4], &str); 20] = [
    ("Google Public DNS (Primary)", [8, 8, 8, 8], "Global"),
    ("Google Public DNS (Secondary)", [8, 8, 4, 4], "Global"),
    ("Cloudflare DNS (Primary)", [1, 1, 1, 1], "Global"),
    ("Cloudflare DNS (Secondary)", [1, 0, 0, 1], "Global"),
    ("Quad9 DNS", [9, 9, 9, 9], "Global"),
    ("OpenDNS (Primary)", [208, 67, 222, 222], "Global"),
    ("OpenDNS (Secondary)", [208, 67, 220, 220], "Global"),
    ("Level3 DNS (Primary)", [4, 2, 2, 1], "North America"),
    ("Level3 DNS (Secondary)", [4, 2, 2, 2], "North America"),
    ("Comcast DNS", [75, 75, 75, 75], "North America"),
    ("AT&T DNS", [68, 94, 156, 1], "North America"),
    ("DNS.WATCH (Primary)", [84, 200, 69, 80], "Europe"),
    ("DNS.WATCH (Secondary)", [84, 200, 70, 40], "Europe"),
    ("Neustar DNS", [156, 154, 70, 1], "Global"),
    ("Norton ConnectSafe", [199, 85, 126, 10], "Global"),
    ("AdGuard DNS", [94, 140, 14, 14], "Global"),
    ("Verisign DNS", [64, 6, 64, 6], "Global"),
    ("FreeDNS", [37, 235, 1, 174], "Europe"),
    ("Alternate DNS", [76, 76, 19, 19], "North America"),
    ("CleanBrowsing", [185, 228, 168, 9], "Global"),
];

/// The built-in resolver roster.
pub fn default_resolvers() -> Vec<PublicResolver> {
    DEFAULT_ROSTER
        .iter()
        .map(|(name, ip, location)| PublicResolver {
            name: name.to_string(),
            ip: IpAddr::V4(Ipv4Addr::from(*ip)),
            location: location.to_string(),
        })
        .collect()
}

/// Roster entries in one region (case-insensitive).
pub fn resolvers_by_location(roster: &[PublicResolver], location: &str) -> Vec<PublicResolver> {
    roster
        .iter()
        .filter(|r| r.location.eq_ignore_ascii_case(location))
        .cloned()
        .collect()
}

/// Query every resolver concurrently, each under its own timeout.
pub async fn check_propagation(
    client: &dyn LookupClient,
    input: &str,
    target: &QueryTarget,
    record_type: DnsRecordType,
    roster: &[PublicResolver],
    timeout: Duration,
) -> PropagationResult {
    let start = Instant::now();
    tracing::debug!(query = %target, record_type = %record_type, resolvers = roster.len(), "propagation check");

    let results = join_all(
        roster
            .iter()
            .map(|resolver| query_resolver(client, input, target, record_type, resolver, timeout)),
    )
    .await;

    aggregate(input, record_type, results, start.elapsed())
}

async fn query_resolver(
    client: &dyn LookupClient,
    input: &str,
    target: &QueryTarget,
    record_type: DnsRecordType,
    resolver: &PublicResolver,
    timeout: Duration,
) -> ResolverResult {
    let start = Instant::now();
    let endpoint = Endpoint::Dns {
        resolver: Some(resolver.ip),
        record_type,
    };

    let response = match tokio::time::timeout(timeout, client.lookup(&endpoint, target, timeout)).await
    {
        Ok(response) => response,
        Err(_) => Err(LookupError::timeout(
            format!("DNS query to {} ({})", resolver.name, resolver.ip),
            timeout,
        )),
    };

    let (outcome, values) = match response {
        Ok(raw) => {
            let values = match &raw {
                RawResponse::Dns { records, .. } => answer_values(records, record_type),
                _ => Vec::new(),
            };
            let record = normalize(target, &raw);
            (
                LookupOutcome::succeeded(input, LookupMethod::Dig, record, start.elapsed()),
                values,
            )
        }
        Err(error) => {
            tracing::debug!(resolver = %resolver.ip, error = %error, "resolver failed");
            (
                LookupOutcome::failed(
                    input,
                    LookupMethod::Dig,
                    Some(Protocol::Dns),
                    error,
                    start.elapsed(),
                ),
                Vec::new(),
            )
        }
    };

    ResolverResult {
        resolver: resolver.clone(),
        outcome,
        values,
    }
}

/// Sorted, de-duplicated answer values for comparison across resolvers.
///
/// MX preference is dropped so only the exchanges are compared.
pub fn answer_values(records: &[DnsRecord], record_type: DnsRecordType) -> Vec<String> {
    let mut values: Vec<String> = records
        .iter()
        .filter(|r| record_type.is_meta() || r.record_type == record_type)
        .map(|r| {
            let value = match r.record_type {
                DnsRecordType::Mx => r
                    .value
                    .split_whitespace()
                    .last()
                    .unwrap_or(r.value.as_str())
                    .to_string(),
                _ => r.value.clone(),
            };
            if record_type.is_meta() {
                format!("{} {}", r.record_type, value)
            } else {
                value
            }
        })
        .collect();
    values.sort();
    values.dedup();
    values
}

/// Group answers by value set and compute the verdict.
///
/// Exact set equality is agreement; a superset of another answer is a
/// different group.
pub fn aggregate(
    target: &str,
    record_type: DnsRecordType,
    results: Vec<ResolverResult>,
    total_time: Duration,
) -> PropagationResult {
    let mut value_sets: Vec<ValueSetGroup> = Vec::new();
    for result in results.iter().filter(|r| r.answered()) {
        let mut values = result.values.clone();
        values.sort();
        values.dedup();
        match value_sets.iter_mut().find(|g| g.values == values) {
            Some(group) => group.resolvers.push(result.resolver.name.clone()),
            None => value_sets.push(ValueSetGroup {
                values,
                resolvers: vec![result.resolver.name.clone()],
            }),
        }
    }
    // Stable: equal-sized groups keep first-seen order.
    value_sets.sort_by(|a, b| b.resolvers.len().cmp(&a.resolvers.len()));

    let total_resolvers = results.len();
    let successful = results.iter().filter(|r| r.answered()).count();
    let majority_size = value_sets.first().map_or(0, |g| g.resolvers.len());
    let propagation_percentage = if successful == 0 {
        0.0
    } else {
        (majority_size as f64 * 100.0) / successful as f64
    };

    PropagationResult {
        target: target.to_string(),
        record_type,
        results,
        value_sets,
        total_resolvers,
        successful,
        failed: total_resolvers - successful,
        majority_size,
        propagation_percentage,
        fully_propagated: successful > 0 && majority_size == successful,
        total_time,
    }
}
