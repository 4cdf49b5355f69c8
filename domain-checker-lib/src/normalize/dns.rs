//! DNS answers to [`NormalizedRecord`].

use crate::types::{Contact, DnsRecord, DnsRecordType, NormalizedRecord, Protocol};

/// DNS carries no registration data beyond name servers and the SOA contact.
pub fn normalize_dns(
    domain: &str,
    records: &[DnsRecord],
    name_servers: &[String],
    raw_data: String,
) -> NormalizedRecord {
    let mut record = NormalizedRecord::empty(domain, Protocol::Dns, raw_data);
    record.dns_records = records.to_vec();
    record.name_servers = name_servers.to_vec();

    record.registrant = records
        .iter()
        .find(|r| r.record_type == DnsRecordType::Soa)
        .and_then(|soa| soa_contact(&soa.value));

    record
}

/// `mname rname serial ...`: the RNAME mailbox encodes the first dot as `@`.
fn soa_contact(value: &str) -> Option<Contact> {
    let rname = value.split_whitespace().nth(1)?;
    let email = match rname.split_once('.') {
        Some((local, domain)) if !domain.is_empty() => format!("{}@{}", local, domain),
        _ => rname.to_string(),
    };

    Some(Contact {
        name: Some("DNS Administrator".to_string()),
        email: Some(email),
        ..Contact::default()
    })
}
