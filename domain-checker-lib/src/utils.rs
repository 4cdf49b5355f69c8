//! Utility functions for target parsing and validation.
//!
//! This module turns raw user input into [`QueryTarget`] values and holds small
//! helpers shared by the protocol clients.

use crate::error::LookupError;
use crate::types::QueryTarget;
use std::net::IpAddr;
use std::path::Path;

/// Maximum length of a domain name in presentation format.
const MAX_DOMAIN_LEN: usize = 253;

/// Maximum length of a single label.
const MAX_LABEL_LEN: usize = 63;

/// Parse user input into a validated query target.
///
/// Accepts IP addresses, ASNs written as `AS<number>`, and domain names. Domains
/// are converted to lowercase punycode and checked label by label.
pub fn parse_target(input: &str) -> Result<QueryTarget, LookupError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(LookupError::validation(input, "Target cannot be empty"));
    }

    if let Ok(ip) = trimmed.parse::<IpAddr>() {
        return Ok(QueryTarget::Ip(ip));
    }

    if let Some(asn) = parse_asn(trimmed) {
        return Ok(QueryTarget::Asn(asn));
    }

    validate_domain(trimmed).map(QueryTarget::Domain)
}

/// Parse `AS15169` / `as15169` into a number.
fn parse_asn(input: &str) -> Option<u32> {
    let digits = input
        .strip_prefix("AS")
        .or_else(|| input.strip_prefix("as"))?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse::<u32>().ok()
}

/// Validate a domain name and return its normalized form.
///
/// Unicode labels are converted to punycode, the result is lowercased and a
/// trailing root dot is dropped.
pub fn validate_domain(domain: &str) -> Result<String, LookupError> {
    let domain = domain.trim().trim_end_matches('.');

    if domain.is_empty() {
        return Err(LookupError::validation(domain, "Domain name cannot be empty"));
    }

    if domain.contains("://") || domain.contains('/') {
        return Err(LookupError::validation(
            domain,
            "Expected a bare domain name, not a URL",
        ));
    }

    let ascii = idna::domain_to_ascii_strict(domain)
        .map_err(|_| LookupError::validation(domain, "Invalid internationalized domain name"))?
        .to_ascii_lowercase();

    if ascii.len() > MAX_DOMAIN_LEN {
        return Err(LookupError::validation(
            domain,
            format!(
                "Domain name exceeds maximum length of {} characters (got {})",
                MAX_DOMAIN_LEN,
                ascii.len()
            ),
        ));
    }

    let labels: Vec<&str> = ascii.split('.').collect();
    if labels.len() < 2 {
        return Err(LookupError::validation(
            domain,
            "Domain name must include a top-level domain",
        ));
    }

    for label in &labels {
        if let Err(reason) = check_label(label) {
            return Err(LookupError::validation(domain, reason));
        }
    }

    if let Some(tld) = labels.last() {
        if !is_valid_tld(tld) {
            return Err(LookupError::validation(
                domain,
                format!("Invalid top-level domain '{}'", tld),
            ));
        }
    }

    Ok(ascii)
}

fn check_label(label: &str) -> Result<(), String> {
    if label.is_empty() {
        return Err("Domain name contains an empty label".to_string());
    }
    if label.len() > MAX_LABEL_LEN {
        return Err(format!(
            "Label '{}' exceeds {} characters",
            label, MAX_LABEL_LEN
        ));
    }
    if label.starts_with('-') || label.ends_with('-') {
        return Err(format!("Label '{}' cannot start or end with a hyphen", label));
    }
    if !label
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(format!("Label '{}' contains invalid characters", label));
    }
    Ok(())
}

/// Top-level labels are alphabetic, or an IDN in `xn--` form.
fn is_valid_tld(tld: &str) -> bool {
    if tld.starts_with("xn--") {
        return tld.len() > 4;
    }
    tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic())
}

/// Build the reverse-lookup name for an address.
///
/// `192.0.2.1` becomes `1.2.0.192.in-addr.arpa`; IPv6 addresses are expanded to
/// nibbles under `ip6.arpa`.
pub fn reverse_pointer_name(ip: &IpAddr) -> String {
    match ip {
        IpAddr::V4(v4) => {
            let o = v4.octets();
            format!("{}.{}.{}.{}.in-addr.arpa", o[3], o[2], o[1], o[0])
        }
        IpAddr::V6(v6) => {
            let mut nibbles = Vec::with_capacity(32);
            for byte in v6.octets().iter().rev() {
                nibbles.push(format!("{:x}", byte & 0x0f));
                nibbles.push(format!("{:x}", byte >> 4));
            }
            format!("{}.ip6.arpa", nibbles.join("."))
        }
    }
}

/// Read targets from a text file, one per line.
///
/// Blank lines and lines starting with `#` are skipped; inline `#` comments are
/// stripped.
pub fn read_targets_file<P: AsRef<Path>>(path: P) -> Result<Vec<String>, LookupError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        LookupError::validation(
            path.to_string_lossy(),
            format!("Cannot read targets file: {}", e),
        )
    })?;

    let targets: Vec<String> = content
        .lines()
        .map(|line| line.split('#').next().unwrap_or("").trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    if targets.is_empty() {
        return Err(LookupError::validation(
            path.to_string_lossy(),
            "Targets file contains no entries",
        ));
    }

    Ok(targets)
}
