//! Registration status policy.
//!
//! The verdict is the first matching rule in [`RULES`]. Each rule looks at the
//! normalized record, its raw payload, or the error of a failed lookup.

use crate::error::LookupError;
use crate::types::{NormalizedRecord, RegistrationStatus};

/// Phrases registries use to say "no such object".
pub const NEGATIVE_PHRASES: &[&str] = &[
    "no match",
    "not found",
    "no entries found",
    "no data found",
    "domain not found",
    "not registered",
    "no whois data available",
    "no information available",
    "no data available",
    "no object found",
    "status: free",
    "status: available",
];

/// Raw markers that only show up in a record for an existing registration.
pub const POSITIVE_MARKERS: &[&str] = &[
    "registrar:",
    "creation date:",
    "expiration date:",
    "name server:",
    "status: active",
    "status: ok",
    "domain name:",
    "registry domain id:",
];

/// What a rule inspects.
#[derive(Debug, Clone, Copy)]
pub enum Rule {
    /// The server said the object does not exist.
    ExplicitNotFound,
    /// Registrar, a date, or name servers were extracted.
    RegistrationFields,
    /// The error message contains a negative phrase.
    ErrorPhrase(&'static [&'static str]),
    /// The raw payload contains one of these phrases (case-insensitive).
    RawPhrase(&'static [&'static str]),
}

impl Rule {
    fn matches(&self, record: Option<&NormalizedRecord>, error: Option<&LookupError>) -> bool {
        match self {
            Rule::ExplicitNotFound => error.is_some_and(|e| e.indicates_not_registered()),
            Rule::RegistrationFields => record.is_some_and(|r| r.has_registration_data()),
            Rule::ErrorPhrase(phrases) => {
                error.is_some_and(|e| contains_any(&e.to_string(), phrases))
            }
            Rule::RawPhrase(phrases) => record.is_some_and(|r| contains_any(&r.raw_data, phrases)),
        }
    }
}

/// Ordered policy; the first match wins, otherwise `PossiblyRegistered`.
pub const RULES: &[(Rule, RegistrationStatus)] = &[
    (Rule::ExplicitNotFound, RegistrationStatus::NotRegistered),
    (Rule::RegistrationFields, RegistrationStatus::Registered),
    (
        Rule::ErrorPhrase(NEGATIVE_PHRASES),
        RegistrationStatus::NotRegistered,
    ),
    (Rule::RawPhrase(NEGATIVE_PHRASES), RegistrationStatus::NotRegistered),
    (Rule::RawPhrase(POSITIVE_MARKERS), RegistrationStatus::Registered),
];

/// Derive the registration status of a lookup.
pub fn evaluate(
    record: Option<&NormalizedRecord>,
    error: Option<&LookupError>,
) -> RegistrationStatus {
    RULES
        .iter()
        .find(|(rule, _)| rule.matches(record, error))
        .map(|(_, status)| *status)
        .unwrap_or(RegistrationStatus::PossiblyRegistered)
}

fn contains_any(haystack: &str, phrases: &[&str]) -> bool {
    let lower = haystack.to_lowercase();
    phrases.iter().any(|phrase| lower.contains(phrase))
}
