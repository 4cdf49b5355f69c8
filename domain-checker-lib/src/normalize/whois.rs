//! WHOIS free text to [`NormalizedRecord`].
//!
//! Responses are read as `Key: value` lines. Registries disagree on key names,
//! so each field accepts a list of spellings. Indented blocks under an empty
//! key (`Name servers:` followed by one host per line) are supported too.

use super::dates::parse_date;
use crate::types::{Contact, NormalizedRecord, Protocol};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Registrant,
    Admin,
    Tech,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContactField {
    Name,
    Organization,
    Email,
    Phone,
    Street,
    City,
    State,
    PostalCode,
    Country,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Registrar,
    Created,
    Expires,
    Updated,
    Status,
    NameServer,
    Contact(Role, ContactField),
}

const REGISTRAR_KEYS: &[&str] = &["registrar", "sponsoring registrar", "registrar name"];

const CREATED_KEYS: &[&str] = &[
    "creation date",
    "created",
    "created on",
    "created date",
    "registered on",
    "registered",
    "registration time",
    "registration date",
    "domain registration date",
    "regdate",
];

const EXPIRES_KEYS: &[&str] = &[
    "registry expiry date",
    "registrar registration expiration date",
    "expiration date",
    "expiry date",
    "expires",
    "expires on",
    "expire date",
    "expiration time",
    "paid-till",
    "renewal date",
];

const UPDATED_KEYS: &[&str] = &[
    "updated date",
    "updated",
    "last updated",
    "last updated on",
    "last modified",
    "last-modified",
    "last-update",
    "modified",
    "changed",
];

const STATUS_KEYS: &[&str] = &["domain status", "status", "state", "registration status"];

const NAME_SERVER_KEYS: &[&str] = &[
    "name server",
    "name servers",
    "nameserver",
    "nameservers",
    "nserver",
    "dns",
];

fn classify(key: &str) -> Option<Field> {
    let is = |keys: &[&str]| keys.contains(&key);

    if is(REGISTRAR_KEYS) {
        return Some(Field::Registrar);
    }
    if is(CREATED_KEYS) {
        return Some(Field::Created);
    }
    if is(EXPIRES_KEYS) {
        return Some(Field::Expires);
    }
    if is(UPDATED_KEYS) {
        return Some(Field::Updated);
    }
    if is(STATUS_KEYS) {
        return Some(Field::Status);
    }
    if is(NAME_SERVER_KEYS) {
        return Some(Field::NameServer);
    }
    match key {
        "registrant" => return Some(Field::Contact(Role::Registrant, ContactField::Name)),
        "orgname" | "org-name" => {
            return Some(Field::Contact(Role::Registrant, ContactField::Organization))
        }
        _ => {}
    }

    let (role, rest) = [
        ("registrant ", Role::Registrant),
        ("administrative contact ", Role::Admin),
        ("administrative ", Role::Admin),
        ("admin ", Role::Admin),
        ("technical contact ", Role::Tech),
        ("technical ", Role::Tech),
        ("tech ", Role::Tech),
    ]
    .iter()
    .find_map(|(prefix, role)| key.strip_prefix(prefix).map(|rest| (*role, rest)))?;

    let field = match rest {
        "name" | "contact name" => ContactField::Name,
        "organization" | "organisation" | "org" | "company" => ContactField::Organization,
        "email" | "e-mail" | "contact email" => ContactField::Email,
        "phone" | "phone number" | "telephone" => ContactField::Phone,
        "street" | "street1" | "street2" | "street3" | "address" | "address1" | "address2" => {
            ContactField::Street
        }
        "city" => ContactField::City,
        "state/province" | "state" | "province" => ContactField::State,
        "postal code" | "postcode" | "zip" | "zip code" => ContactField::PostalCode,
        "country" | "country code" => ContactField::Country,
        _ => return None,
    };
    Some(Field::Contact(role, field))
}

/// Contact fields collected line by line; street lines accumulate.
#[derive(Debug, Default)]
struct ContactBuilder {
    name: Option<String>,
    organization: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    street: Vec<String>,
    city: Option<String>,
    state: Option<String>,
    postal_code: Option<String>,
    country: Option<String>,
}

impl ContactBuilder {
    fn set(&mut self, field: ContactField, value: &str) {
        let value = value.to_string();
        let slot = match field {
            ContactField::Street => {
                self.street.push(value);
                return;
            }
            ContactField::Name => &mut self.name,
            ContactField::Organization => &mut self.organization,
            ContactField::Email => &mut self.email,
            ContactField::Phone => &mut self.phone,
            ContactField::City => &mut self.city,
            ContactField::State => &mut self.state,
            ContactField::PostalCode => &mut self.postal_code,
            ContactField::Country => &mut self.country,
        };
        slot.get_or_insert(value);
    }

    fn build(self) -> Option<Contact> {
        let address: Vec<String> = self
            .street
            .into_iter()
            .chain(self.city)
            .chain(self.state)
            .chain(self.postal_code)
            .chain(self.country)
            .collect();

        Contact {
            name: self.name,
            organization: self.organization,
            email: self.email,
            phone: self.phone,
            address: (!address.is_empty()).then(|| address.join(", ")),
        }
        .non_empty()
    }
}

/// Extract registration data from a WHOIS response.
pub fn normalize_whois(domain: &str, text: &str) -> NormalizedRecord {
    let mut record = NormalizedRecord::empty(domain, Protocol::Whois, text.to_string());
    let mut registrant = ContactBuilder::default();
    let mut admin = ContactBuilder::default();
    let mut tech = ContactBuilder::default();

    // Field awaiting indented continuation lines.
    let mut block: Option<Field> = None;

    for line in text.lines() {
        let trimmed = line.trim();

        if trimmed.starts_with(">>>") {
            break;
        }
        if trimmed.is_empty() {
            block = None;
            continue;
        }
        if trimmed.starts_with('%') || trimmed.starts_with('#') {
            continue;
        }

        let indented = line.starts_with(char::is_whitespace);
        let keyed = trimmed
            .split_once(':')
            .and_then(|(key, value)| classify(&normalize_key(key)).map(|f| (f, value.trim())));

        let (field, value) = match (keyed, block) {
            (Some((field, value)), _) => {
                if value.is_empty() {
                    block = Some(field);
                    continue;
                }
                block = None;
                (field, value)
            }
            (None, Some(field)) if indented => (field, trimmed),
            (None, _) => {
                block = None;
                continue;
            }
        };

        match field {
            Field::Registrar => {
                record.registrar.get_or_insert_with(|| value.to_string());
                // A registrar block carries the name first, then URLs and tags.
                block = None;
            }
            Field::Created => record.creation_date = record.creation_date.or(parse_date(value)),
            Field::Expires => {
                record.expiration_date = record.expiration_date.or(parse_date(value))
            }
            Field::Updated => record.updated_date = record.updated_date.or(parse_date(value)),
            Field::Status => {
                let status = status_code(value);
                if !status.is_empty() && !record.status.contains(&status) {
                    record.status.push(status);
                }
            }
            Field::NameServer => {
                if let Some(host) = value.split_whitespace().next() {
                    let host = host.trim_end_matches('.').to_ascii_lowercase();
                    if !host.is_empty() && !record.name_servers.contains(&host) {
                        record.name_servers.push(host);
                    }
                }
            }
            Field::Contact(role, contact_field) => {
                let builder = match role {
                    Role::Registrant => &mut registrant,
                    Role::Admin => &mut admin,
                    Role::Tech => &mut tech,
                };
                builder.set(contact_field, value);
            }
        }
    }

    record.registrant = registrant.build();
    record.admin_contact = admin.build();
    record.tech_contact = tech.build();
    record
}

/// Lowercase, single-spaced key without surrounding punctuation.
fn normalize_key(key: &str) -> String {
    key.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches(|c: char| c == '.' || c == '[' || c == ']')
        .to_ascii_lowercase()
}

/// `clientTransferProhibited https://icann.org/epp#clientTransferProhibited`
/// becomes `clientTransferProhibited`.
fn status_code(value: &str) -> String {
    value
        .split_whitespace()
        .filter(|token| {
            let token = token.trim_start_matches('(');
            !token.starts_with("http://") && !token.starts_with("https://")
        })
        .collect::<Vec<_>>()
        .join(" ")
}
