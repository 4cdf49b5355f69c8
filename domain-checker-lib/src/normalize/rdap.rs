//! RDAP JSON to [`NormalizedRecord`].

use super::dates::parse_date;
use crate::types::{Contact, NormalizedRecord, Protocol};
use serde_json::Value;

/// Extract registration data from an RDAP object (domain, ip network or autnum).
pub fn normalize_rdap(domain: &str, json: &Value, body: &str) -> NormalizedRecord {
    let mut record = NormalizedRecord::empty(domain, Protocol::Rdap, body.to_string());

    if let Some(events) = json.get("events").and_then(|e| e.as_array()) {
        for event in events {
            let action = event
                .get("eventAction")
                .and_then(|a| a.as_str())
                .map(|a| a.to_ascii_lowercase());
            let date = event
                .get("eventDate")
                .and_then(|d| d.as_str())
                .and_then(parse_date);

            match action.as_deref() {
                Some("registration") => record.creation_date = record.creation_date.or(date),
                Some("expiration") => record.expiration_date = record.expiration_date.or(date),
                Some("last changed") => record.updated_date = record.updated_date.or(date),
                _ => {}
            }
        }
    }

    if let Some(statuses) = json.get("status").and_then(|s| s.as_array()) {
        for status in statuses.iter().filter_map(|s| s.as_str()) {
            if !record.status.iter().any(|s| s == status) {
                record.status.push(status.to_string());
            }
        }
    }

    if let Some(nameservers) = json.get("nameservers").and_then(|ns| ns.as_array()) {
        for nameserver in nameservers {
            if let Some(ldh_name) = nameserver.get("ldhName").and_then(|name| name.as_str()) {
                let name = ldh_name.trim_end_matches('.').to_ascii_lowercase();
                if !name.is_empty() && !record.name_servers.contains(&name) {
                    record.name_servers.push(name);
                }
            }
        }
    }

    let entities = json
        .get("entities")
        .and_then(|e| e.as_array())
        .map(Vec::as_slice)
        .unwrap_or_default();

    record.registrar = find_entity(entities, "registrar").and_then(|entity| {
        extract_vcard_name(entity).or_else(|| extract_entity_identifier(entity))
    });
    record.registrant = find_entity(entities, "registrant").and_then(parse_contact);
    record.admin_contact = find_entity(entities, "administrative").and_then(parse_contact);
    record.tech_contact = find_entity(entities, "technical").and_then(parse_contact);

    record
}

/// Depth-first search for the first entity carrying `role`.
///
/// Registries nest contacts under the registrar entity (abuse contacts) or
/// under each other, so the search descends into `entities` of entities.
fn find_entity<'a>(entities: &'a [Value], role: &str) -> Option<&'a Value> {
    for entity in entities {
        let has_role = entity
            .get("roles")
            .and_then(|r| r.as_array())
            .is_some_and(|roles| roles.iter().any(|r| r.as_str() == Some(role)));
        if has_role {
            return Some(entity);
        }
    }

    entities.iter().find_map(|entity| {
        entity
            .get("entities")
            .and_then(|e| e.as_array())
            .and_then(|nested| find_entity(nested, role))
    })
}

/// vCard properties: `[name, params, type, value...]`.
fn vcard_properties(entity: &Value) -> impl Iterator<Item = &Vec<Value>> + '_ {
    entity
        .get("vcardArray")
        .and_then(|v| v.as_array())
        .and_then(|a| a.get(1))
        .and_then(|a| a.as_array())
        .into_iter()
        .flatten()
        .filter_map(|item| item.as_array())
        .filter(|item| item.len() >= 4)
}

fn vcard_property<'a>(entity: &'a Value, name: &str) -> Option<&'a [Value]> {
    vcard_properties(entity)
        .find(|item| item.first().and_then(|n| n.as_str()) == Some(name))
        .map(Vec::as_slice)
}

/// Organization name from the vCard `fn` property.
fn extract_vcard_name(entity: &Value) -> Option<String> {
    vcard_property(entity, "fn").and_then(|item| text_value(&item[3]))
}

/// Entity identifier from publicIds, handle, or name.
fn extract_entity_identifier(entity: &Value) -> Option<String> {
    if let Some(id) = entity
        .get("publicIds")
        .and_then(|p| p.as_array())
        .and_then(|ids| ids.first())
        .and_then(|id| id.get("identifier"))
        .and_then(|i| i.as_str())
    {
        return Some(id.to_string());
    }

    entity
        .get("handle")
        .or_else(|| entity.get("name"))
        .and_then(|h| h.as_str())
        .map(String::from)
}

fn parse_contact(entity: &Value) -> Option<Contact> {
    let text = |name: &str| vcard_property(entity, name).and_then(|item| text_value(&item[3]));

    let contact = Contact {
        name: text("fn"),
        organization: text("org"),
        email: text("email"),
        phone: text("tel").map(|t| t.trim_start_matches("tel:").to_string()),
        address: vcard_property(entity, "adr").and_then(address_value),
    };
    contact.non_empty()
}

/// A string value, or the non-empty parts of a structured value joined.
fn text_value(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Array(parts) => parts
            .iter()
            .filter_map(|p| p.as_str())
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        _ => String::new(),
    };
    (!text.is_empty()).then_some(text)
}

/// `adr` prefers the formatted `label` parameter over the component array.
fn address_value(item: &[Value]) -> Option<String> {
    let label = item
        .get(1)
        .and_then(|params| params.get("label"))
        .and_then(|l| l.as_str())
        .map(|l| {
            l.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .collect::<Vec<_>>()
                .join(", ")
        })
        .filter(|l| !l.is_empty());

    label.or_else(|| {
        let components: Vec<String> = item[3]
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(text_value)
            .collect();
        (!components.is_empty()).then(|| components.join(", "))
    })
}
