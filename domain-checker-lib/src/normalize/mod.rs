//! Response normalization.
//!
//! Turns each protocol's raw payload into one [`NormalizedRecord`]. These are
//! pure functions: missing or malformed optional fields are left empty and the
//! same payload always yields the same record.

use crate::types::{NormalizedRecord, QueryTarget, RawResponse};

pub mod dates;
mod dns;
mod rdap;
mod whois;

pub use dates::parse_date;
pub use dns::normalize_dns;
pub use rdap::normalize_rdap;
pub use whois::normalize_whois;

/// Normalize a raw response for `target`.
pub fn normalize(target: &QueryTarget, raw: &RawResponse) -> NormalizedRecord {
    let domain = target.to_string();
    match raw {
        RawResponse::Whois { text, .. } => normalize_whois(&domain, text),
        RawResponse::Rdap { body, json, .. } => normalize_rdap(&domain, json, body),
        RawResponse::Dns {
            records,
            name_servers,
            ..
        } => normalize_dns(&domain, records, name_servers, raw.raw_text()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Protocol;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn full_rdap_payload() -> serde_json::Value {
        let entity = |role: &str, name: &str| {
            json!({
                "objectClassName": "entity",
                "roles": [role],
                "vcardArray": ["vcard", [
                    ["version", {}, "text", "4.0"],
                    ["fn", {}, "text", name],
                    ["org", {}, "text", format!("{} Org", name)],
                    ["email", {}, "text", format!("{}@example.com", role)],
                    ["tel", {}, "uri", "tel:+1.5555550100"],
                    ["adr", {"label": "1 Main St\nSpringfield"}, "text", ["", "", "", "", "", "", ""]]
                ]]
            })
        };

        json!({
            "objectClassName": "domain",
            "ldhName": "EXAMPLE.COM",
            "status": ["client delete prohibited", "client transfer prohibited"],
            "events": [
                {"eventAction": "registration", "eventDate": "1995-08-14T04:00:00Z"},
                {"eventAction": "expiration", "eventDate": "2025-08-13T04:00:00Z"},
                {"eventAction": "last changed", "eventDate": "2024-08-14T07:01:34Z"}
            ],
            "nameservers": [
                {"objectClassName": "nameserver", "ldhName": "A.IANA-SERVERS.NET"},
                {"objectClassName": "nameserver", "ldhName": "B.IANA-SERVERS.NET"}
            ],
            "entities": [
                {
                    "objectClassName": "entity",
                    "roles": ["registrar"],
                    "handle": "376",
                    "vcardArray": ["vcard", [
                        ["version", {}, "text", "4.0"],
                        ["fn", {}, "text", "RESERVED-Internet Assigned Numbers Authority"]
                    ]]
                },
                entity("registrant", "Registrant Person"),
                entity("administrative", "Admin Person"),
                entity("technical", "Tech Person")
            ]
        })
    }

    fn rdap_raw(json: serde_json::Value) -> RawResponse {
        RawResponse::Rdap {
            url: "https://rdap.verisign.com/com/v1/domain/example.com".to_string(),
            body: json.to_string(),
            json,
        }
    }

    #[test]
    fn test_full_rdap_payload_round_trip() {
        let target = QueryTarget::Domain("example.com".to_string());
        let record = normalize(&target, &rdap_raw(full_rdap_payload()));

        assert_eq!(record.source, Protocol::Rdap);
        assert_eq!(record.domain, "example.com");
        assert_eq!(
            record.registrar.as_deref(),
            Some("RESERVED-Internet Assigned Numbers Authority")
        );
        assert_eq!(
            record.creation_date,
            Some(Utc.with_ymd_and_hms(1995, 8, 14, 4, 0, 0).unwrap())
        );
        assert_eq!(
            record.expiration_date,
            Some(Utc.with_ymd_and_hms(2025, 8, 13, 4, 0, 0).unwrap())
        );
        assert_eq!(
            record.updated_date,
            Some(Utc.with_ymd_and_hms(2024, 8, 14, 7, 1, 34).unwrap())
        );
        assert_eq!(
            record.name_servers,
            vec!["a.iana-servers.net", "b.iana-servers.net"]
        );

        for (contact, role, name) in [
            (&record.registrant, "registrant", "Registrant Person"),
            (&record.admin_contact, "administrative", "Admin Person"),
            (&record.tech_contact, "technical", "Tech Person"),
        ] {
            let contact = contact.as_ref().unwrap();
            assert_eq!(contact.name.as_deref(), Some(name));
            assert_eq!(
                contact.organization.as_deref(),
                Some(format!("{} Org", name).as_str())
            );
            assert_eq!(
                contact.email.as_deref(),
                Some(format!("{}@example.com", role).as_str())
            );
            assert_eq!(contact.phone.as_deref(), Some("+1.5555550100"));
            assert_eq!(contact.address.as_deref(), Some("1 Main St, Springfield"));
        }
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let target = QueryTarget::Domain("example.com".to_string());
        let raw = rdap_raw(full_rdap_payload());
        let first = normalize(&target, &raw);
        let second = normalize(&target, &raw);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );

        let whois = RawResponse::Whois {
            server: "whois.verisign-grs.com".to_string(),
            text: "Registrar: Example\nCreation Date: 2001-01-01\n".to_string(),
        };
        assert_eq!(normalize(&target, &whois), normalize(&target, &whois));
    }

    #[test]
    fn test_raw_payload_preserved() {
        let target = QueryTarget::Domain("example.com".to_string());
        let raw = rdap_raw(full_rdap_payload());
        let record = normalize(&target, &raw);
        assert_eq!(record.raw_data, raw.raw_text());
    }
}
