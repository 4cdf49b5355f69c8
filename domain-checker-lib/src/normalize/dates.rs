//! Date parsing for registry payloads.
//!
//! Registries format dates however they like. Values without a zone are taken
//! as UTC; anything unrecognized yields `None`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Formats carrying an explicit offset.
const ZONED_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S %z",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
    "%d.%m.%Y %H:%M:%S",
    "%d-%b-%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%d/%m/%Y", "%d.%m.%Y", "%d-%b-%Y",
];

/// Parse a registry date into UTC.
pub fn parse_date(input: &str) -> Option<DateTime<Utc>> {
    let value = input.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    // "2024-01-01 00:00:00 UTC", "2024-01-01T00:00:00 GMT"
    let value = value
        .strip_suffix(" UTC")
        .or_else(|| value.strip_suffix(" GMT"))
        .or_else(|| value.strip_suffix(" (UTC)"))
        .unwrap_or(value)
        .trim();

    for format in ZONED_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(value, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }

    // Drop a trailing time-of-day the formats above did not cover.
    let date_part = value.split_whitespace().next().unwrap_or(value);
    let date_part = match date_part.get(..11) {
        Some(prefix) if prefix.ends_with('T') => &date_part[..10],
        _ => date_part,
    };

    if date_part.len() == 8 && date_part.bytes().all(|b| b.is_ascii_digit()) {
        let year = date_part[..4].parse().ok()?;
        let month = date_part[4..6].parse().ok()?;
        let day = date_part[6..].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc());
    }

    DATE_FORMATS.iter().find_map(|format| {
        NaiveDate::parse_from_str(date_part, format)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
    })
}
