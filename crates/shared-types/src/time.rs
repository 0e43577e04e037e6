//! Timestamp helpers.
//!
//! The wire format is fixed-width `YYYY-MM-DDTHH:MM:SSZ` (20 bytes, UTC, no
//! fractional seconds, no offset other than `Z`).

use chrono::{DateTime, NaiveDateTime, Utc};

/// `strftime` pattern of the wire format.
pub const WIRE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

const WIRE_LEN: usize = 20;

/// Format a UTC instant in the wire format.
#[must_use]
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(WIRE_FORMAT).to_string()
}

/// Current instant in the wire format.
#[must_use]
pub fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

/// Parse a wire timestamp, rejecting anything not exactly matching the pattern.
///
/// The shape is checked byte by byte before calendar validation, so inputs
/// such as `2024-5-01T10:00:00Z` or `2024-05-01T10:00:00+00:00` fail.
#[must_use]
pub fn parse_strict_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let bytes = raw.as_bytes();
    if bytes.len() != WIRE_LEN {
        return None;
    }
    for (i, b) in bytes.iter().enumerate() {
        let ok = match i {
            4 | 7 => *b == b'-',
            10 => *b == b'T',
            13 | 16 => *b == b':',
            19 => *b == b'Z',
            _ => b.is_ascii_digit(),
        };
        if !ok {
            return None;
        }
    }
    NaiveDateTime::parse_from_str(raw, WIRE_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Milliseconds since the Unix epoch.
#[must_use]
pub fn unix_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}
