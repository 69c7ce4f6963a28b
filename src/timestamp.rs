//! Parsing of the ATSPM timestamp strings.

use chrono::{DateTime, NaiveDateTime};
use thiserror::Error;

const FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// Format used when sending timestamps to the API.
pub const REQUEST_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unrecognised timestamp '{0}'")]
pub struct TimestampError(pub String);

/// Parses an ISO-8601-like timestamp into a wall-clock instant.
///
/// Fractional seconds are truncated, never rounded: everything from the first
/// `.` onward is discarded before parsing. Strings carrying a `Z` or an offset
/// keep their local wall-clock part.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, TimestampError> {
    let trimmed = raw.trim();
    let whole = match trimmed.split_once('.') {
        Some((head, _)) => head,
        None => trimmed,
    };

    for format in FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(whole, format) {
            return Ok(ts);
        }
    }

    DateTime::parse_from_rfc3339(whole)
        .map(|ts| ts.naive_local())
        .map_err(|_| TimestampError(raw.to_string()))
}
