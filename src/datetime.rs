//! Date-time normalization for portal timestamps
//!
//! The portal mixes several naive formats. Every accepted input is read as a
//! wall-clock time without zone and pinned to UTC.

use crate::logging::get_logger;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Accepted date-time layouts, tried in order. First match wins.
const DATETIME_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a portal timestamp into a UTC instant.
///
/// Returns `None` when no accepted format matches; callers must treat that as
/// "unknown", never as zero or now.
pub fn parse_datetime(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();

    for fmt in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, fmt) {
            return Some(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(input, DATE_FORMAT)
        && let Some(naive) = date.and_hms_opt(0, 0, 0)
    {
        return Some(naive.and_utc());
    }

    get_logger("datetime").warn(&format!("Failed to parse datetime '{}'", input));
    None
}
