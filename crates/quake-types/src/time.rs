//! Timestamp helpers for the fixed local time zone (UTC+08:00).
//!
//! All persisted timestamps are naive local wall-clock times rendered as
//! `YYYY-MM-DD HH:MM:SS`. That rendering sorts lexicographically, so the
//! database can answer inclusive range predicates on the text columns.

use chrono::{DateTime, Duration, NaiveDateTime, Timelike, Utc};

/// Storage and display format for timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Offset of the local zone from UTC, in hours.
pub const LOCAL_UTC_OFFSET_HOURS: i64 = 8;

const ACCEPTED_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Error returned when a timestamp string matches none of the accepted forms.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognised timestamp: {0}")]
pub struct TimestampError(pub String);

/// Returns the current local wall-clock time, truncated to whole seconds.
pub fn local_now() -> NaiveDateTime {
    truncate_to_seconds(to_local(Utc::now()))
}

/// Converts an instant to local wall-clock time.
pub fn to_local(instant: DateTime<Utc>) -> NaiveDateTime {
    instant.naive_utc() + Duration::hours(LOCAL_UTC_OFFSET_HOURS)
}

/// Parses a timestamp into local wall-clock time.
///
/// Strings carrying an explicit offset (RFC 3339) are converted into the
/// local zone; naive strings are taken to already be local.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, TimestampError> {
    let trimmed = raw.trim();
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(truncate_to_seconds(to_local(with_offset.with_timezone(&Utc))));
    }
    ACCEPTED_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .map(truncate_to_seconds)
        .ok_or_else(|| TimestampError(raw.to_string()))
}

/// Renders a timestamp in the canonical storage format.
pub fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parses a timestamp previously written with [`format_timestamp`].
pub fn parse_stored(raw: &str) -> Result<NaiveDateTime, TimestampError> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT).map_err(|_| TimestampError(raw.to_string()))
}

/// Whole minutes elapsed from `start` to `end`, truncated toward zero and
/// never negative.
pub fn elapsed_minutes(start: NaiveDateTime, end: NaiveDateTime) -> i64 {
    (end - start).num_minutes().max(0)
}

fn truncate_to_seconds(ts: NaiveDateTime) -> NaiveDateTime {
    ts.with_nanosecond(0).unwrap_or(ts)
}

/// Serde adapter writing timestamps in the canonical storage format.
///
/// Use with `#[serde(with = "quake_types::time::canonical")]`.
pub mod canonical {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_timestamp(*ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_timestamp(&raw).map_err(serde::de::Error::custom)
    }
}
