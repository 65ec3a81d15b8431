//! Persisted records: earthquakes, regional readings, and events.

use chrono::NaiveDateTime;
use quake_types::time::parse_stored;
use quake_types::{EventStatus, Intensity, Region, Severity};
use rusqlite::types::Type;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

/// A persisted earthquake. Never updated after ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Earthquake {
    pub id: i64,
    pub origin_time: NaiveDateTime,
    pub center: String,
    pub latitude: f64,
    pub longitude: f64,
    pub magnitude: f64,
    pub depth: f64,
    pub is_demo: bool,
}

/// One location's intensity reading for an earthquake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionalReading {
    pub id: i64,
    pub earthquake_id: i64,
    pub location: String,
    pub intensity: Intensity,
}

impl RegionalReading {
    /// The monitored region this reading maps to, if any.
    pub fn region(&self) -> Option<Region> {
        Region::match_location(&self.location)
    }
}

/// The alerting/response lifecycle record for one region of one earthquake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// `{earthquake_id}-{region code}`, e.g. `114097-tp`.
    pub id: String,
    pub reading_id: i64,
    pub region: Region,
    pub severity: Severity,
    /// Whether an alert was actually raised. A warranted alert can still be
    /// suppressed by an earlier one in the same region.
    pub triggered: bool,
    pub created_at: NaiveDateTime,
    pub ack_at: Option<NaiveDateTime>,
    pub reported_at: Option<NaiveDateTime>,
    pub is_damage: Option<bool>,
    pub is_operation_active: Option<bool>,
    pub closed_at: Option<NaiveDateTime>,
    /// Minutes from creation to closure; `-1` when closed without operator
    /// action.
    pub process_time: Option<i64>,
}

/// Sentinel `process_time` for events closed without being processed.
pub const UNPROCESSED: i64 = -1;

impl Event {
    /// Derives the lifecycle status from the populated timestamps.
    pub fn status(&self) -> EventStatus {
        if self.closed_at.is_some() {
            EventStatus::Closed
        } else if self.reported_at.is_some() {
            EventStatus::InProcess
        } else if self.ack_at.is_some() {
            EventStatus::Acknowledged
        } else {
            EventStatus::Unacknowledged
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed_at.is_some()
    }
}

pub(crate) const EVENT_COLUMNS: &str = "id, reading_id, region, severity, triggered, created_at, \
     ack_at, reported_at, is_damage, is_operation_active, closed_at, process_time";

pub(crate) fn map_event_row(row: &Row<'_>) -> rusqlite::Result<Event> {
    Ok(Event {
        id: row.get(0)?,
        reading_id: row.get(1)?,
        region: parsed_column(row, 2)?,
        severity: parsed_column(row, 3)?,
        triggered: row.get(4)?,
        created_at: timestamp_column(row, 5)?,
        ack_at: optional_timestamp_column(row, 6)?,
        reported_at: optional_timestamp_column(row, 7)?,
        is_damage: row.get(8)?,
        is_operation_active: row.get(9)?,
        closed_at: optional_timestamp_column(row, 10)?,
        process_time: row.get(11)?,
    })
}

pub(crate) fn map_earthquake_row(row: &Row<'_>) -> rusqlite::Result<Earthquake> {
    Ok(Earthquake {
        id: row.get(0)?,
        origin_time: timestamp_column(row, 1)?,
        center: row.get(2)?,
        latitude: row.get(3)?,
        longitude: row.get(4)?,
        magnitude: row.get(5)?,
        depth: row.get(6)?,
        is_demo: row.get(7)?,
    })
}

/// Reads a text column and parses it with `FromStr`.
pub(crate) fn parsed_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let raw: String = row.get(idx)?;
    parse_stored(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn optional_timestamp_column(
    row: &Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<NaiveDateTime>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|value| {
        parse_stored(&value)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}
