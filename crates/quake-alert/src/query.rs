//! Read-side queries behind the report and simulation listings.

use chrono::NaiveDateTime;
use quake_types::{EventStatus, Intensity, RegionFilter, Region, Severity};
use rusqlite::{params_from_iter, types::Value, Connection};
use serde::Serialize;

use crate::classify::classify;
use crate::error::AlertError;
use crate::model::{
    map_earthquake_row, optional_timestamp_column, parsed_column, timestamp_column, Earthquake,
};

/// An event joined with its reading and earthquake, as shown in listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRow {
    pub event_id: String,
    pub earthquake_id: i64,
    pub earthquake_time: NaiveDateTime,
    /// When the event was created (the alert time).
    pub alert_time: NaiveDateTime,
    pub magnitude: f64,
    pub intensity: String,
    pub severity: Severity,
    pub region: Region,
    pub triggered: bool,
    pub ack_at: Option<NaiveDateTime>,
    pub reported_at: Option<NaiveDateTime>,
    pub closed_at: Option<NaiveDateTime>,
    pub is_damage: Option<bool>,
    pub is_operation_active: Option<bool>,
    pub process_time: Option<i64>,
}

fn status_condition(status: EventStatus) -> &'static str {
    match status {
        EventStatus::Unacknowledged => {
            "e.closed_at IS NULL AND e.ack_at IS NULL AND e.reported_at IS NULL"
        }
        EventStatus::Acknowledged => {
            "e.closed_at IS NULL AND e.ack_at IS NOT NULL AND e.reported_at IS NULL"
        }
        EventStatus::InProcess => "e.closed_at IS NULL AND e.reported_at IS NOT NULL",
        EventStatus::Closed => "e.closed_at IS NOT NULL",
    }
}

/// Lists events in `status`, newest first, optionally restricted to one
/// region.
pub fn fetch_by_status(
    conn: &Connection,
    status: EventStatus,
    filter: RegionFilter,
) -> Result<Vec<EventRow>, AlertError> {
    let mut sql = format!(
        "SELECT e.id, q.id, q.origin_time, e.created_at, q.magnitude, r.intensity,
                e.severity, e.region, e.triggered, e.ack_at, e.reported_at, e.closed_at,
                e.is_damage, e.is_operation_active, e.process_time
         FROM event e
         JOIN earthquake_reading r ON r.id = e.reading_id
         JOIN earthquake q ON q.id = r.earthquake_id
         WHERE {}",
        status_condition(status)
    );
    let mut bind: Vec<Value> = Vec::new();
    if let RegionFilter::Only(region) = filter {
        sql.push_str(" AND e.region = ?");
        bind.push(Value::Text(region.name().to_string()));
    }
    sql.push_str(" ORDER BY e.created_at DESC, e.id DESC");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(bind.iter()), |row| {
        Ok(EventRow {
            event_id: row.get(0)?,
            earthquake_id: row.get(1)?,
            earthquake_time: timestamp_column(row, 2)?,
            alert_time: timestamp_column(row, 3)?,
            magnitude: row.get(4)?,
            intensity: row.get(5)?,
            severity: parsed_column(row, 6)?,
            region: parsed_column(row, 7)?,
            triggered: row.get(8)?,
            ack_at: optional_timestamp_column(row, 9)?,
            reported_at: optional_timestamp_column(row, 10)?,
            closed_at: optional_timestamp_column(row, 11)?,
            is_damage: row.get(12)?,
            is_operation_active: row.get(13)?,
            process_time: row.get(14)?,
        })
    })?;

    let mut events = Vec::new();
    for row in rows {
        events.push(row?);
    }
    Ok(events)
}

/// A reading of a simulated earthquake with the severity it classifies to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulatedReading {
    pub location: String,
    pub intensity: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulatedEarthquake {
    #[serde(flatten)]
    pub earthquake: Earthquake,
    pub readings: Vec<SimulatedReading>,
}

/// Lists demo earthquakes, newest origin time first, with their readings.
pub fn list_simulated(conn: &Connection) -> Result<Vec<SimulatedEarthquake>, AlertError> {
    let mut quake_stmt = conn.prepare(
        "SELECT id, origin_time, center, latitude, longitude, magnitude, depth, is_demo
         FROM earthquake
         WHERE is_demo = 1
         ORDER BY origin_time DESC, id DESC",
    )?;
    let earthquakes = quake_stmt
        .query_map([], map_earthquake_row)?
        .collect::<Result<Vec<_>, _>>()?;

    let mut reading_stmt = conn.prepare(
        "SELECT location, intensity FROM earthquake_reading
         WHERE earthquake_id = ?1
         ORDER BY id",
    )?;

    let mut listed = Vec::with_capacity(earthquakes.len());
    for earthquake in earthquakes {
        let readings = reading_stmt
            .query_map([earthquake.id], |row| {
                let location: String = row.get(0)?;
                let label: String = row.get(1)?;
                Ok((location, label))
            })?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|(location, label)| SimulatedReading {
                severity: classify(&Intensity::parse_label(&label), earthquake.magnitude),
                location,
                intensity: label,
            })
            .collect();
        listed.push(SimulatedEarthquake {
            earthquake,
            readings,
        });
    }
    Ok(listed)
}
