//! Earthquake ingestion pipeline.
//!
//! One call persists an earthquake, its regional readings, and one event per
//! monitored region, deciding for each event whether an alert fires. All of
//! it happens in a single immediate transaction: either the whole set of
//! rows becomes visible or none of it does.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDateTime};
use quake_db::with_transaction;
use quake_types::time::{format_timestamp, parse_timestamp};
use quake_types::{IngestRequest, Region, Severity, SIMULATED_ID_FLOOR};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use serde::Serialize;

use crate::allocator::allocate_simulated_id;
use crate::classify::classify;
use crate::error::{is_primary_key_violation, AlertError};
use crate::lifecycle::close_unprocessed;
use crate::metrics::MetricsSink;
use crate::model::{Earthquake, RegionalReading};
use crate::settings::suppress_window_minutes;
use crate::suppression::should_trigger;

/// How far in the past an origin time may lie before the report is refused.
pub const MAX_REPORT_AGE_MINUTES: i64 = 60;

/// Per-call ingestion parameters.
#[derive(Debug, Clone, Copy)]
pub struct IngestOptions {
    /// Overrides the stored suppression window for this call.
    pub suppress_window_minutes: Option<u32>,
    /// Window used when neither an override nor a stored setting exists.
    pub default_suppress_minutes: u32,
    /// Ingestion wall-clock time in the local zone.
    pub now: NaiveDateTime,
}

impl IngestOptions {
    pub fn at(now: NaiveDateTime) -> Self {
        Self {
            suppress_window_minutes: None,
            default_suppress_minutes: quake_types::DEFAULT_SUPPRESS_MINUTES,
            now,
        }
    }
}

/// The alerting decision made for one monitored region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventDecision {
    pub event_id: String,
    pub region: Region,
    pub severity: Severity,
    pub triggered: bool,
}

/// What a successful ingestion created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReceipt {
    pub earthquake_id: i64,
    pub events: Vec<EventDecision>,
}

/// Result of an ingestion attempt that did not fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IngestOutcome {
    Created(IngestReceipt),
    /// The origin time lies more than an hour before `now`. Nothing was
    /// written.
    RejectedTooEarly {
        #[serde(with = "quake_types::time::canonical")]
        origin_time: NaiveDateTime,
        #[serde(with = "quake_types::time::canonical")]
        earliest_accepted: NaiveDateTime,
    },
    /// An earthquake with the submitted id is already stored. Nothing was
    /// written.
    AlreadyIngested { earthquake_id: i64 },
}

/// Ingests one earthquake report.
///
/// Reports without an id get one allocated from the simulated range inside
/// the same transaction. Readings whose location matches no monitored region
/// are stored but raise no event. When several readings match the same
/// region, the event links to the most severe one (the first on ties).
/// Events that do not trigger are closed immediately as unprocessed.
///
/// Events are stamped with `options.now`. The suppression window is measured
/// back from the earthquake's origin time, so a report that arrives late is
/// judged against the alerts that preceded the shaking itself.
///
/// `metrics` is notified only after the transaction commits.
///
/// # Errors
///
/// - `AlertError::Validation` for malformed timestamps, non-finite numbers,
///   negative intensities, or an explicit id in the simulated range.
/// - `AlertError::Collision` if another writer committed the same id first.
/// - `AlertError::Storage` on any other database failure. Nothing is
///   committed.
pub fn ingest(
    conn: &mut Connection,
    request: &IngestRequest,
    options: &IngestOptions,
    metrics: &dyn MetricsSink,
) -> Result<IngestOutcome, AlertError> {
    validate(request)?;

    let origin_time = parse_timestamp(&request.earthquake.time)?;
    let earliest_accepted = options.now - Duration::minutes(MAX_REPORT_AGE_MINUTES);
    if origin_time < earliest_accepted {
        tracing::warn!(
            earthquake_id = request.earthquake.id,
            origin_time = %format_timestamp(origin_time),
            earliest_accepted = %format_timestamp(earliest_accepted),
            "rejected stale earthquake report"
        );
        return Ok(IngestOutcome::RejectedTooEarly {
            origin_time,
            earliest_accepted,
        });
    }

    let committed = with_transaction(conn, |tx| {
        persist(tx, request, origin_time, options)
    })?;

    let Some((earthquake, readings, receipt)) = committed else {
        let earthquake_id = request.earthquake.id.unwrap_or_default();
        tracing::debug!(earthquake_id, "earthquake already ingested");
        return Ok(IngestOutcome::AlreadyIngested { earthquake_id });
    };

    metrics.earthquake_ingested(&earthquake, &readings);
    tracing::info!(
        earthquake_id = earthquake.id,
        is_demo = earthquake.is_demo,
        magnitude = earthquake.magnitude,
        readings = readings.len(),
        events = receipt.events.len(),
        alerts = receipt.events.iter().filter(|e| e.triggered).count(),
        "ingested earthquake"
    );
    Ok(IngestOutcome::Created(receipt))
}

fn validate(request: &IngestRequest) -> Result<(), AlertError> {
    let quake = &request.earthquake;
    if let Some(id) = quake.id {
        if id <= 0 || id >= SIMULATED_ID_FLOOR {
            return Err(AlertError::Validation(format!(
                "earthquake id {id} must be between 1 and {}",
                SIMULATED_ID_FLOOR - 1
            )));
        }
    }
    for (field, value) in [
        ("lat", quake.lat),
        ("lon", quake.lon),
        ("magnitude", quake.magnitude),
        ("depth", quake.depth),
    ] {
        if !value.is_finite() {
            return Err(AlertError::Validation(format!("{field} must be finite")));
        }
    }
    for reading in &request.readings {
        reading.intensity.validate()?;
    }
    Ok(())
}

type Persisted = (Earthquake, Vec<RegionalReading>, IngestReceipt);

fn persist(
    tx: &Transaction<'_>,
    request: &IngestRequest,
    origin_time: NaiveDateTime,
    options: &IngestOptions,
) -> Result<Option<Persisted>, AlertError> {
    let id = match request.earthquake.id {
        Some(id) => {
            if earthquake_exists(tx, id)? {
                return Ok(None);
            }
            id
        }
        None => allocate_simulated_id(tx)?,
    };

    let window = match options.suppress_window_minutes {
        Some(minutes) => minutes,
        None => suppress_window_minutes(tx, options.default_suppress_minutes)?,
    };

    let earthquake = Earthquake {
        id,
        origin_time,
        center: request.earthquake.center.clone(),
        latitude: request.earthquake.lat,
        longitude: request.earthquake.lon,
        magnitude: request.earthquake.magnitude,
        depth: request.earthquake.depth,
        is_demo: request.earthquake.is_demo,
    };
    insert_earthquake(tx, &earthquake, options.now)?;

    let mut readings = Vec::with_capacity(request.readings.len());
    // Most severe reading per region, first one kept on ties.
    let mut strongest: BTreeMap<Region, (usize, Severity)> = BTreeMap::new();
    for report in &request.readings {
        tx.execute(
            "INSERT INTO earthquake_reading (earthquake_id, location, intensity, intensity_value)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                id,
                report.region,
                report.intensity.label(),
                report.intensity.value()
            ],
        )?;
        let reading = RegionalReading {
            id: tx.last_insert_rowid(),
            earthquake_id: id,
            location: report.region.clone(),
            intensity: report.intensity.clone(),
        };

        if let Some(region) = reading.region() {
            let severity = classify(&reading.intensity, earthquake.magnitude);
            let index = readings.len();
            strongest
                .entry(region)
                .and_modify(|best| {
                    if severity.score() > best.1.score() {
                        *best = (index, severity);
                    }
                })
                .or_insert((index, severity));
        } else {
            tracing::debug!(location = %reading.location, "reading matches no monitored region");
        }
        readings.push(reading);
    }

    let mut events = Vec::with_capacity(strongest.len());
    for (region, (index, severity)) in strongest {
        let triggered = should_trigger(tx, region, severity, origin_time, window)?;
        let event_id = region.event_id(id);
        tx.execute(
            "INSERT INTO event (id, reading_id, region, severity, triggered, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                event_id,
                readings[index].id,
                region.name(),
                severity.as_str(),
                triggered,
                format_timestamp(options.now)
            ],
        )?;
        if !triggered {
            close_unprocessed(tx, &event_id, options.now)?;
        }
        events.push(EventDecision {
            event_id,
            region,
            severity,
            triggered,
        });
    }

    Ok(Some((
        earthquake,
        readings,
        IngestReceipt {
            earthquake_id: id,
            events,
        },
    )))
}

fn earthquake_exists(conn: &Connection, id: i64) -> Result<bool, AlertError> {
    let found: Option<i64> = conn
        .query_row("SELECT id FROM earthquake WHERE id = ?1", [id], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(found.is_some())
}

fn insert_earthquake(
    conn: &Connection,
    earthquake: &Earthquake,
    now: NaiveDateTime,
) -> Result<(), AlertError> {
    conn.execute(
        "INSERT INTO earthquake
         (id, origin_time, center, latitude, longitude, magnitude, depth, is_demo, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            earthquake.id,
            format_timestamp(earthquake.origin_time),
            earthquake.center,
            earthquake.latitude,
            earthquake.longitude,
            earthquake.magnitude,
            earthquake.depth,
            earthquake.is_demo,
            format_timestamp(now)
        ],
    )
    .map_err(|err| {
        if is_primary_key_violation(&err) {
            AlertError::Collision(earthquake.id)
        } else {
            AlertError::Storage(err)
        }
    })?;
    Ok(())
}
