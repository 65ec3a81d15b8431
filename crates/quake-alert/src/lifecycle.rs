//! Event lifecycle transitions: acknowledge, report, repair, and forced
//! closure.
//!
//! Each public operation runs in its own immediate transaction. The state
//! check and the update happen under one write lock, so two concurrent calls
//! for the same event serialize and the second observes the first's result.
//!
//! Acknowledging is repeatable while the event awaits a report; the second
//! call overwrites the timestamp. Once an event is reported or closed it can
//! no longer be acknowledged, which keeps `created ≤ ack ≤ report ≤ close`.

use chrono::NaiveDateTime;
use quake_db::with_transaction;
use quake_types::time::{elapsed_minutes, format_timestamp};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::AlertError;
use crate::model::{map_event_row, Event, EVENT_COLUMNS, UNPROCESSED};

/// Loads an event by id.
///
/// # Errors
///
/// Returns `AlertError::NotFound` if no event has this id.
pub fn get_event(conn: &Connection, event_id: &str) -> Result<Event, AlertError> {
    conn.query_row(
        &format!("SELECT {EVENT_COLUMNS} FROM event WHERE id = ?1"),
        [event_id],
        map_event_row,
    )
    .optional()?
    .ok_or_else(|| AlertError::NotFound(event_id.to_string()))
}

/// Records operator acknowledgement of an alert.
///
/// # Errors
///
/// - `AlertError::NotFound` if the event does not exist.
/// - `AlertError::InvalidTransition` if the event was already reported or
///   closed.
pub fn acknowledge(
    conn: &mut Connection,
    event_id: &str,
    now: NaiveDateTime,
) -> Result<Event, AlertError> {
    with_transaction(conn, |tx| {
        let event = get_event(tx, event_id)?;
        if event.is_closed() {
            return Err(invalid(event_id, "acknowledged", "event is closed"));
        }
        if event.reported_at.is_some() {
            return Err(invalid(event_id, "acknowledged", "event was already reported"));
        }

        let updated = tx.execute(
            "UPDATE event SET ack_at = ?1 WHERE id = ?2 AND closed_at IS NULL",
            params![format_timestamp(now), event_id],
        )?;
        if updated == 0 {
            return Err(AlertError::NotFound(event_id.to_string()));
        }

        tracing::info!(
            event_id,
            reacknowledged = event.ack_at.is_some(),
            "event acknowledged"
        );
        get_event(tx, event_id)
    })
}

/// Records the damage report for an event.
///
/// A report of no damage closes the event immediately and records the
/// elapsed whole minutes since creation. A damage report leaves the event
/// open (in process) until [`repair`].
///
/// # Errors
///
/// - `AlertError::NotFound` if the event does not exist or no row was updated.
/// - `AlertError::InvalidTransition` if the event is already closed.
pub fn submit_report(
    conn: &mut Connection,
    event_id: &str,
    damage: bool,
    operation_active: bool,
    now: NaiveDateTime,
) -> Result<Event, AlertError> {
    with_transaction(conn, |tx| {
        let event = get_event(tx, event_id)?;
        if event.is_closed() {
            return Err(invalid(event_id, "reported", "event is closed"));
        }

        let now_text = format_timestamp(now);
        let updated = if damage {
            tx.execute(
                "UPDATE event
                 SET is_damage = 1, is_operation_active = ?1, reported_at = ?2
                 WHERE id = ?3 AND closed_at IS NULL",
                params![operation_active, now_text, event_id],
            )?
        } else {
            let process_time = elapsed_minutes(event.created_at, now);
            tx.execute(
                "UPDATE event
                 SET is_damage = 0, is_operation_active = ?1, reported_at = ?2,
                     closed_at = ?2, process_time = ?3
                 WHERE id = ?4 AND closed_at IS NULL",
                params![operation_active, now_text, process_time, event_id],
            )?
        };
        if updated == 0 {
            return Err(AlertError::NotFound(event_id.to_string()));
        }

        tracing::info!(event_id, damage, operation_active, "event report submitted");
        get_event(tx, event_id)
    })
}

/// Marks an event as repaired, closing it.
///
/// Neither acknowledgement nor a prior damage report is required.
///
/// # Errors
///
/// - `AlertError::NotFound` if the event does not exist or no row was updated.
/// - `AlertError::InvalidTransition` if the event is already closed.
pub fn repair(
    conn: &mut Connection,
    event_id: &str,
    now: NaiveDateTime,
) -> Result<Event, AlertError> {
    with_transaction(conn, |tx| {
        let event = get_event(tx, event_id)?;
        if event.is_closed() {
            return Err(invalid(event_id, "repaired", "event is closed"));
        }

        let process_time = elapsed_minutes(event.created_at, now);
        let updated = tx.execute(
            "UPDATE event SET closed_at = ?1, process_time = ?2
             WHERE id = ?3 AND closed_at IS NULL",
            params![format_timestamp(now), process_time, event_id],
        )?;
        if updated == 0 {
            return Err(AlertError::NotFound(event_id.to_string()));
        }

        tracing::info!(event_id, process_time, "event repaired");
        get_event(tx, event_id)
    })
}

/// Closes an open event without operator action (`process_time = -1`).
///
/// Runs on the caller's transaction. Returns `false` if the event was
/// already closed; closing is idempotent.
pub(crate) fn close_unprocessed(
    conn: &Connection,
    event_id: &str,
    now: NaiveDateTime,
) -> Result<bool, AlertError> {
    let updated = conn.execute(
        "UPDATE event SET closed_at = ?1, process_time = ?2
         WHERE id = ?3 AND closed_at IS NULL",
        params![format_timestamp(now), UNPROCESSED, event_id],
    )?;
    Ok(updated > 0)
}

fn invalid(event_id: &str, action: &'static str, reason: &'static str) -> AlertError {
    AlertError::InvalidTransition {
        event_id: event_id.to_string(),
        action,
        reason,
    }
}
