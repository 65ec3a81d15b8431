//! Auto-close sweeper.
//!
//! Closes open events that have waited too long at any stage:
//!
//! 1. never acknowledged, created at or before `now - timeout`;
//! 2. acknowledged but not reported, acknowledged at or before `now - timeout`;
//! 3. reported with damage but not repaired, reported at or before
//!    `now - timeout`.
//!
//! Swept events get `process_time = -1`.

use chrono::{Duration, NaiveDateTime};
use quake_db::with_transaction;
use quake_types::time::format_timestamp;
use rusqlite::{params, Connection};

use crate::error::AlertError;
use crate::model::UNPROCESSED;

/// Closes every stale open event and returns the ids it closed.
///
/// The three conditions are evaluated in one `UPDATE`, so an event matching
/// more than one of them is closed once.
///
/// # Errors
///
/// Returns `AlertError::Storage` on SQL failure; nothing is closed.
pub fn sweep(
    conn: &mut Connection,
    now: NaiveDateTime,
    timeout_minutes: u32,
) -> Result<Vec<String>, AlertError> {
    let threshold = format_timestamp(now - Duration::minutes(i64::from(timeout_minutes)));
    let now_text = format_timestamp(now);

    let closed = with_transaction(conn, |tx| {
        let mut stmt = tx.prepare(
            "UPDATE event
             SET closed_at = ?1, process_time = ?2
             WHERE closed_at IS NULL
               AND (
                    (ack_at IS NULL AND created_at <= ?3)
                 OR (ack_at IS NOT NULL AND reported_at IS NULL AND ack_at <= ?3)
                 OR (reported_at IS NOT NULL AND reported_at <= ?3)
               )
             RETURNING id",
        )?;
        let rows = stmt.query_map(params![now_text, UNPROCESSED, threshold], |row| {
            row.get::<_, String>(0)
        })?;

        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }
        Ok::<_, AlertError>(ids)
    })?;

    if !closed.is_empty() {
        tracing::info!(
            closed = closed.len(),
            timeout_minutes,
            "auto-closed stale events"
        );
    }
    Ok(closed)
}
