//! Time-windowed alert suppression.
//!
//! A new alert for a region is suppressed when an alert of equal or higher
//! severity already fired for that region inside the trailing window. The
//! rule is asymmetric: a prior `L2` suppresses a new `L1` or `L2`, a prior
//! `L1` suppresses only a new `L1`.

use chrono::{Duration, NaiveDateTime};
use quake_types::time::format_timestamp;
use quake_types::{Region, Severity};
use rusqlite::{params, Connection};

use crate::error::AlertError;
use crate::model::parsed_column;

/// Decides whether a new alert of `severity` for `region` at `event_time`
/// should fire, given the alerts already persisted.
///
/// Prior alerts count when `triggered = 1` and their creation time lies in
/// `[event_time - window, event_time]`, inclusive at both ends. `NA` never
/// fires. A zero-minute window never suppresses.
///
/// # Errors
///
/// Returns `AlertError::Storage` on SQL failure.
pub fn should_trigger(
    conn: &Connection,
    region: Region,
    severity: Severity,
    event_time: NaiveDateTime,
    window_minutes: u32,
) -> Result<bool, AlertError> {
    if !severity.is_alerting() {
        return Ok(false);
    }
    if window_minutes == 0 {
        return Ok(true);
    }

    let threshold = event_time - Duration::minutes(i64::from(window_minutes));
    let prior = prior_alert_severities(conn, region, threshold, event_time)?;
    let suppressed = is_suppressed_by(severity, &prior);

    tracing::debug!(
        region = %region,
        %severity,
        prior_alerts = prior.len(),
        window_minutes,
        suppressed,
        "evaluated alert suppression"
    );

    Ok(!suppressed)
}

/// Returns `true` if any prior severity scores at least as high as `severity`.
pub fn is_suppressed_by(severity: Severity, prior: &[Severity]) -> bool {
    prior.iter().any(|p| p.score() >= severity.score())
}

/// Severities of triggered alerts for `region` created within `[from, to]`.
pub fn prior_alert_severities(
    conn: &Connection,
    region: Region,
    from: NaiveDateTime,
    to: NaiveDateTime,
) -> Result<Vec<Severity>, AlertError> {
    let mut stmt = conn.prepare(
        "SELECT severity FROM event
         WHERE region = ?1 AND triggered = 1
           AND created_at BETWEEN ?2 AND ?3",
    )?;
    let rows = stmt.query_map(
        params![region.name(), format_timestamp(from), format_timestamp(to)],
        |row| parsed_column::<Severity>(row, 0),
    )?;

    let mut severities = Vec::new();
    for row in rows {
        severities.push(row?);
    }
    Ok(severities)
}
