//! Identifier allocation for simulated earthquakes.

use quake_types::SIMULATED_ID_FLOOR;
use rusqlite::Connection;

use crate::error::AlertError;

/// Returns the next free simulated earthquake id: one past the largest id in
/// the reserved range, or `SIMULATED_ID_FLOOR + 1` when the range is empty.
///
/// Must be called on the same transaction that inserts the earthquake so the
/// read and the insert are covered by one write lock.
pub fn allocate_simulated_id(conn: &Connection) -> Result<i64, AlertError> {
    let max_id: Option<i64> = conn.query_row(
        "SELECT MAX(id) FROM earthquake WHERE id >= ?1",
        [SIMULATED_ID_FLOOR],
        |row| row.get(0),
    )?;
    Ok(max_id.map_or(SIMULATED_ID_FLOOR + 1, |max| max + 1))
}
