//! Operator-tunable settings stored in the `settings` table.

use quake_types::SUPPRESS_SETTING_KEY;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::AlertError;

/// Reads a raw setting value.
pub fn get_setting(conn: &Connection, name: &str) -> Result<Option<String>, AlertError> {
    let value = conn
        .query_row(
            "SELECT value FROM settings WHERE name = ?1",
            [name],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

/// Inserts or replaces a setting value.
pub fn set_setting(conn: &Connection, name: &str, value: &str) -> Result<(), AlertError> {
    conn.execute(
        "INSERT INTO settings (name, value) VALUES (?1, ?2)
         ON CONFLICT (name) DO UPDATE SET value = excluded.value",
        params![name, value],
    )?;
    Ok(())
}

/// Returns the stored suppression window in minutes, or `fallback` when no
/// value is stored. An unparsable stored value also yields `fallback`.
pub fn suppress_window_minutes(conn: &Connection, fallback: u32) -> Result<u32, AlertError> {
    let Some(raw) = get_setting(conn, SUPPRESS_SETTING_KEY)? else {
        return Ok(fallback);
    };
    match raw.trim().parse::<u32>() {
        Ok(minutes) => Ok(minutes),
        Err(_) => {
            tracing::warn!(
                setting = SUPPRESS_SETTING_KEY,
                value = %raw,
                fallback,
                "ignoring unparsable suppression window"
            );
            Ok(fallback)
        }
    }
}

/// Stores the suppression window in minutes.
pub fn set_suppress_window_minutes(conn: &Connection, minutes: u32) -> Result<(), AlertError> {
    set_setting(conn, SUPPRESS_SETTING_KEY, &minutes.to_string())?;
    tracing::info!(minutes, "updated alert suppression window");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().expect("should open in-memory db");
        quake_db::run_migrations(&conn).expect("migrations should succeed");
        conn
    }

    #[test]
    fn missing_window_uses_fallback() {
        let conn = test_db();
        assert_eq!(suppress_window_minutes(&conn, 30).unwrap(), 30);
    }

    #[test]
    fn stored_window_wins() {
        let conn = test_db();
        set_suppress_window_minutes(&conn, 45).unwrap();
        assert_eq!(suppress_window_minutes(&conn, 30).unwrap(), 45);

        set_suppress_window_minutes(&conn, 10).unwrap();
        assert_eq!(suppress_window_minutes(&conn, 30).unwrap(), 10);
    }

    #[test]
    fn garbage_window_falls_back() {
        let conn = test_db();
        set_setting(&conn, SUPPRESS_SETTING_KEY, "soon").unwrap();
        assert_eq!(suppress_window_minutes(&conn, 30).unwrap(), 30);
    }

    #[test]
    fn generic_settings_round_trip() {
        let conn = test_db();
        assert_eq!(get_setting(&conn, "theme").unwrap(), None);
        set_setting(&conn, "theme", "dark").unwrap();
        assert_eq!(get_setting(&conn, "theme").unwrap().as_deref(), Some("dark"));
    }
}
