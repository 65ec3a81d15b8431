//! Schema migrations for the alert store.
//!
//! The SQL files are compiled into the binary and applied in list order.
//! `_quake_migrations` records each applied name; a migration and its record
//! commit together.

use std::collections::HashSet;

use rusqlite::Connection;
use thiserror::Error;

/// `(name, sql)` pairs in application order. Append only.
const MIGRATIONS: &[(&str, &str)] = &[
    ("000_settings", include_str!("migrations/000_settings.sql")),
    ("001_earthquakes", include_str!("migrations/001_earthquakes.sql")),
    ("002_events", include_str!("migrations/002_events.sql")),
];

const LEDGER_DDL: &str = "CREATE TABLE IF NOT EXISTS _quake_migrations (
    name TEXT PRIMARY KEY NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now', '+8 hours'))
);";

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("failed to prepare the migration ledger: {0}")]
    Ledger(#[source] rusqlite::Error),

    #[error("migration '{name}' failed: {source}")]
    Apply {
        name: &'static str,
        #[source]
        source: rusqlite::Error,
    },
}

/// Brings the schema up to date and returns how many migrations were applied.
///
/// # Errors
///
/// Returns `MigrationError::Ledger` if the ledger cannot be read, or
/// `MigrationError::Apply` naming the first migration that failed. Earlier
/// migrations in the same run stay committed.
pub fn run_migrations(conn: &Connection) -> Result<usize, MigrationError> {
    apply_pending(conn, MIGRATIONS)
}

fn apply_pending(conn: &Connection, migrations: &[(&'static str, &str)]) -> Result<usize, MigrationError> {
    conn.execute_batch(LEDGER_DDL).map_err(MigrationError::Ledger)?;
    let done = applied_names(conn).map_err(MigrationError::Ledger)?;

    let pending: Vec<_> = migrations
        .iter()
        .filter(|(name, _)| !done.contains(*name))
        .collect();
    for &&(name, sql) in &pending {
        apply_one(conn, name, sql).map_err(|source| MigrationError::Apply { name, source })?;
        tracing::info!(migration = name, "applied schema migration");
    }
    Ok(pending.len())
}

fn applied_names(conn: &Connection) -> rusqlite::Result<HashSet<String>> {
    let mut stmt = conn.prepare("SELECT name FROM _quake_migrations")?;
    let names = stmt.query_map([], |row| row.get(0))?;
    names.collect()
}

fn apply_one(conn: &Connection, name: &str, sql: &str) -> rusqlite::Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(sql)?;
    tx.execute("INSERT INTO _quake_migrations (name) VALUES (?1)", [name])?;
    tx.commit()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_table(conn: &Connection, table: &str) -> bool {
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
            [table],
            |row| row.get(0),
        )
        .expect("should query sqlite_master")
    }

    fn fresh() -> Connection {
        Connection::open_in_memory().expect("should open in-memory db")
    }

    #[test]
    fn fresh_database_gets_every_table() {
        let conn = fresh();
        assert_eq!(run_migrations(&conn).unwrap(), MIGRATIONS.len());
        assert_eq!(run_migrations(&conn).unwrap(), 0, "second run is a no-op");

        for table in ["settings", "earthquake", "earthquake_reading", "event"] {
            assert!(has_table(&conn, table), "{table} should exist");
        }
        assert_eq!(applied_names(&conn).unwrap().len(), MIGRATIONS.len());
    }

    #[test]
    fn event_severity_is_constrained() {
        let conn = fresh();
        run_migrations(&conn).unwrap();
        conn.execute_batch(
            "INSERT INTO earthquake (id, origin_time, center, latitude, longitude, magnitude, depth, is_demo, created_at)
             VALUES (1, '2025-05-01 12:00:00', 'c', 0, 0, 4.0, 10, 0, '2025-05-01 12:00:00');
             INSERT INTO earthquake_reading (earthquake_id, location, intensity) VALUES (1, 'Taipei', '3級');",
        )
        .expect("should seed earthquake");

        let inserted = conn.execute(
            "INSERT INTO event (id, reading_id, region, severity, triggered, created_at)
             VALUES ('1-tp', 1, 'Taipei', 'L9', 1, '2025-05-01 12:00:00')",
            [],
        );
        assert!(inserted.is_err(), "unknown severity should violate the CHECK constraint");
    }

    #[test]
    fn failed_migration_leaves_no_partial_schema() {
        let conn = fresh();
        let broken: &[(&'static str, &str)] = &[
            ("900_ok", "CREATE TABLE kept (id INTEGER PRIMARY KEY);"),
            (
                "901_broken",
                "CREATE TABLE half_done (id INTEGER PRIMARY KEY); INSERT INTO missing VALUES (1);",
            ),
        ];

        match apply_pending(&conn, broken) {
            Err(MigrationError::Apply { name, .. }) => assert_eq!(name, "901_broken"),
            other => panic!("expected Apply error, got {other:?}"),
        }
        assert!(has_table(&conn, "kept"));
        assert!(!has_table(&conn, "half_done"));

        let done = applied_names(&conn).unwrap();
        assert!(done.contains("900_ok"));
        assert!(!done.contains("901_broken"));
    }
}
