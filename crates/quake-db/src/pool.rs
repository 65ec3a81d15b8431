//! SQLite pool for the alerting store.
//!
//! Two timeouts bound every storage call: `checkout_timeout_ms` caps the wait
//! for a free pooled connection, and `busy_timeout_ms` caps the wait for the
//! SQLite write lock once a connection is held. Either one expiring surfaces
//! as an error to the caller; nothing here retries.

use std::time::Duration;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OpenFlags};
use thiserror::Error;

/// Connection and timeout limits for the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbRuntimeSettings {
    /// Wait for the SQLite write lock before failing with `SQLITE_BUSY`.
    pub busy_timeout_ms: u64,

    /// Upper bound on pooled connections, shared by request handlers, the
    /// sweeper, and the feed poller.
    pub pool_max_size: u32,

    /// Wait for a free pooled connection before failing.
    pub checkout_timeout_ms: u64,
}

impl Default for DbRuntimeSettings {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5_000,
            pool_max_size: 8,
            checkout_timeout_ms: 5_000,
        }
    }
}

pub type DbPool = Pool<SqliteConnectionManager>;

/// A connection checked out of a [`DbPool`].
pub type DbConn = PooledConnection<SqliteConnectionManager>;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("failed to create database connection pool: {0}")]
    PoolInit(#[source] r2d2::Error),

    /// No connection became free within the checkout timeout, or a new
    /// connection could not be opened.
    #[error("no database connection available within {timeout_ms} ms: {source}")]
    Checkout {
        timeout_ms: u64,
        #[source]
        source: r2d2::Error,
    },
}

/// Opens a pool over the database at `db_path`.
///
/// Every connection runs in WAL mode with foreign keys enforced. `:memory:`
/// is accepted, but each pooled connection then sees its own empty database.
///
/// # Errors
///
/// Returns `PoolError::PoolInit` if the first connection cannot be opened or
/// configured.
pub fn create_pool(db_path: &str, settings: DbRuntimeSettings) -> Result<DbPool, PoolError> {
    let manager = SqliteConnectionManager::file(db_path)
        .with_flags(
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_FULL_MUTEX,
        )
        .with_init(move |conn| prepare_connection(conn, settings.busy_timeout_ms));

    let pool = Pool::builder()
        .max_size(settings.pool_max_size)
        .connection_timeout(Duration::from_millis(settings.checkout_timeout_ms.max(1)))
        .build(manager)
        .map_err(PoolError::PoolInit)?;

    tracing::debug!(
        path = db_path,
        pool_max_size = settings.pool_max_size,
        busy_timeout_ms = settings.busy_timeout_ms,
        checkout_timeout_ms = settings.checkout_timeout_ms,
        "opened alert store"
    );
    Ok(pool)
}

/// Checks a connection out of `pool`, waiting at most the configured
/// checkout timeout.
///
/// # Errors
///
/// Returns `PoolError::Checkout` when the wait expires.
pub fn checkout(pool: &DbPool) -> Result<DbConn, PoolError> {
    pool.get().map_err(|source| {
        let timeout_ms = u64::try_from(pool.connection_timeout().as_millis()).unwrap_or(u64::MAX);
        tracing::warn!(
            timeout_ms,
            in_use = pool.state().connections - pool.state().idle_connections,
            "database checkout timed out"
        );
        PoolError::Checkout { timeout_ms, source }
    })
}

fn prepare_connection(conn: &mut Connection, busy_timeout_ms: u64) -> rusqlite::Result<()> {
    let journal_mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    // In-memory databases cannot use WAL and report "memory".
    if !journal_mode.eq_ignore_ascii_case("wal") && journal_mode != "memory" {
        return Err(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
            Some(format!("journal_mode stayed {journal_mode}, WAL required")),
        ));
    }
    conn.pragma_update(None, "foreign_keys", true)?;
    conn.busy_timeout(Duration::from_millis(busy_timeout_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pragma_i64(conn: &Connection, name: &str) -> i64 {
        conn.pragma_query_value(None, name, |row| row.get(0))
            .expect("pragma should be readable")
    }

    #[test]
    fn connections_carry_store_pragmas() {
        let pool = create_pool(
            ":memory:",
            DbRuntimeSettings {
                busy_timeout_ms: 2_500,
                pool_max_size: 3,
                checkout_timeout_ms: 750,
            },
        )
        .expect("pool creation should succeed");
        let conn = checkout(&pool).expect("should check out a connection");

        assert_eq!(pragma_i64(&conn, "foreign_keys"), 1);
        assert_eq!(pragma_i64(&conn, "busy_timeout"), 2_500);
        assert_eq!(pool.max_size(), 3);
        assert_eq!(pool.connection_timeout(), Duration::from_millis(750));
    }

    #[test]
    fn exhausted_pool_times_out() {
        let pool = create_pool(
            ":memory:",
            DbRuntimeSettings {
                pool_max_size: 1,
                checkout_timeout_ms: 50,
                ..DbRuntimeSettings::default()
            },
        )
        .expect("pool creation should succeed");

        let _held = checkout(&pool).expect("first checkout succeeds");
        let err = match checkout(&pool) {
            Ok(_) => panic!("second checkout should time out"),
            Err(err) => err,
        };
        assert!(
            matches!(err, PoolError::Checkout { timeout_ms: 50, .. }),
            "got {err:?}"
        );
    }
}
