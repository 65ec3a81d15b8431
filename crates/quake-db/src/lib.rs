//! Database layer for the quake alerting engine.
//!
//! Provides SQLite connection pooling (via `r2d2`), WAL-mode initialization,
//! embedded SQL migrations, and the transaction scope every engine operation
//! runs inside.
//!
//! # Design decisions
//!
//! - **SQLite with WAL mode**: concurrent readers with a single writer, which
//!   matches the request handlers plus one periodic sweeper.
//! - **`r2d2` connection pool**: bounded connection reuse. A checkout waits
//!   at most `checkout_timeout_ms` and a held connection waits at most
//!   `busy_timeout_ms` for the write lock; either expiry is an error, never a
//!   hang.
//! - **Immediate transactions**: [`with_transaction`] takes the write lock at
//!   `BEGIN`, so read-then-write sequences (id allocation, state checks
//!   before a transition) cannot interleave with another writer.

mod migrations;
mod pool;
mod scope;

pub use migrations::{run_migrations, MigrationError};
pub use pool::{checkout, create_pool, DbConn, DbPool, DbRuntimeSettings, PoolError};
pub use scope::with_transaction;
