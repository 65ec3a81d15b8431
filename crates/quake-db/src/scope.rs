//! Scoped transaction acquisition.

use rusqlite::{Connection, Transaction, TransactionBehavior};

/// Runs `f` inside an `IMMEDIATE` transaction and commits if it succeeds.
///
/// The write lock is taken when the transaction begins, so concurrent
/// writers queue behind the busy timeout instead of interleaving. If `f`
/// returns an error (or panics) the transaction guard is dropped and every
/// statement it executed is rolled back.
///
/// # Errors
///
/// Returns the error produced by `f`, or a storage error converted into `E`
/// if the transaction cannot be started or committed.
pub fn with_transaction<T, E, F>(conn: &mut Connection, f: F) -> Result<T, E>
where
    F: FnOnce(&Transaction<'_>) -> Result<T, E>,
    E: From<rusqlite::Error>,
{
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let value = f(&tx)?;
    tx.commit()?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe_db() -> Connection {
        let conn = Connection::open_in_memory().expect("should open in-memory db");
        conn.execute_batch("CREATE TABLE probe (id INTEGER PRIMARY KEY, label TEXT NOT NULL);")
            .expect("should create probe table");
        conn
    }

    fn count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM probe", [], |row| row.get(0))
            .expect("should count probe rows")
    }

    #[test]
    fn commits_on_success() {
        let mut conn = probe_db();

        let inserted: usize = with_transaction(&mut conn, |tx| {
            tx.execute("INSERT INTO probe (label) VALUES ('a')", [])
        })
        .expect("transaction should commit");

        assert_eq!(inserted, 1);
        assert_eq!(count(&conn), 1);
    }

    #[test]
    fn rolls_back_every_statement_on_error() {
        let mut conn = probe_db();

        let result: Result<(), rusqlite::Error> = with_transaction(&mut conn, |tx| {
            tx.execute("INSERT INTO probe (label) VALUES ('a')", [])?;
            tx.execute("INSERT INTO probe (label) VALUES ('b')", [])?;
            // NOT NULL violation after two successful inserts.
            tx.execute("INSERT INTO probe (label) VALUES (NULL)", [])?;
            Ok(())
        });

        assert!(result.is_err(), "constraint violation should surface");
        assert_eq!(count(&conn), 0, "partial inserts must not be visible");
    }
}
