//! Error types for the alerting engine.

use quake_types::time::TimestampError;
use quake_types::ParseError;
use rusqlite::ErrorCode;

/// Errors that can occur during ingestion and lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    /// The submitted report is malformed. Not retryable.
    #[error("invalid input: {0}")]
    Validation(String),

    /// The referenced event does not exist.
    #[error("event not found: {0}")]
    NotFound(String),

    /// The event exists but its current state does not permit the operation.
    #[error("event {event_id} cannot be {action}: {reason}")]
    InvalidTransition {
        event_id: String,
        action: &'static str,
        reason: &'static str,
    },

    /// Another writer inserted the same earthquake id first. Retrying
    /// re-allocates a fresh simulated id.
    #[error("earthquake id {0} collided with an existing record")]
    Collision(i64),

    /// A database operation failed. Nothing was committed.
    #[error("alert database error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl AlertError {
    /// Returns `true` when the caller may retry the whole operation.
    ///
    /// Every operation runs in a single transaction, so a failed attempt
    /// leaves no partial effects behind.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Collision(_) => true,
            Self::Storage(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.code,
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }
}

impl From<TimestampError> for AlertError {
    fn from(err: TimestampError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<ParseError> for AlertError {
    fn from(err: ParseError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Returns `true` if the error is a primary-key violation.
pub(crate) fn is_primary_key_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}
