//! Store Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Raw `sqlx` errors are kept as the
//! child of whichever [`ErrorKind`] they were classified into, so the full
//! tree is still available when debugging.

use crate::models::Entity;
use derive_more::{Display, Error};
use exn::Exn;

/// A store error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// No row with the requested id exists.
    #[display("{_0} not found: {_1}")]
    NotFound(#[error(not(source))] Entity, #[error(not(source))] u64),
    /// The new text collides with a sibling's uniqueness key.
    #[display("{_0} conflicts with an existing {_0}")]
    Conflict(#[error(not(source))] Entity),
    /// The caller's cancellation token fired or its deadline passed.
    #[display("operation canceled")]
    Canceled,
    /// Could not reach the database (pool exhausted/closed, I/O failure).
    #[display("storage unavailable")]
    StorageUnavailable,
    /// Another connection held the lock for longer than the busy timeout.
    #[display("database is busy")]
    Busy,
    #[display("database error")]
    Database,
    #[display("database migration error")]
    Migration,
    /// A stored value cannot be represented by the domain type.
    #[display("invalid stored data: {_0}")]
    InvalidData(#[error(not(source))] &'static str),
    /// Returned from a unit of work purely to force its transaction to roll back.
    #[display("rollback requested")]
    Rollback,
    /// A transaction-bound repository was used after its scope ended.
    #[display("transaction scope already closed")]
    Closed,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Canceled | Self::StorageUnavailable | Self::Busy)
    }

    /// Classify a `sqlx` error that is not tied to a particular entity,
    /// keeping it as a child of the returned error.
    #[track_caller]
    pub(crate) fn storage(err: sqlx::Error) -> Error {
        let kind = match &err {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::WorkerCrashed => Self::StorageUnavailable,
            sqlx::Error::Database(db) if db.code().is_some_and(|code| is_lock_contention(&code)) => Self::Busy,
            _ => Self::Database,
        };
        Exn::new(err).raise(kind)
    }

    /// Classify a `sqlx` error raised while reading or writing `entity`.
    ///
    /// Uniqueness violations become [`ErrorKind::Conflict`]. Foreign key
    /// violations are left as [`ErrorKind::Database`]; call sites that know
    /// which parent was referenced use [`ErrorKind::missing_parent`].
    #[track_caller]
    pub(crate) fn database(entity: Entity, err: sqlx::Error) -> Error {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => Exn::new(err).raise(Self::Conflict(entity)),
            _ => Self::storage(err),
        }
    }

    /// Like [`ErrorKind::database`], but a foreign key violation is reported
    /// as the referenced parent not existing.
    #[track_caller]
    pub(crate) fn missing_parent(entity: Entity, parent: Entity, parent_id: u64, err: sqlx::Error) -> Error {
        match &err {
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                Exn::new(err).raise(Self::NotFound(parent, parent_id))
            },
            _ => Self::database(entity, err),
        }
    }
}

/// `SQLITE_BUSY` or `SQLITE_LOCKED`, including their extended codes
/// (`SQLITE_BUSY_SNAPSHOT` is 517).
fn is_lock_contention(code: &str) -> bool {
    code.parse::<i32>().is_ok_and(|code| matches!(code & 0xff, 5 | 6))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ErrorKind::Canceled, true)]
    #[case(ErrorKind::StorageUnavailable, true)]
    #[case(ErrorKind::Busy, true)]
    #[case(ErrorKind::NotFound(Entity::Word, 1), false)]
    #[case(ErrorKind::Conflict(Entity::Translation), false)]
    #[case(ErrorKind::Database, false)]
    #[case(ErrorKind::Rollback, false)]
    fn test_is_retryable(#[case] kind: ErrorKind, #[case] expected: bool) {
        assert_eq!(kind.is_retryable(), expected);
    }

    #[rstest]
    #[case(ErrorKind::NotFound(Entity::ExampleSentence, 7), "example sentence not found: 7")]
    #[case(ErrorKind::Conflict(Entity::Word), "word conflicts with an existing word")]
    fn test_display(#[case] kind: ErrorKind, #[case] expected: &str) {
        assert_eq!(kind.to_string(), expected);
    }

    #[rstest]
    #[case("5", true)]
    #[case("6", true)]
    #[case("261", true)]
    #[case("262", true)]
    #[case("517", true)]
    #[case("773", true)]
    #[case("19", false)]
    #[case("2067", false)]
    #[case("787", false)]
    #[case("SQLITE_BUSY", false)]
    fn test_lock_contention_codes(#[case] code: &str, #[case] expected: bool) {
        assert_eq!(is_lock_contention(code), expected);
    }

    #[test]
    fn test_pool_errors_are_unavailable() {
        let err = ErrorKind::database(Entity::Word, sqlx::Error::PoolTimedOut);
        assert!(matches!(&*err, ErrorKind::StorageUnavailable));
        let err = ErrorKind::database(Entity::Word, sqlx::Error::RowNotFound);
        assert!(matches!(&*err, ErrorKind::Database));
    }
}
