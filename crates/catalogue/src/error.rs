//! Catalogue Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Store failures are re-classified
//! into the categories a caller (CLI, API layer) acts on, and the original
//! store error is kept as a child.

use derive_more::{Display, Error};
use lexi_store::error::{Error as StoreError, ErrorKind as StoreErrorKind};

/// A catalogue error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for catalogue operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Why a piece of free-text input was rejected.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum Rejection {
    #[display("must not be empty")]
    Empty,
    #[display("must be at most {_0} characters")]
    TooLong(usize),
}

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Free-text input failed validation; nothing was written.
    #[display("invalid {field}: {reason}")]
    InvalidInput {
        #[error(not(source))]
        field: &'static str,
        #[error(not(source))]
        reason: Rejection,
    },
    /// An identifier was not a valid unsigned integer.
    #[display("invalid {_0}: {_1:?}")]
    InvalidId(#[error(not(source))] &'static str, #[error(not(source))] String),
    /// The referenced word, translation or sentence does not exist.
    #[display("not found")]
    NotFound,
    /// The new text collides with an existing sibling.
    #[display("already exists")]
    Conflict,
    /// Cancelled or timed out; safe to retry.
    #[display("canceled")]
    Canceled,
    /// The database could not be reached or stayed locked; safe to retry.
    #[display("storage unavailable")]
    Unavailable,
    /// Any other storage failure.
    #[display("storage error")]
    Store,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Canceled | Self::Unavailable)
    }

    /// Classify a store error, preserving it as the child of the returned error.
    #[track_caller]
    pub fn store(err: StoreError) -> Error {
        let kind = match &*err {
            StoreErrorKind::NotFound(..) => Self::NotFound,
            StoreErrorKind::Conflict(_) => Self::Conflict,
            StoreErrorKind::Canceled => Self::Canceled,
            StoreErrorKind::StorageUnavailable | StoreErrorKind::Busy => Self::Unavailable,
            _ => Self::Store,
        };
        err.raise(kind)
    }
}
