//! Error types for counterbucket-core.
//!
//! Backend failures and store invariant violations are kept apart so a
//! report driver can tell a transient fault from inconsistent data.

use thiserror::Error;

/// The main error type for counterbucket operations.
#[derive(Debug, Error)]
pub enum CounterBucketError {
    /// Query execution or transport failure reported by the backing store.
    #[error("Backend error: {0}")]
    Backend(String),

    /// The backing store returned something it must never return, such as
    /// more than one row for a scalar aggregate.
    #[error("Invariant violation: {0}")]
    Invariant(String),

    /// A record width outside day/week/month/year was requested.
    #[error("Unsupported record width: {0}")]
    UnsupportedWidth(String),

    /// The caller cancelled the context before a query was issued.
    #[error("Operation cancelled")]
    Cancelled,

    /// Invalid timezone name provided.
    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    /// Error parsing timestamp or reading input.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// The counter directory could not be loaded.
    #[error("Directory error: {0}")]
    Directory(String),
}

/// Result type alias for counterbucket operations.
pub type Result<T> = std::result::Result<T, CounterBucketError>;
