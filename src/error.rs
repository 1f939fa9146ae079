//! Error types for usenet-indexer
//!
//! Pipeline stages distinguish four failure classes:
//! - protocol errors ([`Error::Nntp`]) are fatal to one worker's current
//!   group scan and reported per group,
//! - subject parse errors ([`Error::Subject`]) are local to one posting,
//! - persistence errors roll back the enclosing transaction and propagate,
//! - policy rejects (duplicate hash, too few files) are not errors at all
//!   and never surface here.

use thiserror::Error;

/// Result type alias for usenet-indexer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for usenet-indexer
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "scan.max_chunk")
        key: Option<String>,
    },

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// NNTP protocol or connection error
    #[error("NNTP error: {0}")]
    Nntp(String),

    /// A posting's subject yielded no usable name or part count
    #[error("unparseable subject: {0}")]
    Subject(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Record not found
    #[error("record not found: {0}")]
    NotFound(String),
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nntp_error_preserves_message() {
        let err = Error::Nntp("connection reset by peer".into());
        assert_eq!(err.to_string(), "NNTP error: connection reset by peer");
    }

    #[test]
    fn subject_error_preserves_message() {
        let err = Error::Subject("no part count in 'foo yEnc'".into());
        assert!(err.to_string().contains("unparseable subject"));
    }

    #[test]
    fn database_error_wraps_sub_error() {
        let err = Error::Database(DatabaseError::QueryFailed("timeout".into()));
        assert_eq!(err.to_string(), "database error: query failed: timeout");
    }

    #[test]
    fn io_error_converts_via_from() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
