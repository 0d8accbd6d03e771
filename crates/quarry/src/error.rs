//! Error types for ORM operations.

use std::time::Duration;

use thiserror::Error;

use crate::core::value::ValueError;

/// Main error type for ORM operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error (invalid YAML, unknown URL scheme, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection open/ping/close failure.
    #[error("Connection error: {message}")]
    Connection {
        message: String,
        #[source]
        source: sqlx::Error,
    },

    /// Statement compilation or execution failure, wrapped with the SQL text.
    /// Never retried.
    #[error("Query failed: {sql}")]
    Query {
        sql: String,
        #[source]
        source: sqlx::Error,
    },

    /// Sentinel for a single-record lookup that matched zero rows.
    ///
    /// Distinct from execution errors so callers can branch on "absent"
    /// versus "failed".
    #[error("No rows found")]
    NotFound,

    /// A returned column value could not be converted into the matching
    /// record member.
    #[error("Cannot bind column {column}")]
    Bind {
        column: String,
        #[source]
        source: ValueError,
    },

    /// A bounded write operation exceeded its wall-clock timeout.
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// The caller's cancellation token fired before the query completed.
    #[error("Query cancelled")]
    Cancelled,

    /// IO error (config file operations).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Create a Connection error with context about where it occurred.
    pub fn connection(message: impl Into<String>, source: sqlx::Error) -> Self {
        Error::Connection {
            message: message.into(),
            source,
        }
    }

    /// Create a Query error carrying the SQL text that failed.
    pub fn query(sql: impl Into<String>, source: sqlx::Error) -> Self {
        Error::Query {
            sql: sql.into(),
            source,
        }
    }

    /// Create a Bind error for a column conversion failure.
    pub fn bind(column: impl Into<String>, source: ValueError) -> Self {
        Error::Bind {
            column: column.into(),
            source,
        }
    }

    /// Whether this is the zero-row sentinel.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound)
    }
}

/// Result type alias for ORM operations.
pub type Result<T> = std::result::Result<T, Error>;
