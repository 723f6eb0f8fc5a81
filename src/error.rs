//! Error types for the txt-wrapped library.
//!
//! This module provides custom error types using `thiserror` so callers can
//! tell a bad upload (`Load`) apart from a schema mismatch (`Query`).

use thiserror::Error;

/// Errors that can occur while loading a message store or computing statistics.
#[derive(Error, Debug)]
pub enum WrappedError {
    /// The supplied bytes or script are not a usable database image
    #[error("Failed to load database: {0}")]
    Load(String),

    /// A query was malformed, referenced a missing table/column, or returned
    /// rows of an unexpected shape
    #[error("Query failed: {0}")]
    Query(String),

    /// The store was used after `close()`
    #[error("Message store is closed")]
    Closed,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid user input (paths, years, limits)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// General error with context
    #[error("{0}")]
    Other(String),
}

impl WrappedError {
    /// Wrap a rusqlite failure raised by the named query.
    pub fn query(name: &str, err: &rusqlite::Error) -> Self {
        Self::Query(format!("{name}: {err}"))
    }

    /// Wrap a rusqlite failure raised while loading.
    pub fn load(context: &str, err: &rusqlite::Error) -> Self {
        Self::Load(format!("{context}: {err}"))
    }
}

/// Convenience type alias for Result with `WrappedError`
pub type Result<T> = std::result::Result<T, WrappedError>;

impl From<config::ConfigError> for WrappedError {
    fn from(err: config::ConfigError) -> Self {
        Self::InvalidConfig(err.to_string())
    }
}

impl From<tokio::task::JoinError> for WrappedError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Other(format!("Analysis task failed: {err}"))
    }
}
