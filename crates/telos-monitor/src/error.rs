//! Error types for telos-monitor
//!
//! Monitoring errors never propagate into the agent; they are logged at the
//! bridge boundary and dropped.

use thiserror::Error;

/// Monitor error type
#[derive(Debug, Error)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Record or session not found
    #[error("not found: {0}")]
    NotFound(String),

    /// IO error (log-directory polling)
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
