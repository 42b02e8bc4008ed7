//! Error types for telos-tools

use thiserror::Error;

/// Tool error type
///
/// Per-call errors carry enough context for the executor's failure
/// classifier to pick a recovery strategy.
#[derive(Debug, Error)]
pub enum Error {
    /// Tool name does not resolve in the registry
    #[error("unknown tool: {0}")]
    Unknown(String),

    /// A tool with this name is already registered
    #[error("duplicate tool: {0}")]
    Duplicate(String),

    /// Arguments do not satisfy the declared schema
    #[error("bad arguments for '{tool}': {reason}")]
    BadArguments {
        /// Tool whose schema was violated
        tool: String,
        /// What was wrong
        reason: String,
    },

    /// A referenced file or command does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// A path argument was malformed or not absolute where required
    #[error("bad path: {0}")]
    BadPath(String),

    /// The operation was rejected by the OS or a policy
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The call exceeded its time budget
    #[error("timeout after {0}ms")]
    Timeout(u64),

    /// A network operation failed
    #[error("network error: {0}")]
    Network(String),

    /// The call was cancelled
    #[error("cancelled")]
    Cancelled,

    /// The tool ran but failed internally
    #[error("runtime error: {0}")]
    Runtime(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
