//! Failure classification and recovery strategy selection
//!
//! Maps tool errors — typed errors and raw soft-failure messages alike —
//! onto the small set of recovery strategies the executor knows how to run.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Classified failure category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// File or command does not exist
    NotFound,
    /// Malformed or relative path
    BadPath,
    /// Deadline exceeded
    Timeout,
    /// Arguments rejected by the tool or its schema
    BadArguments,
    /// Rejected by OS or policy
    PermissionDenied,
    /// Network-level failure
    Network,
    /// Tool name did not resolve
    UnknownTool,
    /// Anything unrecognized
    Unknown,
}

impl FailureClass {
    /// Recovery strategy for this class
    #[must_use]
    pub fn strategy(&self) -> RecoveryStrategy {
        match self {
            Self::NotFound => RecoveryStrategy::PathVariants,
            Self::BadPath => RecoveryStrategy::ResolveWorkingDir,
            Self::Timeout => RecoveryStrategy::DecomposeSteps,
            Self::BadArguments => RecoveryStrategy::ResynthesizeArguments,
            Self::PermissionDenied => RecoveryStrategy::ReadOnlyFallback,
            Self::Network => RecoveryStrategy::RetryOnce,
            // An unresolvable tool name is a plan defect, not a runtime
            // hiccup; it is reported, never papered over.
            Self::UnknownTool => RecoveryStrategy::Fail,
            Self::Unknown => RecoveryStrategy::SyntheticResult,
        }
    }

    /// Whether retrying the same call can ever help
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout | Self::Network)
    }

    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::BadPath => "bad_path",
            Self::Timeout => "timeout",
            Self::BadArguments => "bad_arguments",
            Self::PermissionDenied => "permission_denied",
            Self::Network => "network",
            Self::UnknownTool => "unknown_tool",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for FailureClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&Error> for FailureClass {
    fn from(error: &Error) -> Self {
        match error {
            Error::NotFound(_) => Self::NotFound,
            Error::BadPath(_) => Self::BadPath,
            Error::Timeout(_) => Self::Timeout,
            Error::BadArguments { .. } => Self::BadArguments,
            Error::PermissionDenied(_) => Self::PermissionDenied,
            Error::Network(_) => Self::Network,
            Error::Unknown(_) => Self::UnknownTool,
            Error::Duplicate(_) | Error::Cancelled | Error::Runtime(_) => Self::Unknown,
        }
    }
}

/// What the executor should do about a classified failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryStrategy {
    /// Try canonical path variants under the working directory, then a
    /// related read-only tool
    PathVariants,
    /// Resolve the path against the working directory and retry once
    ResolveWorkingDir,
    /// Split the task description at connectives and run the pieces
    /// sequentially
    DecomposeSteps,
    /// Ask the planner to re-synthesize arguments
    ResynthesizeArguments,
    /// Switch to a read-only alternative if semantics allow
    ReadOnlyFallback,
    /// Retry the identical call once
    RetryOnce,
    /// Produce a best-effort synthetic result flagged as recovered
    SyntheticResult,
    /// No recovery applies; report the failure as-is
    Fail,
}

/// Keyword patterns for classifying soft failures (tools that return
/// `success = false` with only a message).
const PATTERNS: &[(FailureClass, &[&str])] = &[
    (
        FailureClass::NotFound,
        &["not found", "no such file", "does not exist", "enoent", "command not found"],
    ),
    (
        FailureClass::BadPath,
        &["invalid path", "not absolute", "relative path", "malformed path"],
    ),
    (
        FailureClass::Timeout,
        &["timed out", "timeout", "deadline exceeded"],
    ),
    (
        FailureClass::BadArguments,
        &["invalid argument", "bad argument", "missing required", "syntax error", "unexpected token"],
    ),
    (
        FailureClass::PermissionDenied,
        &["permission denied", "access denied", "forbidden", "not allowed", "eacces", "read-only file system"],
    ),
    (
        FailureClass::Network,
        &["connection refused", "connection reset", "dns", "network unreachable", "could not resolve"],
    ),
];

/// Classify a raw error message into a failure class.
///
/// Matching is case-insensitive; the first class with any matching keyword
/// wins, so more specific classes come earlier in the table.
#[must_use]
pub fn classify_message(message: &str) -> FailureClass {
    let lower = message.to_lowercase();
    for (class, keywords) in PATTERNS {
        if keywords.iter().any(|kw| lower.contains(kw)) {
            debug!(class = %class, "Classified failure message");
            return *class;
        }
    }
    FailureClass::Unknown
}
