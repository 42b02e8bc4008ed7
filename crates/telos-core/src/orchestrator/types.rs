//! Orchestrator result and status types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What the orchestrator is currently doing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    /// Waiting for input
    Idle,
    /// A plan is being created
    Planning,
    /// A plan is being executed
    Executing,
    /// Execution is paused between steps
    Paused,
}

impl RunState {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Planning => "planning",
            Self::Executing => "executing",
            Self::Paused => "paused",
        }
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of one orchestrated request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Execution id
    pub execution_id: Uuid,
    /// Whether the request succeeded end to end
    pub success: bool,
    /// The user-facing response
    pub response: String,
    /// Tools actually invoked, flattened across tasks in plan order
    pub tools_used: Vec<String>,
    /// Error summary on failure
    pub error: Option<String>,
}

impl ExecutionResult {
    /// A successful result
    #[must_use]
    pub fn ok(execution_id: Uuid, response: impl Into<String>, tools_used: Vec<String>) -> Self {
        Self {
            execution_id,
            success: true,
            response: response.into(),
            tools_used,
            error: None,
        }
    }

    /// A failed result
    #[must_use]
    pub fn failed(
        execution_id: Uuid,
        response: impl Into<String>,
        tools_used: Vec<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            execution_id,
            success: false,
            response: response.into(),
            tools_used,
            error: Some(error.into()),
        }
    }
}

/// A point-in-time status snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Progress {
    /// Current state
    pub state: RunState,
    /// Ids of tasks currently in flight
    pub active_tasks: Vec<String>,
    /// Messages currently held in the conversation window
    pub conversation_messages: usize,
    /// Requests completed since startup
    pub completed_requests: u64,
}
