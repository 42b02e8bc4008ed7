//! Error types for telos-core

use thiserror::Error;

/// Planner error — fatal to the current request, surfaced to the user
#[derive(Debug, Error)]
pub enum PlannerError {
    /// The model's response could not be parsed after a retry
    #[error("planner produced no parseable plan")]
    Unparseable,

    /// A planned step names a tool absent from the registry
    #[error("planned step references unknown tool '{tool}'")]
    UnknownTool {
        /// The unresolved tool name
        tool: String,
    },

    /// A planned step's arguments violate the tool's schema
    #[error("planned arguments for '{tool}' are invalid: {reason}")]
    BadArguments {
        /// The tool whose schema was violated
        tool: String,
        /// What was wrong
        reason: String,
    },

    /// The dependency graph contains a cycle
    #[error("plan contains cyclic dependencies: {involved:?}")]
    CyclicDependencies {
        /// Task ids participating in the cycle
        involved: Vec<String>,
    },

    /// The LLM call backing the planner failed
    #[error("planner llm call failed: {0}")]
    Llm(#[from] telos_llm::Error),
}

/// Aggregate error describing a failed orchestration
#[derive(Debug, Clone)]
pub struct OrchestrationError {
    /// Ids of tasks that terminally failed
    pub failed_tasks: Vec<String>,
    /// True if some tasks still succeeded
    pub partial: bool,
}

impl std::fmt::Display for OrchestrationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.partial {
            write!(f, "partial failure: tasks {:?} failed", self.failed_tasks)
        } else {
            write!(f, "all tasks failed: {:?}", self.failed_tasks)
        }
    }
}

impl std::error::Error for OrchestrationError {}

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// Planning failed
    #[error("planning error: {0}")]
    Planner(#[from] PlannerError),

    /// Tool layer error
    #[error("tool error: {0}")]
    Tool(#[from] telos_tools::Error),

    /// LLM error outside planning
    #[error("llm error: {0}")]
    Llm(#[from] telos_llm::Error),

    /// Aggregate execution failure
    #[error("orchestration error: {0}")]
    Orchestration(OrchestrationError),

    /// Approval was denied or the gate failed
    #[error("approval error: {0}")]
    Approval(String),

    /// The run was aborted
    #[error("aborted")]
    Aborted,

    /// Internal invariant violation
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orchestration_error_display() {
        let partial = OrchestrationError {
            failed_tasks: vec!["t2".into()],
            partial: true,
        };
        assert!(partial.to_string().contains("partial"));

        let total = OrchestrationError {
            failed_tasks: vec!["t1".into(), "t2".into()],
            partial: false,
        };
        assert!(total.to_string().contains("all tasks failed"));
    }

    #[test]
    fn test_planner_error_conversion() {
        let err: Error = PlannerError::Unparseable.into();
        assert!(matches!(err, Error::Planner(PlannerError::Unparseable)));
    }
}
