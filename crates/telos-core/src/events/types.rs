use crate::coordination::CoordinationMessage;
use serde::Serialize;
use uuid::Uuid;

/// Events emitted during orchestration.
///
/// Payloads exclude bulky data (full tool outputs, file contents); detail
/// lives in the execution records the monitor persists, keyed by
/// `execution_id`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// A user request has entered the orchestrator
    OrchestrationStarted {
        /// Unique execution identifier
        execution_id: Uuid,
        /// The user prompt
        prompt: String,
    },
    /// The request finished
    OrchestrationCompleted {
        /// Execution identifier
        execution_id: Uuid,
        /// Whether every task (if any) succeeded
        success: bool,
    },
    /// The request failed before or during execution
    OrchestrationFailed {
        /// Execution identifier
        execution_id: Uuid,
        /// Error description
        error: String,
    },
    /// Planning has started
    PlanningStarted {
        /// Execution identifier
        execution_id: Uuid,
    },
    /// Planning produced a plan
    PlanningCompleted {
        /// Execution identifier
        execution_id: Uuid,
        /// Plan identifier
        plan_id: Uuid,
        /// "conversation" or "tasks"
        plan_kind: String,
        /// Number of tasks in the plan
        task_count: usize,
    },
    /// A task entered running
    TaskStarted {
        /// Execution identifier
        execution_id: Uuid,
        /// Task identifier
        task_id: String,
        /// Task description
        description: String,
    },
    /// A task succeeded
    TaskCompleted {
        /// Execution identifier
        execution_id: Uuid,
        /// Task identifier
        task_id: String,
        /// Wall-clock duration in milliseconds
        duration_ms: u64,
    },
    /// A task reached a terminal failure status
    TaskFailed {
        /// Execution identifier
        execution_id: Uuid,
        /// Task identifier
        task_id: String,
        /// Terminal status ("failed", "timed_out", "aborted", "blocked")
        status: String,
        /// Error description
        error: String,
    },
    /// A tool invocation is being dispatched
    ToolExecute {
        /// Execution identifier
        execution_id: Uuid,
        /// Task the call belongs to
        task_id: String,
        /// Tool name
        tool_name: String,
    },
    /// A tool invocation resolved
    ToolResult {
        /// Execution identifier
        execution_id: Uuid,
        /// Task the call belongs to
        task_id: String,
        /// Tool name
        tool_name: String,
        /// Whether the call succeeded
        success: bool,
        /// Call duration in milliseconds
        duration_ms: u64,
    },
    /// Free-form progress note
    StatusUpdate {
        /// Execution identifier
        execution_id: Uuid,
        /// Which phase emitted the note
        phase: String,
        /// Detail text
        detail: String,
    },
    /// A coordination message passed between components
    Coordination {
        /// Execution identifier
        execution_id: Uuid,
        /// The message
        message: CoordinationMessage,
    },
    /// Token usage reported by the LLM client
    TokenUsage {
        /// Execution identifier
        execution_id: Uuid,
        /// Prompt tokens
        prompt_tokens: u32,
        /// Completion tokens
        completion_tokens: u32,
        /// Total tokens
        total_tokens: u32,
    },
    /// The conversation window trimmed old messages
    MemoryLayerUpdate {
        /// Which layer changed
        layer: String,
        /// Messages retained after the update
        retained: usize,
        /// Messages dropped by the update
        dropped: usize,
    },
    /// The watchdog noticed a stall
    HealthAlert {
        /// Execution identifier
        execution_id: Uuid,
        /// What was observed
        detail: String,
    },
    /// A side-effecting tool is waiting on approval
    ApprovalRequired {
        /// Execution identifier
        execution_id: Uuid,
        /// Approval request identifier
        request_id: Uuid,
    },
}

impl AgentEvent {
    /// Get the execution id from any event variant.
    ///
    /// Returns a nil UUID for events without execution context.
    #[must_use]
    pub fn execution_id(&self) -> Uuid {
        match self {
            Self::OrchestrationStarted { execution_id, .. }
            | Self::OrchestrationCompleted { execution_id, .. }
            | Self::OrchestrationFailed { execution_id, .. }
            | Self::PlanningStarted { execution_id }
            | Self::PlanningCompleted { execution_id, .. }
            | Self::TaskStarted { execution_id, .. }
            | Self::TaskCompleted { execution_id, .. }
            | Self::TaskFailed { execution_id, .. }
            | Self::ToolExecute { execution_id, .. }
            | Self::ToolResult { execution_id, .. }
            | Self::StatusUpdate { execution_id, .. }
            | Self::Coordination { execution_id, .. }
            | Self::TokenUsage { execution_id, .. }
            | Self::HealthAlert { execution_id, .. }
            | Self::ApprovalRequired { execution_id, .. } => *execution_id,
            Self::MemoryLayerUpdate { .. } => Uuid::nil(),
        }
    }

    /// Short name of the variant, for metrics labels
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::OrchestrationStarted { .. } => "orchestration_started",
            Self::OrchestrationCompleted { .. } => "orchestration_completed",
            Self::OrchestrationFailed { .. } => "orchestration_failed",
            Self::PlanningStarted { .. } => "planning_started",
            Self::PlanningCompleted { .. } => "planning_completed",
            Self::TaskStarted { .. } => "task_started",
            Self::TaskCompleted { .. } => "task_completed",
            Self::TaskFailed { .. } => "task_failed",
            Self::ToolExecute { .. } => "tool_execute",
            Self::ToolResult { .. } => "tool_result",
            Self::StatusUpdate { .. } => "status_update",
            Self::Coordination { .. } => "coordination",
            Self::TokenUsage { .. } => "token_usage",
            Self::MemoryLayerUpdate { .. } => "memory_layer_update",
            Self::HealthAlert { .. } => "health_alert",
            Self::ApprovalRequired { .. } => "approval_required",
        }
    }
}
