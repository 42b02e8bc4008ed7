//! Plan and task types
//!
//! Plans are the planner's output: either a direct conversational answer or a
//! topologically sorted task graph. Task status transitions are enforced in
//! one place (`TaskStatus::can_transition_to`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;
use uuid::Uuid;

/// Advisory complexity label for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    /// Single-step or conversational
    Simple,
    /// A few coordinated steps
    Moderate,
    /// Many steps, file operations, or technical depth
    Complex,
}

/// What kind of plan this is
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PlanKind {
    /// A direct answer requiring no tools
    Conversation {
        /// The final answer text
        response: String,
    },
    /// A dependency-ordered task graph
    Tasks,
}

/// A single intended tool invocation within a task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedCall {
    /// Tool name; must resolve in the registry at dispatch time
    pub tool_name: String,
    /// Arguments conforming to the tool's schema
    pub arguments: serde_json::Value,
}

impl PlannedCall {
    /// Create a new planned call
    #[must_use]
    pub fn new(tool_name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments,
        }
    }
}

/// Task status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting on dependencies
    Pending,
    /// Dependencies satisfied, waiting for a worker
    Ready,
    /// Currently executing
    Running,
    /// Completed successfully
    Succeeded,
    /// Terminally failed after exhausting attempts
    Failed,
    /// Failed but will re-enter running
    Retrying,
    /// Exceeded its time budget
    TimedOut,
    /// Cancelled by abort
    Aborted,
    /// Never attempted because a dependency terminally failed
    Blocked,
}

impl TaskStatus {
    /// Whether this status is terminal
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::Failed | Self::TimedOut | Self::Aborted | Self::Blocked
        )
    }

    /// Whether a transition to `next` is legal
    #[must_use]
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        use TaskStatus::{
            Aborted, Blocked, Failed, Pending, Ready, Retrying, Running, Succeeded, TimedOut,
        };
        matches!(
            (self, next),
            (Pending, Ready)
                | (Pending, Blocked)
                | (Pending, Aborted)
                | (Ready, Running)
                | (Ready, Aborted)
                | (Ready, Blocked)
                | (Running, Succeeded)
                | (Running, Failed)
                | (Running, Retrying)
                | (Running, TimedOut)
                | (Running, Aborted)
                | (Retrying, Running)
                | (Retrying, Aborted)
        )
    }

    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Ready => "ready",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Retrying => "retrying",
            Self::TimedOut => "timed_out",
            Self::Aborted => "aborted",
            Self::Blocked => "blocked",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single unit of work within a plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Process-unique task id
    pub id: String,
    /// Natural-language description
    pub description: String,
    /// Ordered tool invocations (sequential within the task)
    pub tool_calls: Vec<PlannedCall>,
    /// Ids of tasks that must succeed first; same-plan only, acyclic
    pub dependencies: BTreeSet<String>,
    /// Current status
    pub status: TaskStatus,
    /// 0-based attempt counter
    pub attempt: u32,
    /// Attempt ceiling
    pub max_attempts: u32,
    /// Per-task time budget
    #[serde(with = "duration_millis")]
    pub timeout: Duration,
    /// When the task entered running
    pub started_at: Option<DateTime<Utc>>,
    /// When the task reached a terminal status
    pub ended_at: Option<DateTime<Utc>>,
    /// Output produced on success
    pub result: Option<serde_json::Value>,
    /// Error recorded on terminal failure
    pub error: Option<String>,
    /// Declared success criteria, if the planner produced any
    pub success_criteria: Option<String>,
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let ms = u64::deserialize(d)?;
        Ok(Duration::from_millis(ms))
    }
}

impl Task {
    /// Create a new pending task
    #[must_use]
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            tool_calls: Vec::new(),
            dependencies: BTreeSet::new(),
            status: TaskStatus::Pending,
            attempt: 0,
            max_attempts: 2,
            timeout: Duration::from_secs(20),
            started_at: None,
            ended_at: None,
            result: None,
            error: None,
            success_criteria: None,
        }
    }

    /// Add a tool call
    #[must_use]
    pub fn with_call(mut self, call: PlannedCall) -> Self {
        self.tool_calls.push(call);
        self
    }

    /// Add a dependency
    #[must_use]
    pub fn with_dependency(mut self, id: impl Into<String>) -> Self {
        self.dependencies.insert(id.into());
        self
    }

    /// Set the timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the attempt ceiling
    #[must_use]
    pub fn with_max_attempts(mut self, max: u32) -> Self {
        self.max_attempts = max;
        self
    }

    /// Set the success criteria
    #[must_use]
    pub fn with_success_criteria(mut self, criteria: impl Into<String>) -> Self {
        self.success_criteria = Some(criteria.into());
        self
    }

    /// Apply a status transition, enforcing the state machine.
    ///
    /// Returns false (and leaves the task untouched) on an illegal
    /// transition.
    pub fn transition(&mut self, next: TaskStatus) -> bool {
        if !self.status.can_transition_to(next) {
            return false;
        }
        match next {
            TaskStatus::Running => {
                if self.started_at.is_none() {
                    self.started_at = Some(Utc::now());
                }
            }
            s if s.is_terminal() => self.ended_at = Some(Utc::now()),
            _ => {}
        }
        self.status = next;
        true
    }
}

/// A plan: either a direct answer or an ordered task graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// Plan id
    pub id: Uuid,
    /// The prompt this plan answers
    pub original_prompt: String,
    /// Tasks in topological order (empty for conversation plans)
    pub tasks: Vec<Task>,
    /// Advisory complexity label
    pub complexity: Complexity,
    /// True iff at least two tasks have empty dependency sets
    pub parallelizable: bool,
    /// Conversation answer or task graph
    pub kind: PlanKind,
}

impl Plan {
    /// Create a conversation plan carrying a final answer
    #[must_use]
    pub fn conversation(prompt: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            original_prompt: prompt.into(),
            tasks: Vec::new(),
            complexity: Complexity::Simple,
            parallelizable: false,
            kind: PlanKind::Conversation {
                response: response.into(),
            },
        }
    }

    /// Create a task plan from topologically sorted tasks
    #[must_use]
    pub fn tasks(prompt: impl Into<String>, tasks: Vec<Task>, complexity: Complexity) -> Self {
        let parallelizable = tasks.iter().filter(|t| t.dependencies.is_empty()).count() >= 2;
        Self {
            id: Uuid::new_v4(),
            original_prompt: prompt.into(),
            tasks,
            complexity,
            parallelizable,
            kind: PlanKind::Tasks,
        }
    }

    /// Whether this is a conversation plan
    #[must_use]
    pub fn is_conversation(&self) -> bool {
        matches!(self.kind, PlanKind::Conversation { .. })
    }

    /// The conversational answer, if any
    #[must_use]
    pub fn conversation_response(&self) -> Option<&str> {
        match &self.kind {
            PlanKind::Conversation { response } => Some(response),
            PlanKind::Tasks => None,
        }
    }

    /// Look up a task by id
    #[must_use]
    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        assert!(TaskStatus::Pending.can_transition_to(TaskStatus::Ready));
        assert!(TaskStatus::Ready.can_transition_to(TaskStatus::Running));
        assert!(TaskStatus::Running.can_transition_to(TaskStatus::Succeeded));
        assert!(TaskStatus::Running.can_transition_to(TaskStatus::Retrying));
        assert!(TaskStatus::Retrying.can_transition_to(TaskStatus::Running));

        // Illegal jumps
        assert!(!TaskStatus::Pending.can_transition_to(TaskStatus::Running));
        assert!(!TaskStatus::Succeeded.can_transition_to(TaskStatus::Running));
        assert!(!TaskStatus::Failed.can_transition_to(TaskStatus::Running));
    }

    #[test]
    fn test_task_transition_bookkeeping() {
        let mut task = Task::new("t1", "read a file");
        assert!(task.transition(TaskStatus::Ready));
        assert!(task.transition(TaskStatus::Running));
        assert!(task.started_at.is_some());
        assert!(task.transition(TaskStatus::Succeeded));
        assert!(task.ended_at.is_some());

        // Terminal state refuses further transitions
        assert!(!task.transition(TaskStatus::Running));
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(TaskStatus::Succeeded.is_terminal());
        assert!(TaskStatus::Blocked.is_terminal());
        assert!(TaskStatus::Aborted.is_terminal());
        assert!(!TaskStatus::Retrying.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
    }

    #[test]
    fn test_conversation_plan() {
        let plan = Plan::conversation("What is 2+2?", "4");
        assert!(plan.is_conversation());
        assert_eq!(plan.conversation_response(), Some("4"));
        assert!(plan.tasks.is_empty());
    }

    #[test]
    fn test_parallelizable_detection() {
        let t1 = Task::new("t1", "a");
        let t2 = Task::new("t2", "b");
        let t3 = Task::new("t3", "c").with_dependency("t1");

        let plan = Plan::tasks("do things", vec![t1, t2, t3], Complexity::Moderate);
        assert!(plan.parallelizable);

        let t1 = Task::new("t1", "a");
        let t2 = Task::new("t2", "b").with_dependency("t1");
        let serial = Plan::tasks("do things", vec![t1, t2], Complexity::Simple);
        assert!(!serial.parallelizable);
    }

    #[test]
    fn test_task_serde_roundtrip() {
        let task = Task::new("t1", "check")
            .with_call(PlannedCall::new("web", serde_json::json!({"query": "x"})))
            .with_timeout(Duration::from_secs(15));
        let json = serde_json::to_string(&task).unwrap();
        let back: Task = serde_json::from_str(&json).unwrap();
        assert_eq!(back.timeout, Duration::from_secs(15));
        assert_eq!(back.tool_calls.len(), 1);
    }
}
