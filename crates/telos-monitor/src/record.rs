//! Execution and session records
//!
//! Records are write-only from the agent's perspective; the bridge owns
//! persistence, batching, and retries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use telos_core::AgentEvent;
use uuid::Uuid;

/// What kind of activity a record captures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    /// A tool invocation resolved
    ToolExecution,
    /// A plan was produced
    Planning,
    /// An orchestration failed
    OrchestrationError,
    /// The watchdog raised a stall alert
    HealthAlert,
}

impl RecordType {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ToolExecution => "tool_execution",
            Self::Planning => "planning",
            Self::OrchestrationError => "orchestration_error",
            Self::HealthAlert => "health_alert",
        }
    }
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RecordType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "tool_execution" => Ok(Self::ToolExecution),
            "planning" => Ok(Self::Planning),
            "orchestration_error" => Ok(Self::OrchestrationError),
            "health_alert" => Ok(Self::HealthAlert),
            _ => Err(format!("unknown record type: {s}")),
        }
    }
}

/// One persisted observation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// Record id
    pub id: Uuid,
    /// Monitoring session this belongs to
    pub session_id: Uuid,
    /// Project label, when one is configured
    pub project_id: Option<String>,
    /// What kind of activity this captures
    pub record_type: RecordType,
    /// Tool name for tool executions
    pub tool_name: Option<String>,
    /// Input summary
    pub input: Option<serde_json::Value>,
    /// Output summary
    pub output: Option<serde_json::Value>,
    /// Whether the activity succeeded
    pub success: bool,
    /// Duration in milliseconds
    pub duration_ms: i64,
    /// Error text on failure
    pub error_message: Option<String>,
    /// When the record was created
    pub created_at: DateTime<Utc>,
}

impl ExecutionRecord {
    /// Create a record of the given type
    #[must_use]
    pub fn new(session_id: Uuid, record_type: RecordType) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            project_id: None,
            record_type,
            tool_name: None,
            input: None,
            output: None,
            success: true,
            duration_ms: 0,
            error_message: None,
            created_at: Utc::now(),
        }
    }

    /// Derive a record from an event, when the event is record-worthy.
    ///
    /// Tool results, completed plans, orchestration errors, and health
    /// alerts persist; chatty progress events do not.
    #[must_use]
    pub fn from_event(session_id: Uuid, event: &AgentEvent) -> Option<Self> {
        match event {
            AgentEvent::ToolResult {
                execution_id,
                tool_name,
                success,
                duration_ms,
                ..
            } => {
                let mut record = Self::new(session_id, RecordType::ToolExecution);
                record.tool_name = Some(tool_name.clone());
                record.input = Some(serde_json::json!({"execution_id": execution_id}));
                record.success = *success;
                record.duration_ms = *duration_ms as i64;
                Some(record)
            }
            AgentEvent::PlanningCompleted {
                execution_id,
                plan_id,
                plan_kind,
                task_count,
            } => {
                let mut record = Self::new(session_id, RecordType::Planning);
                record.input = Some(serde_json::json!({"execution_id": execution_id}));
                record.output = Some(serde_json::json!({
                    "plan_id": plan_id,
                    "kind": plan_kind,
                    "task_count": task_count,
                }));
                Some(record)
            }
            AgentEvent::OrchestrationFailed {
                execution_id,
                error,
            } => {
                let mut record = Self::new(session_id, RecordType::OrchestrationError);
                record.input = Some(serde_json::json!({"execution_id": execution_id}));
                record.success = false;
                record.error_message = Some(error.clone());
                Some(record)
            }
            AgentEvent::HealthAlert {
                execution_id,
                detail,
            } => {
                let mut record = Self::new(session_id, RecordType::HealthAlert);
                record.input = Some(serde_json::json!({"execution_id": execution_id}));
                record.success = false;
                record.error_message = Some(detail.clone());
                Some(record)
            }
            _ => None,
        }
    }
}

/// Session lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Session is receiving events
    Active,
    /// Session ended normally
    Ended,
}

impl SessionStatus {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Ended => "ended",
        }
    }
}

/// One monitoring session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Session id
    pub id: Uuid,
    /// Operating mode ("attached" or "autonomous")
    pub mode: String,
    /// When the session started
    pub started_at: DateTime<Utc>,
    /// When the session ended, if it has
    pub ended_at: Option<DateTime<Utc>>,
    /// User turns observed
    pub turn_count: i64,
    /// Total tokens observed
    pub tokens_used: i64,
    /// Lifecycle status
    pub status: SessionStatus,
}

impl SessionRecord {
    /// Start a new session in the given mode
    #[must_use]
    pub fn new(mode: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            mode: mode.into(),
            started_at: Utc::now(),
            ended_at: None,
            turn_count: 0,
            tokens_used: 0,
            status: SessionStatus::Active,
        }
    }

    /// Mark the session ended
    pub fn end(&mut self) {
        self.ended_at = Some(Utc::now());
        self.status = SessionStatus::Ended;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_result_becomes_record() {
        let session = Uuid::new_v4();
        let event = AgentEvent::ToolResult {
            execution_id: Uuid::new_v4(),
            task_id: "t1".into(),
            tool_name: "file".into(),
            success: true,
            duration_ms: 42,
        };

        let record = ExecutionRecord::from_event(session, &event).unwrap();
        assert_eq!(record.record_type, RecordType::ToolExecution);
        assert_eq!(record.tool_name.as_deref(), Some("file"));
        assert!(record.success);
        assert_eq!(record.duration_ms, 42);
    }

    #[test]
    fn test_progress_events_not_recorded() {
        let session = Uuid::new_v4();
        let event = AgentEvent::StatusUpdate {
            execution_id: Uuid::new_v4(),
            phase: "planning".into(),
            detail: "working".into(),
        };
        assert!(ExecutionRecord::from_event(session, &event).is_none());
    }

    #[test]
    fn test_session_lifecycle() {
        let mut session = SessionRecord::new("attached");
        assert_eq!(session.status, SessionStatus::Active);
        session.end();
        assert_eq!(session.status, SessionStatus::Ended);
        assert!(session.ended_at.is_some());
    }
}
