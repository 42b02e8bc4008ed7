//! Coordination messages between the orchestrator, planner, and executor
//!
//! These are observational: they record how the three components talked to
//! each other during one orchestration. The log is append-only within a run
//! and cleared at the start of the next.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// One of the three coordinating components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    /// The request-lifecycle owner
    Orchestrator,
    /// The plan producer
    Planner,
    /// The plan runner
    Executor,
}

impl AgentRole {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Orchestrator => "orchestrator",
            Self::Planner => "planner",
            Self::Executor => "executor",
        }
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What kind of message this is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// A request for work or information
    Question,
    /// An answer to a question
    Response,
    /// A mid-run strategy change
    Adjustment,
    /// A progress note
    Status,
    /// A failure report
    Error,
}

/// A message between two components
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinationMessage {
    /// Sender
    pub from: AgentRole,
    /// Receiver
    pub to: AgentRole,
    /// Message kind
    pub kind: MessageKind,
    /// Human-readable content
    pub content: String,
    /// Optional structured payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    /// When the message was recorded
    pub at: DateTime<Utc>,
}

impl CoordinationMessage {
    /// Create a new message
    #[must_use]
    pub fn new(
        from: AgentRole,
        to: AgentRole,
        kind: MessageKind,
        content: impl Into<String>,
    ) -> Self {
        Self {
            from,
            to,
            kind,
            content: content.into(),
            payload: None,
            at: Utc::now(),
        }
    }

    /// Attach a structured payload
    #[must_use]
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// Append-only log of coordination messages for one orchestration
#[derive(Debug, Default)]
pub struct CoordinationLog {
    messages: Mutex<Vec<CoordinationMessage>>,
}

impl CoordinationLog {
    /// Create an empty log
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message
    pub fn push(&self, message: CoordinationMessage) {
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(message);
    }

    /// Snapshot the current messages
    #[must_use]
    pub fn snapshot(&self) -> Vec<CoordinationMessage> {
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of recorded messages
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Whether the log is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear the log at the start of a new orchestration
    pub fn clear(&self) {
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_append_and_clear() {
        let log = CoordinationLog::new();
        assert!(log.is_empty());

        log.push(CoordinationMessage::new(
            AgentRole::Orchestrator,
            AgentRole::Planner,
            MessageKind::Question,
            "plan this request",
        ));
        log.push(
            CoordinationMessage::new(
                AgentRole::Planner,
                AgentRole::Orchestrator,
                MessageKind::Response,
                "plan ready",
            )
            .with_payload(serde_json::json!({"tasks": 3})),
        );

        let snapshot = log.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].kind, MessageKind::Question);
        assert_eq!(snapshot[1].payload.as_ref().unwrap()["tasks"], 3);

        log.clear();
        assert!(log.is_empty());
    }
}
