use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use telos_tools::RiskLevel;
use uuid::Uuid;

/// Status of an approval request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    /// Waiting for a decision
    Pending,
    /// Approved
    Approved,
    /// Rejected
    Rejected,
}

/// An approval request for one action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRequest {
    /// Unique request id
    pub id: Uuid,
    /// Execution this belongs to
    pub execution_id: Uuid,
    /// Action type (e.g. "shell", "file_write", "vcs")
    pub action_type: String,
    /// Human description of the action
    pub description: String,
    /// Risk level of the tool
    pub risk: RiskLevel,
    /// Structured details (tool name, arguments)
    pub details: serde_json::Value,
    /// Current status
    pub status: ApprovalStatus,
    /// When the request was created
    pub created_at: DateTime<Utc>,
    /// When it was resolved, if it was
    pub responded_at: Option<DateTime<Utc>>,
}

impl ApprovalRequest {
    /// Create a new pending request
    #[must_use]
    pub fn new(
        execution_id: Uuid,
        action_type: impl Into<String>,
        description: impl Into<String>,
        risk: RiskLevel,
        details: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            execution_id,
            action_type: action_type.into(),
            description: description.into(),
            risk,
            details,
            status: ApprovalStatus::Pending,
            created_at: Utc::now(),
            responded_at: None,
        }
    }

    /// Whether the request is still pending
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == ApprovalStatus::Pending
    }
}

/// The outcome of an approval request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalDecision {
    /// Whether the action may proceed
    pub approved: bool,
    /// Why, when provided by the decider
    pub reason: Option<String>,
}

impl ApprovalDecision {
    /// An approval
    #[must_use]
    pub fn approved() -> Self {
        Self {
            approved: true,
            reason: None,
        }
    }

    /// An approval with a reason
    #[must_use]
    pub fn approved_because(reason: impl Into<String>) -> Self {
        Self {
            approved: true,
            reason: Some(reason.into()),
        }
    }

    /// A denial with a reason
    #[must_use]
    pub fn denied(reason: impl Into<String>) -> Self {
        Self {
            approved: false,
            reason: Some(reason.into()),
        }
    }
}
