//! Approval - gating side-effecting tool dispatch
//!
//! Side-effecting tools (shell, file writes, VCS mutation) may require a
//! user decision before they run. Decisions arrive out-of-band: the manager
//! parks the requesting task on a oneshot and an operator surface resolves
//! it. Waits are deliberately un-timed; only an explicit denial or an
//! orchestrator abort releases a pending request.

mod gate;
mod types;

#[cfg(test)]
mod tests;

pub use gate::{ApprovalManager, SharedApprovalGate};
pub use types::{ApprovalDecision, ApprovalRequest, ApprovalStatus};

use async_trait::async_trait;

/// Trait for approval gates
///
/// The executor consults this before dispatching an approval-requiring tool.
/// Implementations must not time out on their own; a pending request is
/// resolved only by a decision or an abort.
#[async_trait]
pub trait ApprovalGate: Send + Sync {
    /// Request a decision for an action. Blocks until resolved.
    async fn request(&self, request: ApprovalRequest) -> ApprovalDecision;
}
