use super::types::{ApprovalDecision, ApprovalRequest, ApprovalStatus};
use super::ApprovalGate;
use crate::config::ApprovalMode;
use crate::events::{AgentEvent, EventBus};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{oneshot, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Shared approval gate handle
pub type SharedApprovalGate = Arc<dyn ApprovalGate>;

/// Manager for approval requests
///
/// Policy decisions (mode, emergency override, risk) are applied first; only
/// requests the policy cannot settle are parked for an out-of-band decision
/// via `resolve`. Batch resolution and an emergency override are supported
/// for operator surfaces.
pub struct ApprovalManager {
    mode: ApprovalMode,
    requests: RwLock<HashMap<Uuid, ApprovalRequest>>,
    resolvers: RwLock<HashMap<Uuid, oneshot::Sender<ApprovalDecision>>>,
    emergency_override: AtomicBool,
    bus: Option<Arc<EventBus>>,
}

impl ApprovalManager {
    /// Create a manager with the given mode
    #[must_use]
    pub fn new(mode: ApprovalMode) -> Self {
        Self {
            mode,
            requests: RwLock::new(HashMap::new()),
            resolvers: RwLock::new(HashMap::new()),
            emergency_override: AtomicBool::new(false),
            bus: None,
        }
    }

    /// Publish `ApprovalRequired` events on this bus
    #[must_use]
    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    /// The configured mode
    #[must_use]
    pub fn mode(&self) -> ApprovalMode {
        self.mode
    }

    /// Turn the emergency override on or off. While on, every request is
    /// approved immediately.
    pub fn set_emergency_override(&self, enabled: bool) {
        if enabled {
            warn!("Approval emergency override enabled - all requests auto-approved");
        }
        self.emergency_override.store(enabled, Ordering::SeqCst);
    }

    /// Resolve a pending request. Returns false if the id is unknown or
    /// already resolved.
    pub async fn resolve(&self, id: Uuid, decision: ApprovalDecision) -> bool {
        {
            let mut requests = self.requests.write().await;
            match requests.get_mut(&id) {
                Some(request) if request.is_pending() => {
                    request.status = if decision.approved {
                        ApprovalStatus::Approved
                    } else {
                        ApprovalStatus::Rejected
                    };
                    request.responded_at = Some(Utc::now());
                }
                _ => return false,
            }
        }

        let sender = self.resolvers.write().await.remove(&id);
        if let Some(tx) = sender {
            let _ = tx.send(decision);
            true
        } else {
            false
        }
    }

    /// Resolve every pending request with the same decision (batch mode).
    /// Returns the number of requests resolved.
    pub async fn resolve_all(&self, approved: bool, reason: impl Into<String>) -> usize {
        let reason = reason.into();
        let ids: Vec<Uuid> = self
            .requests
            .read()
            .await
            .values()
            .filter(|r| r.is_pending())
            .map(|r| r.id)
            .collect();

        let mut resolved = 0;
        for id in ids {
            let decision = if approved {
                ApprovalDecision::approved_because(reason.clone())
            } else {
                ApprovalDecision::denied(reason.clone())
            };
            if self.resolve(id, decision).await {
                resolved += 1;
            }
        }
        resolved
    }

    /// All currently pending requests
    pub async fn pending(&self) -> Vec<ApprovalRequest> {
        self.requests
            .read()
            .await
            .values()
            .filter(|r| r.is_pending())
            .cloned()
            .collect()
    }

    /// Get a request by id
    pub async fn get(&self, id: Uuid) -> Option<ApprovalRequest> {
        self.requests.read().await.get(&id).cloned()
    }

    /// Deny every pending request (used on abort so no task waits forever)
    pub async fn deny_all_pending(&self, reason: impl Into<String>) -> usize {
        self.resolve_all(false, reason).await
    }

    fn policy_decision(&self, request: &ApprovalRequest) -> Option<ApprovalDecision> {
        if self.emergency_override.load(Ordering::SeqCst) {
            return Some(ApprovalDecision::approved_because("emergency override"));
        }
        match self.mode {
            ApprovalMode::Yolo => Some(ApprovalDecision::approved_because("auto-approve policy")),
            ApprovalMode::AutoEdit if request.action_type == "file_write" => {
                Some(ApprovalDecision::approved_because("auto_edit policy"))
            }
            _ => None,
        }
    }
}

#[async_trait::async_trait]
impl ApprovalGate for ApprovalManager {
    async fn request(&self, request: ApprovalRequest) -> ApprovalDecision {
        if let Some(decision) = self.policy_decision(&request) {
            debug!(
                action = %request.action_type,
                approved = decision.approved,
                "Approval settled by policy"
            );
            return decision;
        }

        let id = request.id;
        let execution_id = request.execution_id;
        let (tx, rx) = oneshot::channel();

        {
            let mut requests = self.requests.write().await;
            requests.insert(id, request);
        }
        {
            let mut resolvers = self.resolvers.write().await;
            resolvers.insert(id, tx);
        }

        if let Some(bus) = &self.bus {
            bus.publish(AgentEvent::ApprovalRequired {
                execution_id,
                request_id: id,
            });
        }

        info!(request_id = %id, "Waiting for approval decision");

        // No timeout: pending requests resolve only via resolve()/abort.
        // A dropped sender (manager shutdown) counts as a denial.
        rx.await
            .unwrap_or_else(|_| ApprovalDecision::denied("approval channel closed"))
    }
}
