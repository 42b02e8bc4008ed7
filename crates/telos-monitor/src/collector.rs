//! Event-stream aggregation
//!
//! Turns the agent's event stream into live metrics. Aggregation is pure
//! with respect to the stream: replaying a recorded stream through a fresh
//! collector reproduces the same aggregates as the live run.

use crate::metrics::MetricsRegistry;
use telos_core::AgentEvent;

/// Aggregates agent events into a metrics registry
#[derive(Debug, Default, Clone)]
pub struct MetricsCollector {
    registry: MetricsRegistry,
}

impl MetricsCollector {
    /// Create a collector with a fresh registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The backing registry
    #[must_use]
    pub fn registry(&self) -> &MetricsRegistry {
        &self.registry
    }

    /// Fold one event into the aggregates
    pub fn observe(&self, event: &AgentEvent) {
        match event {
            AgentEvent::OrchestrationStarted { .. } => {
                self.registry.counter("telos_orchestrations_started").inc();
                self.registry.gauge("telos_active_orchestrations").inc();
            }
            AgentEvent::OrchestrationCompleted { success, .. } => {
                let status = if *success { "ok" } else { "failed" };
                self.registry
                    .labeled_counter("telos_orchestrations_total")
                    .inc(&[("status", status)]);
                self.registry.gauge("telos_active_orchestrations").dec();
            }
            AgentEvent::OrchestrationFailed { .. } => {
                self.registry.counter("telos_orchestration_errors").inc();
            }
            AgentEvent::PlanningStarted { .. } => {
                self.registry.counter("telos_planning_started").inc();
            }
            AgentEvent::PlanningCompleted { plan_kind, .. } => {
                self.registry
                    .labeled_counter("telos_plans_total")
                    .inc(&[("kind", plan_kind.as_str())]);
            }
            AgentEvent::TaskStarted { .. } => {
                self.registry.gauge("telos_active_tasks").inc();
            }
            AgentEvent::TaskCompleted { duration_ms, .. } => {
                self.registry.gauge("telos_active_tasks").dec();
                self.registry
                    .labeled_counter("telos_tasks_total")
                    .inc(&[("status", "succeeded")]);
                self.registry
                    .histogram("telos_task_duration_seconds")
                    .observe(*duration_ms as f64 / 1000.0);
            }
            AgentEvent::TaskFailed { status, .. } => {
                // Blocked tasks never started, so the gauge only moves for
                // tasks that did.
                if status != "blocked" {
                    self.registry.gauge("telos_active_tasks").dec();
                }
                self.registry
                    .labeled_counter("telos_tasks_total")
                    .inc(&[("status", status.as_str())]);
            }
            AgentEvent::ToolExecute { .. } => {
                self.registry.counter("telos_tool_dispatches").inc();
            }
            AgentEvent::ToolResult {
                tool_name,
                success,
                duration_ms,
                ..
            } => {
                let status = if *success { "ok" } else { "error" };
                self.registry
                    .labeled_counter("telos_tool_executions_total")
                    .inc(&[("tool", tool_name.as_str()), ("status", status)]);
                self.registry
                    .labeled_histogram("telos_tool_duration_seconds")
                    .observe(&[("tool", tool_name.as_str())], *duration_ms as f64 / 1000.0);
            }
            AgentEvent::TokenUsage { total_tokens, .. } => {
                self.registry
                    .counter("telos_tokens_total")
                    .inc_by(u64::from(*total_tokens));
            }
            AgentEvent::MemoryLayerUpdate { dropped, .. } => {
                self.registry
                    .counter("telos_memory_messages_dropped")
                    .inc_by(*dropped as u64);
            }
            AgentEvent::HealthAlert { .. } => {
                self.registry.counter("telos_health_alerts_total").inc();
            }
            AgentEvent::ApprovalRequired { .. } => {
                self.registry.counter("telos_approvals_requested").inc();
            }
            AgentEvent::StatusUpdate { .. } | AgentEvent::Coordination { .. } => {}
        }
    }

    /// Replay a recorded stream into a fresh collector
    #[must_use]
    pub fn replay<'a, I>(events: I) -> Self
    where
        I: IntoIterator<Item = &'a AgentEvent>,
    {
        let collector = Self::new();
        for event in events {
            collector.observe(event);
        }
        collector
    }
}
