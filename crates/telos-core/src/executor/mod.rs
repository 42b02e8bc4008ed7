//! Executor - bounded-concurrency plan execution
//!
//! Runs a plan's task graph as a partial order: a ready queue feeds a pool
//! of at most `max_concurrency` in-flight tasks, each with its own
//! cancellation token and timeout. Tool calls inside a task run
//! sequentially; parallelism exists only across independent tasks.
//!
//! `execute_plan` never fails as a whole — partial failures come back in the
//! report vector, and dependents of a terminally failed task are reported as
//! blocked without being attempted.
//!
//! # Module Structure
//!
//! - `dispatch`: per-task execution and the tool dispatch contract
//! - `recovery`: failure-class-driven recovery strategies
//! - `synthesis`: content enrichment for dependent file writes
//! - `watchdog`: runaway-task cancellation and stall alerts

mod dispatch;
mod recovery;
mod synthesis;
mod watchdog;


use crate::approval::SharedApprovalGate;
use crate::config::ApprovalMode;
use crate::context::ExecutionContext;
use crate::coordination::CoordinationLog;
use crate::events::{AgentEvent, EventBus};
use crate::plan::{Plan, Task, TaskStatus};
use crate::planner::Planner;
use dashmap::{DashMap, DashSet};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use telos_llm::LlmClient;
use telos_tools::{FailureClass, ToolRegistry};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

pub(crate) use watchdog::WatchdogState;

/// Configuration for the executor
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Maximum number of concurrently running tasks
    pub max_concurrency: usize,
    /// How often the watchdog inspects in-flight tasks
    pub watchdog_interval: Duration,
    /// Stall window after which a health alert fires
    pub stall_alert_after: Duration,
    /// A task is force-cancelled past `timeout * grace_factor`
    pub grace_factor: f64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 3,
            watchdog_interval: Duration::from_secs(10),
            stall_alert_after: Duration::from_secs(60),
            grace_factor: 1.5,
        }
    }
}

impl ExecutorConfig {
    /// Create a new configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the concurrency ceiling
    #[must_use]
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max.max(1);
        self
    }

    /// Set the watchdog interval
    #[must_use]
    pub fn with_watchdog_interval(mut self, interval: Duration) -> Self {
        self.watchdog_interval = interval;
        self
    }

    /// Set the stall-alert window
    #[must_use]
    pub fn with_stall_alert_after(mut self, window: Duration) -> Self {
        self.stall_alert_after = window;
        self
    }
}

/// The outcome of one task, returned from `execute_plan`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskReport {
    /// Task id
    pub task_id: String,
    /// Task description
    pub description: String,
    /// Terminal status
    pub status: TaskStatus,
    /// Output produced on success
    pub output: Option<serde_json::Value>,
    /// Error text on failure
    pub error: Option<String>,
    /// Classified error, when one applies
    pub error_class: Option<FailureClass>,
    /// Attempts consumed (1-based count of runs)
    pub attempts: u32,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
    /// Tools actually invoked, in call order
    pub tools_used: Vec<String>,
    /// Whether a recovery strategy produced the result
    pub recovered: bool,
}

impl TaskReport {
    /// Whether the task ended in success
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.status == TaskStatus::Succeeded
    }

    fn blocked(task: &Task, blocking_id: &str) -> Self {
        Self {
            task_id: task.id.clone(),
            description: task.description.clone(),
            status: TaskStatus::Blocked,
            output: None,
            error: Some(format!("blocked by failed task '{blocking_id}'")),
            error_class: None,
            attempts: 0,
            duration_ms: 0,
            tools_used: Vec::new(),
            recovered: false,
        }
    }

    fn aborted(task: &Task) -> Self {
        Self {
            task_id: task.id.clone(),
            description: task.description.clone(),
            status: TaskStatus::Aborted,
            output: None,
            error: Some("aborted".to_string()),
            error_class: None,
            attempts: 0,
            duration_ms: 0,
            tools_used: Vec::new(),
            recovered: false,
        }
    }
}

/// State shared with in-flight task futures and the watchdog
#[derive(Debug)]
pub(crate) struct ActiveTask {
    pub token: CancellationToken,
    pub started: std::time::Instant,
    pub timeout: Duration,
}

/// Executor for dependency-ordered plans
pub struct Executor {
    pub(crate) registry: Arc<ToolRegistry>,
    pub(crate) bus: Arc<EventBus>,
    pub(crate) client: Option<Arc<dyn LlmClient>>,
    pub(crate) planner: Option<Arc<Planner>>,
    pub(crate) approval: Option<SharedApprovalGate>,
    pub(crate) approval_mode: ApprovalMode,
    pub(crate) coordination: Arc<CoordinationLog>,
    pub(crate) active: Arc<DashMap<String, ActiveTask>>,
    pub(crate) forced_timeouts: Arc<DashSet<String>>,
    pub(crate) config: ExecutorConfig,
}

impl Clone for Executor {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            bus: Arc::clone(&self.bus),
            client: self.client.clone(),
            planner: self.planner.clone(),
            approval: self.approval.clone(),
            approval_mode: self.approval_mode,
            coordination: Arc::clone(&self.coordination),
            active: Arc::clone(&self.active),
            forced_timeouts: Arc::clone(&self.forced_timeouts),
            config: self.config.clone(),
        }
    }
}

impl Executor {
    /// Create a new executor
    #[must_use]
    pub fn new(registry: Arc<ToolRegistry>, bus: Arc<EventBus>, config: ExecutorConfig) -> Self {
        Self {
            registry,
            bus,
            client: None,
            planner: None,
            approval: None,
            approval_mode: ApprovalMode::default(),
            coordination: Arc::new(CoordinationLog::new()),
            active: Arc::new(DashMap::new()),
            forced_timeouts: Arc::new(DashSet::new()),
            config,
        }
    }

    /// Wire in an LLM client for grounded content synthesis
    #[must_use]
    pub fn with_llm_client(mut self, client: Arc<dyn LlmClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Wire in the planner used for argument re-synthesis
    #[must_use]
    pub fn with_planner(mut self, planner: Arc<Planner>) -> Self {
        self.planner = Some(planner);
        self
    }

    /// Wire in the approval gate and its mode
    #[must_use]
    pub fn with_approval(mut self, gate: SharedApprovalGate, mode: ApprovalMode) -> Self {
        self.approval = Some(gate);
        self.approval_mode = mode;
        self
    }

    /// Share a coordination log with the orchestrator
    #[must_use]
    pub fn with_coordination_log(mut self, log: Arc<CoordinationLog>) -> Self {
        self.coordination = log;
        self
    }

    /// Ids of tasks currently in flight
    #[must_use]
    pub fn active_tasks(&self) -> Vec<String> {
        self.active.iter().map(|e| e.key().clone()).collect()
    }

    /// Cancel one in-flight task
    pub fn abort(&self, task_id: &str) -> bool {
        if let Some(entry) = self.active.get(task_id) {
            entry.token.cancel();
            info!(task_id = %task_id, "Task abort requested");
            true
        } else {
            false
        }
    }

    /// Cancel every in-flight task
    pub fn abort_all(&self) {
        for entry in self.active.iter() {
            entry.token.cancel();
        }
    }

    /// Execute a plan against an execution context.
    ///
    /// Returns one report per task, in the plan's topological order. Never
    /// fails as a whole; partial failures are carried in the reports.
    #[instrument(skip(self, plan, ctx, cancel), fields(plan_id = %plan.id, tasks = plan.tasks.len()))]
    pub async fn execute_plan(
        &self,
        execution_id: Uuid,
        plan: &Plan,
        ctx: &Arc<ExecutionContext>,
        cancel: CancellationToken,
    ) -> Vec<TaskReport> {
        let order: Vec<String> = plan.tasks.iter().map(|t| t.id.clone()).collect();
        let mut pending: HashMap<String, Task> = plan
            .tasks
            .iter()
            .cloned()
            .map(|t| (t.id.clone(), t))
            .collect();
        let mut reports: HashMap<String, TaskReport> = HashMap::new();
        let mut in_flight: JoinSet<TaskReport> = JoinSet::new();
        let mut ready: VecDeque<String> = VecDeque::new();
        let mut succeeded: HashSet<String> = HashSet::new();

        // Watchdog for this plan run
        let watchdog_state = WatchdogState::new();
        let watchdog = watchdog::spawn(
            execution_id,
            Arc::clone(&self.active),
            Arc::clone(&self.forced_timeouts),
            Arc::clone(&self.bus),
            watchdog_state.clone(),
            self.config.clone(),
        );

        // Seed the ready queue with dependency-free tasks, in plan order
        for id in &order {
            if pending[id].dependencies.is_empty() {
                ready.push_back(id.clone());
            }
        }

        loop {
            // Dispatch while below the concurrency ceiling
            while in_flight.len() < self.config.max_concurrency {
                let Some(id) = ready.pop_front() else { break };
                let Some(mut task) = pending.remove(&id) else {
                    continue;
                };
                if !task.transition(TaskStatus::Ready) {
                    warn!(task_id = %id, "Task refused ready transition");
                }

                let prior = ctx.outputs_for(&task.dependencies.iter().cloned().collect::<Vec<_>>());
                let token = cancel.child_token();
                self.active.insert(
                    id.clone(),
                    ActiveTask {
                        token: token.clone(),
                        started: std::time::Instant::now(),
                        timeout: task.timeout,
                    },
                );
                watchdog_state.note_progress();

                let runner = self.clone();
                let ctx = Arc::clone(ctx);
                debug!(task_id = %id, "Dispatching task");
                in_flight
                    .spawn(async move { runner.run_task(execution_id, task, ctx, prior, token).await });
            }

            if in_flight.is_empty() {
                break;
            }

            // Wait for the next completion and promote dependents
            let Some(joined) = in_flight.join_next().await else {
                break;
            };
            let report = match joined {
                Ok(report) => report,
                Err(e) => {
                    // A panicking task future is an internal defect; record
                    // it and keep the rest of the plan going.
                    warn!(error = %e, "Task future join error");
                    continue;
                }
            };

            self.active.remove(&report.task_id);
            self.forced_timeouts.remove(&report.task_id);
            watchdog_state.note_progress();

            if report.succeeded() {
                if let Some(output) = &report.output {
                    ctx.record_output(&report.task_id, output.clone());
                }
                succeeded.insert(report.task_id.clone());
            } else {
                // Transitively block everything that depends on this task
                self.block_dependents(execution_id, &report.task_id, &mut pending, &mut reports);
            }
            reports.insert(report.task_id.clone(), report);

            // Promote tasks whose dependency set is now satisfied
            for id in &order {
                if pending.contains_key(id)
                    && !ready.contains(id)
                    && pending[id].dependencies.iter().all(|d| succeeded.contains(d))
                {
                    ready.push_back(id.clone());
                }
            }

            // Global abort: stop dispatching, drain what's running
            if cancel.is_cancelled() && !ready.is_empty() {
                ready.clear();
            }
        }

        watchdog.abort();

        // Anything never dispatched: blocked if a dependency failed,
        // aborted if the run was cancelled out from under it.
        for id in &order {
            if let Some(task) = pending.remove(id) {
                let report = if cancel.is_cancelled() {
                    TaskReport::aborted(&task)
                } else if let Some(blocking) = task
                    .dependencies
                    .iter()
                    .find(|d| reports.get(*d).map(|r| !r.succeeded()).unwrap_or(false))
                {
                    TaskReport::blocked(&task, blocking)
                } else {
                    TaskReport::aborted(&task)
                };
                self.bus.publish(AgentEvent::TaskFailed {
                    execution_id,
                    task_id: report.task_id.clone(),
                    status: report.status.to_string(),
                    error: report.error.clone().unwrap_or_default(),
                });
                reports.insert(id.clone(), report);
            }
        }

        order
            .iter()
            .filter_map(|id| reports.remove(id))
            .collect()
    }

    fn block_dependents(
        &self,
        execution_id: Uuid,
        failed_id: &str,
        pending: &mut HashMap<String, Task>,
        reports: &mut HashMap<String, TaskReport>,
    ) {
        let mut frontier = vec![failed_id.to_string()];
        while let Some(blocking) = frontier.pop() {
            let blocked_ids: Vec<String> = pending
                .values()
                .filter(|t| t.dependencies.contains(&blocking))
                .map(|t| t.id.clone())
                .collect();

            for id in blocked_ids {
                if let Some(task) = pending.remove(&id) {
                    info!(task_id = %id, blocking = %blocking, "Task blocked by failed dependency");
                    let report = TaskReport::blocked(&task, &blocking);
                    self.bus.publish(AgentEvent::TaskFailed {
                        execution_id,
                        task_id: id.clone(),
                        status: TaskStatus::Blocked.to_string(),
                        error: report.error.clone().unwrap_or_default(),
                    });
                    reports.insert(id.clone(), report);
                    frontier.push(id);
                }
            }
        }
    }
}
