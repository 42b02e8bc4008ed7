//! Orchestrator structure and builders

use crate::approval::ApprovalManager;
use crate::config::{AgentConfig, ApprovalMode};
use crate::conversation::Conversation;
use crate::coordination::CoordinationLog;
use crate::events::{AgentEvent, EventBus};
use crate::executor::{Executor, ExecutorConfig};
use crate::planner::{Planner, PlannerConfig};
use dashmap::DashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use telos_llm::{LlmClient, TokenUsage, UsageHook};
use telos_tools::ToolRegistry;
use tokio::sync::{Mutex, Notify};
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use super::types::{Progress, RunState};

/// Configuration for the orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Approval gating mode
    pub approval_mode: ApprovalMode,
    /// Working directory for tool side effects
    pub working_dir: PathBuf,
    /// Timeout for response-composition LLM calls
    pub chat_timeout: Duration,
    /// Planner configuration
    pub planner: PlannerConfig,
    /// Executor configuration
    pub executor: ExecutorConfig,
    /// Conversation window size
    pub conversation_window: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            approval_mode: ApprovalMode::default(),
            working_dir: PathBuf::from("."),
            chat_timeout: Duration::from_secs(60),
            planner: PlannerConfig::default(),
            executor: ExecutorConfig::default(),
            conversation_window: 50,
        }
    }
}

impl OrchestratorConfig {
    /// Create a new configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive from the environment-level agent configuration
    #[must_use]
    pub fn from_agent_config(config: &AgentConfig) -> Self {
        Self {
            approval_mode: config.approval_mode,
            working_dir: config.working_dir.clone(),
            chat_timeout: config.chat_timeout,
            planner: PlannerConfig::default()
                .with_planning_timeout(config.planning_timeout)
                .with_task_max_attempts(config.max_attempts),
            executor: ExecutorConfig::default().with_max_concurrency(config.max_concurrency),
            conversation_window: 50,
        }
    }

    /// Set the approval mode
    #[must_use]
    pub fn with_approval_mode(mut self, mode: ApprovalMode) -> Self {
        self.approval_mode = mode;
        self
    }

    /// Set the working directory
    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    /// Set the planner configuration
    #[must_use]
    pub fn with_planner(mut self, planner: PlannerConfig) -> Self {
        self.planner = planner;
        self
    }

    /// Set the executor configuration
    #[must_use]
    pub fn with_executor(mut self, executor: ExecutorConfig) -> Self {
        self.executor = executor;
        self
    }
}

/// Reports token usage from the LLM client onto the event bus, tagged with
/// whatever execution is current.
pub(super) struct BusUsageHook {
    pub(super) bus: Arc<EventBus>,
    pub(super) current_execution: Arc<StdMutex<Uuid>>,
}

impl UsageHook for BusUsageHook {
    fn on_usage(&self, usage: TokenUsage) {
        let execution_id = *self
            .current_execution
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        self.bus.publish(AgentEvent::TokenUsage {
            execution_id,
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
        });
    }
}

/// Main orchestrator coordinating the planner and executor
pub struct Orchestrator {
    pub(super) planner: Arc<Planner>,
    pub(super) executor: Executor,
    pub(super) client: Arc<dyn LlmClient>,
    pub(super) registry: Arc<ToolRegistry>,
    pub(super) bus: Arc<EventBus>,
    pub(super) conversation: Mutex<Conversation>,
    pub(super) coordination: Arc<CoordinationLog>,
    pub(super) approval: Arc<ApprovalManager>,
    pub(super) active: Arc<DashMap<Uuid, CancellationToken>>,
    pub(super) current_execution: Arc<StdMutex<Uuid>>,
    pub(super) paused: Arc<AtomicBool>,
    pub(super) resume_notify: Arc<Notify>,
    pub(super) exit_requested: AtomicBool,
    pub(super) state: StdMutex<RunState>,
    pub(super) completed_requests: AtomicU64,
    pub(super) config: OrchestratorConfig,
}

impl Orchestrator {
    /// Create a new orchestrator wired to a client and a registry
    #[must_use]
    pub fn new(
        client: Arc<dyn LlmClient>,
        registry: Arc<ToolRegistry>,
        config: OrchestratorConfig,
    ) -> Self {
        let bus = Arc::new(EventBus::default());
        let coordination = Arc::new(CoordinationLog::new());
        let approval = Arc::new(
            ApprovalManager::new(config.approval_mode).with_event_bus(Arc::clone(&bus)),
        );
        let planner = Arc::new(Planner::new(
            Arc::clone(&client),
            Arc::clone(&registry),
            config.planner.clone(),
        ));
        let executor = Executor::new(
            Arc::clone(&registry),
            Arc::clone(&bus),
            config.executor.clone(),
        )
        .with_llm_client(Arc::clone(&client))
        .with_planner(Arc::clone(&planner))
        .with_approval(approval.clone(), config.approval_mode)
        .with_coordination_log(Arc::clone(&coordination));

        let current_execution = Arc::new(StdMutex::new(Uuid::nil()));
        client.set_usage_hook(Arc::new(BusUsageHook {
            bus: Arc::clone(&bus),
            current_execution: Arc::clone(&current_execution),
        }));

        Self {
            planner,
            executor,
            client,
            registry,
            bus,
            conversation: Mutex::new(Conversation::with_max_messages(config.conversation_window)),
            coordination,
            approval,
            active: Arc::new(DashMap::new()),
            current_execution,
            paused: Arc::new(AtomicBool::new(false)),
            resume_notify: Arc::new(Notify::new()),
            exit_requested: AtomicBool::new(false),
            state: StdMutex::new(RunState::Idle),
            completed_requests: AtomicU64::new(0),
            config,
        }
    }

    /// Create from the environment-level agent configuration
    #[must_use]
    pub fn from_agent_config(
        client: Arc<dyn LlmClient>,
        registry: Arc<ToolRegistry>,
        config: &AgentConfig,
    ) -> Self {
        Self::new(client, registry, OrchestratorConfig::from_agent_config(config))
    }

    /// The event bus observers subscribe to
    #[must_use]
    pub fn event_bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.bus)
    }

    /// The approval manager, for operator surfaces resolving requests
    #[must_use]
    pub fn approval_manager(&self) -> Arc<ApprovalManager> {
        Arc::clone(&self.approval)
    }

    /// The coordination messages recorded for the current/last run
    #[must_use]
    pub fn coordination_log(&self) -> Arc<CoordinationLog> {
        Arc::clone(&self.coordination)
    }

    /// Pause execution between steps
    pub fn pause(&self) {
        info!("Orchestrator paused");
        self.paused.store(true, Ordering::SeqCst);
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = RunState::Paused;
    }

    /// Resume execution
    pub fn resume(&self) {
        info!("Orchestrator resumed");
        self.paused.store(false, Ordering::SeqCst);
        self.resume_notify.notify_waiters();
    }

    /// Abort every active execution: in-flight tasks cancel, pending
    /// approvals are denied so nothing waits forever.
    pub async fn abort(&self) {
        info!("Orchestrator abort requested");
        for entry in self.active.iter() {
            entry.value().cancel();
        }
        self.executor.abort_all();
        self.approval.deny_all_pending("aborted").await;
    }

    /// Whether `/quit` or `/exit` was received
    #[must_use]
    pub fn exit_requested(&self) -> bool {
        self.exit_requested.load(Ordering::SeqCst)
    }

    /// A point-in-time status snapshot
    pub async fn status(&self) -> Progress {
        let state = *self.state.lock().unwrap_or_else(|e| e.into_inner());
        let active_tasks = self.executor.active_tasks();
        Progress {
            state,
            active_tasks,
            conversation_messages: self.conversation.lock().await.len(),
            completed_requests: self.completed_requests.load(Ordering::SeqCst),
        }
    }

    /// Truncate the conversation history
    pub async fn clear_conversation(&self) {
        self.conversation.lock().await.clear();
        self.bus.publish(AgentEvent::MemoryLayerUpdate {
            layer: "conversation".to_string(),
            retained: 0,
            dropped: 0,
        });
    }

    pub(super) fn set_state(&self, state: RunState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }

    pub(super) async fn wait_if_paused(&self) {
        // Re-check on a short timeout so a resume() racing with waiter
        // registration cannot strand the waiter.
        while self.paused.load(Ordering::SeqCst) {
            let _ = tokio::time::timeout(
                Duration::from_millis(100),
                self.resume_notify.notified(),
            )
            .await;
        }
    }

    /// Append a full execution to the conversation: the user turn, one tool
    /// turn per task that invoked tools, and the assistant turn.
    pub(super) async fn remember_execution(
        &self,
        user: &str,
        reports: &[crate::executor::TaskReport],
        assistant: &str,
    ) {
        let mut dropped = 0;
        let retained = {
            let mut conversation = self.conversation.lock().await;
            dropped += conversation.add_user(user);
            for report in reports {
                if report.tools_used.is_empty() {
                    continue;
                }
                let summary = serde_json::json!({
                    "tools": report.tools_used,
                    "status": report.status,
                    "output": report.output,
                });
                dropped += conversation.add_tool_result(&report.task_id, summary.to_string());
            }
            dropped += conversation.add_assistant(assistant);
            conversation.len()
        };
        if dropped > 0 {
            self.bus.publish(AgentEvent::MemoryLayerUpdate {
                layer: "conversation".to_string(),
                retained,
                dropped,
            });
        }
    }

    /// Append a conversation turn, emitting a memory event when the window
    /// trimmed.
    pub(super) async fn remember_turn(&self, user: Option<&str>, assistant: Option<&str>) {
        let mut conversation = self.conversation.lock().await;
        let mut dropped = 0;
        if let Some(user) = user {
            dropped += conversation.add_user(user);
        }
        if let Some(assistant) = assistant {
            dropped += conversation.add_assistant(assistant);
        }
        if dropped > 0 {
            let retained = conversation.len();
            drop(conversation);
            self.bus.publish(AgentEvent::MemoryLayerUpdate {
                layer: "conversation".to_string(),
                retained,
                dropped,
            });
        }
    }
}
