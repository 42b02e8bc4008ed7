//! Telos Core - Agent Orchestration Engine
//!
//! This crate provides the core of the Telos autonomous agent:
//! - Planner: natural-language requests to dependency-ordered task plans
//! - Executor: bounded-concurrency plan execution with adaptive recovery
//! - Orchestrator: the user-facing request lifecycle tying the two together
//! - Events: the typed event bus observers subscribe to
//! - Approval: the gate consulted before side-effecting tool dispatch
//! - Context & Conversation: per-run side-effect ledger and bounded history

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod approval;
pub mod config;
pub mod context;
pub mod conversation;
pub mod coordination;
pub mod error;
pub mod events;
pub mod executor;
pub mod orchestrator;
pub mod plan;
pub mod planner;

pub use approval::{ApprovalDecision, ApprovalGate, ApprovalManager, ApprovalRequest, SharedApprovalGate};
pub use config::{AgentConfig, ApprovalMode};
pub use context::ExecutionContext;
pub use conversation::Conversation;
pub use coordination::{AgentRole, CoordinationLog, CoordinationMessage, MessageKind};
pub use error::{Error, OrchestrationError, PlannerError, Result};
pub use events::{AgentEvent, EventBus};
pub use executor::{Executor, ExecutorConfig, TaskReport};
pub use orchestrator::{ExecutionResult, Orchestrator, OrchestratorConfig, Progress, RunState};
pub use plan::{Complexity, Plan, PlanKind, PlannedCall, Task, TaskStatus};
pub use planner::{Planner, PlannerConfig};
