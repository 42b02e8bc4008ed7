//! Orchestrator - the user-facing request lifecycle
//!
//! Owns the conversation, routes prompts to the planner and plans to the
//! executor, mediates coordination messages, drives advisory failure
//! recovery, and assembles the final response. All events from the trio
//! surface on one bus here, so observers subscribe to a single source.
//!
//! # Module Structure
//!
//! - `types`: `ExecutionResult`, `Progress`, `RunState`
//! - `core`: the `Orchestrator` struct and its builders
//! - `process`: the `execute` lifecycle
//! - `slash`: slash-command handling
//! - `recovery`: advisory post-failure strategy

mod core;
mod process;
mod recovery;
mod slash;
mod types;

#[cfg(test)]
mod tests;

pub use self::core::{Orchestrator, OrchestratorConfig};
pub use types::{ExecutionResult, Progress, RunState};
