//! Slash commands handled directly by the orchestrator
//!
//! Inputs prefixed with `/` never reach the planner.

use super::core::Orchestrator;
use super::types::ExecutionResult;
use std::sync::atomic::Ordering;
use tracing::info;
use uuid::Uuid;

const HELP_TEXT: &str = "Available commands:\n\
    /help   - show this help\n\
    /status - current state, active tasks, conversation size\n\
    /tools  - list registered tools\n\
    /clear  - truncate the conversation history\n\
    /quit   - exit (alias: /exit)";

impl Orchestrator {
    /// Handle a `/command` input
    pub(super) async fn handle_slash_command(
        &self,
        execution_id: Uuid,
        input: &str,
    ) -> ExecutionResult {
        let command = input.split_whitespace().next().unwrap_or(input);
        info!(command = %command, "Slash command");

        let response = match command {
            "/help" => HELP_TEXT.to_string(),
            "/status" => {
                let progress = self.status().await;
                let active = if progress.active_tasks.is_empty() {
                    "none".to_string()
                } else {
                    progress.active_tasks.join(", ")
                };
                format!(
                    "state: {}\nactive tasks: {}\nconversation messages: {}\ncompleted requests: {}",
                    progress.state, active, progress.conversation_messages, progress.completed_requests
                )
            }
            "/tools" => {
                let mut out = String::from("Registered tools:\n");
                for spec in self.registry.enumerate() {
                    out.push_str(&format!(
                        "- {} ({}): {}\n",
                        spec.name,
                        spec.capabilities.risk(),
                        spec.description
                    ));
                }
                out
            }
            "/clear" => {
                self.clear_conversation().await;
                "Conversation cleared.".to_string()
            }
            "/quit" | "/exit" => {
                self.exit_requested.store(true, Ordering::SeqCst);
                "Exiting.".to_string()
            }
            other => format!("Unknown command: {other} (try /help)"),
        };

        ExecutionResult::ok(execution_id, response, Vec::new())
    }
}
