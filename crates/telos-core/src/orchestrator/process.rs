//! The `execute` lifecycle

use super::core::Orchestrator;
use super::types::{ExecutionResult, RunState};
use crate::context::ExecutionContext;
use crate::coordination::{AgentRole, CoordinationMessage, MessageKind};
use crate::events::AgentEvent;
use crate::executor::TaskReport;
use crate::plan::TaskStatus;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use telos_llm::{ChatRequest, LlmClient, Message};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

impl Orchestrator {
    /// Execute one user request end to end.
    ///
    /// Never panics and never returns early without an `ExecutionResult`:
    /// planner failures, partial task failures, and aborts all come back as
    /// results with `success = false`.
    #[instrument(skip(self, prompt), fields(prompt_len = prompt.len()))]
    pub async fn execute(&self, prompt: &str) -> ExecutionResult {
        let execution_id = Uuid::new_v4();
        *self
            .current_execution
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = execution_id;

        // Per-run scratch resets at the start of each orchestration
        self.coordination.clear();

        self.bus.publish(AgentEvent::OrchestrationStarted {
            execution_id,
            prompt: prompt.to_string(),
        });
        info!(execution_id = %execution_id, "Orchestration started");

        let trimmed = prompt.trim();
        if trimmed.starts_with('/') {
            let result = self.handle_slash_command(execution_id, trimmed).await;
            self.finish(execution_id, result.success);
            return result;
        }

        self.wait_if_paused().await;
        self.set_state(RunState::Planning);
        self.bus.publish(AgentEvent::StatusUpdate {
            execution_id,
            phase: "planning".to_string(),
            detail: format!("planning request ({} chars)", trimmed.len()),
        });

        let cancel = CancellationToken::new();
        self.active.insert(execution_id, cancel.clone());

        // ── Planning ─────────────────────────────────────────────────
        self.coordinate(
            execution_id,
            AgentRole::Orchestrator,
            AgentRole::Planner,
            MessageKind::Question,
            "plan this request",
        );
        self.bus
            .publish(AgentEvent::PlanningStarted { execution_id });

        let plan = match self.planner.create_plan(trimmed).await {
            Ok(plan) => plan,
            Err(e) => {
                error!(execution_id = %execution_id, error = %e, "Planning failed");
                self.coordinate(
                    execution_id,
                    AgentRole::Planner,
                    AgentRole::Orchestrator,
                    MessageKind::Error,
                    e.to_string(),
                );
                self.bus.publish(AgentEvent::OrchestrationFailed {
                    execution_id,
                    error: e.to_string(),
                });
                self.active.remove(&execution_id);
                self.finish(execution_id, false);
                return ExecutionResult::failed(
                    execution_id,
                    format!("I could not plan that request: {e}"),
                    Vec::new(),
                    e.to_string(),
                );
            }
        };

        let plan_kind = if plan.is_conversation() {
            "conversation"
        } else {
            "tasks"
        };
        self.bus.publish(AgentEvent::PlanningCompleted {
            execution_id,
            plan_id: plan.id,
            plan_kind: plan_kind.to_string(),
            task_count: plan.tasks.len(),
        });
        self.coordinate(
            execution_id,
            AgentRole::Planner,
            AgentRole::Orchestrator,
            MessageKind::Response,
            format!("plan ready: {} ({} task(s))", plan_kind, plan.tasks.len()),
        );

        // ── Conversation fast path ───────────────────────────────────
        if let Some(response) = plan.conversation_response() {
            let response = response.to_string();
            self.remember_turn(Some(trimmed), Some(&response)).await;
            self.active.remove(&execution_id);
            self.finish(execution_id, true);
            return ExecutionResult::ok(execution_id, response, Vec::new());
        }

        // ── Execution ────────────────────────────────────────────────
        self.wait_if_paused().await;
        self.set_state(RunState::Executing);
        self.bus.publish(AgentEvent::StatusUpdate {
            execution_id,
            phase: "executing".to_string(),
            detail: format!("{} task(s) queued", plan.tasks.len()),
        });
        self.coordinate(
            execution_id,
            AgentRole::Orchestrator,
            AgentRole::Executor,
            MessageKind::Question,
            format!("execute plan {} ({} task(s))", plan.id, plan.tasks.len()),
        );

        let ctx = Arc::new(ExecutionContext::new(&self.config.working_dir));
        let reports = self
            .executor
            .execute_plan(execution_id, &plan, &ctx, cancel.clone())
            .await;

        let succeeded = reports.iter().filter(|r| r.succeeded()).count();
        self.coordinate(
            execution_id,
            AgentRole::Executor,
            AgentRole::Orchestrator,
            MessageKind::Response,
            format!("{succeeded}/{} task(s) succeeded", reports.len()),
        );

        let tools_used: Vec<String> = reports
            .iter()
            .flat_map(|r| r.tools_used.iter().cloned())
            .collect();
        let aborted = cancel.is_cancelled()
            || reports.iter().any(|r| r.status == TaskStatus::Aborted);
        let failed: Vec<&TaskReport> = reports.iter().filter(|r| !r.succeeded()).collect();

        // ── Advisory recovery ────────────────────────────────────────
        // Open-question decision: the recovered strategy is advisory text
        // forwarded as an adjustment; the plan is never rerun.
        let advisory = if !failed.is_empty() && !aborted {
            match self.advise_recovery(&plan, &failed).await {
                Some(strategy) => {
                    self.coordinate(
                        execution_id,
                        AgentRole::Orchestrator,
                        AgentRole::Executor,
                        MessageKind::Adjustment,
                        strategy.clone(),
                    );
                    Some(strategy)
                }
                None => None,
            }
        } else {
            None
        };

        // ── Response assembly ────────────────────────────────────────
        let (success, response, error) = if aborted {
            let notice = if tools_used.is_empty() {
                "Execution was cancelled before any tool ran.".to_string()
            } else {
                format!(
                    "Execution was cancelled. Tools already executed: {}.",
                    tools_used.join(", ")
                )
            };
            (false, notice, Some("aborted".to_string()))
        } else if failed.is_empty() {
            let response = if ctx.has_file_effects() {
                "Done.".to_string()
            } else {
                self.respond_from_outputs(trimmed, &reports).await
            };
            (true, response, None)
        } else {
            let response = mixed_outcome_response(&reports, advisory.as_deref());
            let error = crate::error::OrchestrationError {
                failed_tasks: failed.iter().map(|r| r.task_id.clone()).collect(),
                partial: succeeded > 0,
            };
            (false, response, Some(error.to_string()))
        };

        self.remember_execution(trimmed, &reports, &response).await;
        self.active.remove(&execution_id);

        if success {
            info!(execution_id = %execution_id, tools = tools_used.len(), "Orchestration completed");
        } else {
            warn!(execution_id = %execution_id, error = ?error, "Orchestration finished with failures");
        }
        self.finish(execution_id, success);

        ExecutionResult {
            execution_id,
            success,
            response,
            tools_used,
            error,
        }
    }

    /// Compose the final answer from task outputs via the LLM, with a plain
    /// summary as the fallback.
    async fn respond_from_outputs(&self, prompt: &str, reports: &[TaskReport]) -> String {
        let mut context = String::new();
        for report in reports {
            let output = report
                .output
                .as_ref()
                .map(|o| {
                    let text = o.to_string();
                    text.chars().take(500).collect::<String>()
                })
                .unwrap_or_default();
            context.push_str(&format!("- {}: {}\n", report.description, output));
        }

        let request = ChatRequest::new(vec![
            Message::system(format!(
                "Answer the user's request using only these task results. Be concise.\n\n{context}"
            )),
            Message::user(prompt.to_string()),
        ]);

        match tokio::time::timeout(self.config.chat_timeout, self.client.chat(request)).await {
            Ok(Ok(response)) if !response.content.trim().is_empty() => response.content,
            Ok(Ok(_)) | Err(_) => fallback_summary(reports),
            Ok(Err(e)) => {
                warn!(error = %e, "Response composition failed, using summary");
                fallback_summary(reports)
            }
        }
    }

    pub(super) fn coordinate(
        &self,
        execution_id: Uuid,
        from: AgentRole,
        to: AgentRole,
        kind: MessageKind,
        content: impl Into<String>,
    ) {
        let message = CoordinationMessage::new(from, to, kind, content);
        self.coordination.push(message.clone());
        self.bus
            .publish(AgentEvent::Coordination { execution_id, message });
    }

    fn finish(&self, execution_id: Uuid, success: bool) {
        self.set_state(RunState::Idle);
        self.completed_requests.fetch_add(1, Ordering::SeqCst);
        self.bus.publish(AgentEvent::OrchestrationCompleted {
            execution_id,
            success,
        });
    }

}

/// Mixed-outcome response: which sub-goals succeeded and which failed,
/// with each failed task's description and error class.
fn mixed_outcome_response(reports: &[TaskReport], advisory: Option<&str>) -> String {
    let mut out = String::new();

    let succeeded: Vec<&TaskReport> = reports.iter().filter(|r| r.succeeded()).collect();
    let failed: Vec<&TaskReport> = reports.iter().filter(|r| !r.succeeded()).collect();

    if succeeded.is_empty() {
        let class = failed
            .first()
            .and_then(|r| r.error_class)
            .map(|c| c.to_string())
            .unwrap_or_else(|| "failure".to_string());
        out.push_str(&format!("The request failed ({class}).\n"));
    } else {
        out.push_str("Partial result.\n\nCompleted:\n");
        for report in &succeeded {
            out.push_str(&format!("- {}\n", report.description));
        }
    }

    out.push_str("\nFailed:\n");
    for report in &failed {
        let class = report
            .error_class
            .map(|c| format!(" [{c}]"))
            .unwrap_or_default();
        let reason = report.error.as_deref().unwrap_or("unknown error");
        out.push_str(&format!("- {}{}: {}\n", report.description, class, reason));
    }

    if let Some(advisory) = advisory {
        out.push_str(&format!("\nSuggested next step: {advisory}\n"));
    }

    out
}

fn fallback_summary(reports: &[TaskReport]) -> String {
    let mut out = String::from("Task results:\n");
    for report in reports {
        let output = report
            .output
            .as_ref()
            .map(|o| o.to_string().chars().take(200).collect::<String>())
            .unwrap_or_else(|| "(no output)".to_string());
        out.push_str(&format!("- {}: {}\n", report.description, output));
    }
    out
}
