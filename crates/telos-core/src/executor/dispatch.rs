//! Per-task execution and the tool dispatch contract
//!
//! Inside a task, tool calls run sequentially. Each dispatch validates
//! arguments against the declared schema, consults the approval gate for
//! side-effecting tools, races the handler against the task timeout and the
//! cancellation token, and records side effects into the execution context.

use super::recovery::CallFailure;
use super::synthesis;
use super::{Executor, TaskReport};
use crate::approval::ApprovalRequest;
use crate::context::ExecutionContext;
use crate::coordination::{AgentRole, CoordinationMessage, MessageKind};
use crate::events::AgentEvent;
use crate::plan::{PlannedCall, Task, TaskStatus};
use crate::planner::heuristics::{extract_paths, looks_like_write};
use std::sync::Arc;
use std::time::Instant;
use telos_tools::{classify_message, FailureClass, PriorOutputs, Tool, ToolOutcome, ToolSpec};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// A non-success end of a call attempt
pub(super) enum AttemptEnd {
    /// The task's cancellation token fired
    Cancelled,
    /// The call failed with a classified error
    Failed(CallFailure),
}

/// Result of one dispatched call: outcome plus whether recovery produced it
pub(super) type CallResult = Result<(ToolOutcome, bool), AttemptEnd>;

impl Executor {
    /// Run one task to a terminal status
    pub(super) async fn run_task(
        &self,
        execution_id: Uuid,
        mut task: Task,
        ctx: Arc<ExecutionContext>,
        prior: PriorOutputs,
        cancel: CancellationToken,
    ) -> TaskReport {
        let started = Instant::now();
        task.transition(TaskStatus::Running);

        self.bus.publish(AgentEvent::TaskStarted {
            execution_id,
            task_id: task.id.clone(),
            description: task.description.clone(),
        });

        // A zero timeout means the task is out of budget before it begins:
        // it times out without dispatching anything.
        if task.timeout.is_zero() {
            task.transition(TaskStatus::TimedOut);
            self.bus.publish(AgentEvent::TaskFailed {
                execution_id,
                task_id: task.id.clone(),
                status: TaskStatus::TimedOut.to_string(),
                error: "task timeout is zero".to_string(),
            });
            return TaskReport {
                task_id: task.id,
                description: task.description,
                status: TaskStatus::TimedOut,
                output: None,
                error: Some("task timeout is zero".to_string()),
                error_class: Some(FailureClass::Timeout),
                attempts: 0,
                duration_ms: 0,
                tools_used: Vec::new(),
                recovered: false,
            };
        }

        let mut tools_used = Vec::new();
        let mut attempts = 0_u32;

        loop {
            attempts += 1;
            let attempt = self
                .run_calls(execution_id, &task, &ctx, &prior, &cancel, &mut tools_used)
                .await;

            match attempt {
                Ok((output, recovered)) => {
                    task.result = Some(output.clone());
                    task.transition(TaskStatus::Succeeded);
                    let duration_ms = started.elapsed().as_millis() as u64;
                    info!(task_id = %task.id, attempts, duration_ms, "Task succeeded");
                    self.bus.publish(AgentEvent::TaskCompleted {
                        execution_id,
                        task_id: task.id.clone(),
                        duration_ms,
                    });
                    return TaskReport {
                        task_id: task.id,
                        description: task.description,
                        status: TaskStatus::Succeeded,
                        output: Some(output),
                        error: None,
                        error_class: None,
                        attempts,
                        duration_ms,
                        tools_used,
                        recovered,
                    };
                }
                Err(AttemptEnd::Cancelled) => {
                    let forced = self.forced_timeouts.contains(&task.id);
                    let status = if forced {
                        TaskStatus::TimedOut
                    } else {
                        TaskStatus::Aborted
                    };
                    task.transition(status);
                    let error = if forced {
                        "force-cancelled after exceeding time budget".to_string()
                    } else {
                        "aborted".to_string()
                    };
                    warn!(task_id = %task.id, status = %status, "Task cancelled");
                    self.bus.publish(AgentEvent::TaskFailed {
                        execution_id,
                        task_id: task.id.clone(),
                        status: status.to_string(),
                        error: error.clone(),
                    });
                    return TaskReport {
                        task_id: task.id,
                        description: task.description,
                        status,
                        output: None,
                        error: Some(error),
                        error_class: forced.then_some(FailureClass::Timeout),
                        attempts,
                        duration_ms: started.elapsed().as_millis() as u64,
                        tools_used,
                        recovered: false,
                    };
                }
                Err(AttemptEnd::Failed(failure)) => {
                    let retry_allowed = failure.class.is_retryable()
                        && !failure.no_retry
                        && attempts < task.max_attempts;
                    if retry_allowed {
                        warn!(
                            task_id = %task.id,
                            class = %failure.class,
                            attempt = attempts,
                            "Task attempt failed, retrying"
                        );
                        task.attempt = attempts;
                        task.transition(TaskStatus::Retrying);
                        task.transition(TaskStatus::Running);
                        continue;
                    }

                    let status = if failure.class == FailureClass::Timeout {
                        TaskStatus::TimedOut
                    } else {
                        TaskStatus::Failed
                    };
                    task.error = Some(failure.message.clone());
                    task.transition(status);
                    warn!(
                        task_id = %task.id,
                        class = %failure.class,
                        error = %failure.message,
                        "Task terminally failed"
                    );
                    self.bus.publish(AgentEvent::TaskFailed {
                        execution_id,
                        task_id: task.id.clone(),
                        status: status.to_string(),
                        error: failure.message.clone(),
                    });
                    return TaskReport {
                        task_id: task.id,
                        description: task.description,
                        status,
                        output: None,
                        error: Some(failure.message),
                        error_class: Some(failure.class),
                        attempts,
                        duration_ms: started.elapsed().as_millis() as u64,
                        tools_used,
                        recovered: false,
                    };
                }
            }
        }
    }

    /// Run the task's calls sequentially; the last call's output is the
    /// task's output.
    async fn run_calls(
        &self,
        execution_id: Uuid,
        task: &Task,
        ctx: &Arc<ExecutionContext>,
        prior: &PriorOutputs,
        cancel: &CancellationToken,
        tools_used: &mut Vec<String>,
    ) -> Result<(serde_json::Value, bool), AttemptEnd> {
        let mut last_output = serde_json::Value::Null;
        let mut any_recovered = false;

        for call in &task.tool_calls {
            let (outcome, recovered) = self
                .dispatch_call(execution_id, task, call, ctx, prior, cancel)
                .await?;
            tools_used.push(call.tool_name.clone());
            any_recovered |= recovered;
            last_output = outcome.output;
        }

        Ok((last_output, any_recovered))
    }

    /// Dispatch one tool call with validation, approval, timeout, and
    /// failure recovery.
    pub(super) async fn dispatch_call(
        &self,
        execution_id: Uuid,
        task: &Task,
        call: &PlannedCall,
        ctx: &Arc<ExecutionContext>,
        prior: &PriorOutputs,
        cancel: &CancellationToken,
    ) -> CallResult {
        // Unknown tool names are rejected at dispatch, never run
        let spec = match self.registry.spec(&call.tool_name) {
            Some(spec) => spec.clone(),
            None => {
                return Err(AttemptEnd::Failed(CallFailure::terminal(
                    FailureClass::UnknownTool,
                    format!("unknown tool: {}", call.tool_name),
                )));
            }
        };

        // Approval gate for side-effecting tools
        if self.approval_mode.requires_gate(&spec.capabilities) {
            if let Some(gate) = &self.approval {
                let action_type = if spec.capabilities.executes_shell {
                    "shell"
                } else if spec.capabilities.mutates_vcs {
                    "vcs"
                } else {
                    "file_write"
                };
                let request = ApprovalRequest::new(
                    execution_id,
                    action_type,
                    &task.description,
                    spec.capabilities.risk(),
                    serde_json::json!({"tool": call.tool_name, "arguments": call.arguments}),
                );

                let decision = tokio::select! {
                    decision = gate.request(request) => decision,
                    () = cancel.cancelled() => return Err(AttemptEnd::Cancelled),
                };

                if !decision.approved {
                    let reason = decision
                        .reason
                        .unwrap_or_else(|| "approval denied".to_string());
                    info!(task_id = %task.id, tool = %call.tool_name, "Approval denied");
                    // A human said no; recovery must not route around that.
                    return Err(AttemptEnd::Failed(CallFailure::terminal(
                        FailureClass::PermissionDenied,
                        format!("approval denied: {reason}"),
                    )));
                }
            }
        }

        // Content synthesis for dependent file writes: enrich the content
        // argument from prior outputs. The target path and the call set are
        // never changed.
        let mut arguments = call.arguments.clone();
        if !prior.is_empty() && synthesis::is_file_write(&spec, &arguments) {
            arguments = synthesis::enrich_content(
                arguments,
                &task.description,
                prior,
                self.client.as_deref(),
            )
            .await;
        }

        match self
            .invoke_validated(execution_id, task, &call.tool_name, arguments.clone(), ctx, prior, cancel)
            .await
        {
            Ok(outcome) => Ok((outcome, false)),
            Err(AttemptEnd::Failed(failure)) if !failure.no_retry => {
                self.try_recover(execution_id, task, call, arguments, failure, ctx, prior, cancel)
                    .await
            }
            Err(end) => Err(end),
        }
    }

    /// Validate arguments, invoke the handler under the task timeout, and
    /// record events and side-effect ledger entries.
    pub(super) async fn invoke_validated(
        &self,
        execution_id: Uuid,
        task: &Task,
        tool_name: &str,
        arguments: serde_json::Value,
        ctx: &Arc<ExecutionContext>,
        prior: &PriorOutputs,
        cancel: &CancellationToken,
    ) -> Result<ToolOutcome, AttemptEnd> {
        let tool = match self.registry.lookup(tool_name) {
            Ok(tool) => tool,
            Err(e) => {
                return Err(AttemptEnd::Failed(CallFailure::terminal(
                    FailureClass::UnknownTool,
                    e.to_string(),
                )));
            }
        };

        if let Err(e) = telos_tools::validate_args(tool.spec(), &arguments) {
            return Err(AttemptEnd::Failed(CallFailure::new(
                FailureClass::BadArguments,
                e.to_string(),
            )));
        }

        self.bus.publish(AgentEvent::ToolExecute {
            execution_id,
            task_id: task.id.clone(),
            tool_name: tool_name.to_string(),
        });
        debug!(task_id = %task.id, tool = %tool_name, "Dispatching tool");

        let started = Instant::now();
        let result = tokio::select! {
            () = cancel.cancelled() => {
                self.publish_tool_result(execution_id, task, tool_name, false, started.elapsed().as_millis() as u64);
                return Err(AttemptEnd::Cancelled);
            }
            () = tokio::time::sleep(task.timeout) => {
                let duration_ms = started.elapsed().as_millis() as u64;
                self.publish_tool_result(execution_id, task, tool_name, false, duration_ms);
                warn!(task_id = %task.id, tool = %tool_name, "Tool call timed out");
                return Err(AttemptEnd::Failed(CallFailure::new(
                    FailureClass::Timeout,
                    format!("timeout after {duration_ms}ms"),
                )));
            }
            result = tool.execute(arguments.clone(), cancel.child_token(), prior) => result,
        };
        let duration_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(outcome) if outcome.success => {
                record_side_effects(ctx, tool.spec(), &arguments);
                self.publish_tool_result(execution_id, task, tool_name, true, duration_ms);
                Ok(outcome)
            }
            Ok(outcome) => {
                // Soft failure: the tool ran but reported failure text
                self.publish_tool_result(execution_id, task, tool_name, false, duration_ms);
                let message = outcome
                    .error
                    .unwrap_or_else(|| "tool reported failure".to_string());
                Err(AttemptEnd::Failed(CallFailure::new(
                    classify_message(&message),
                    message,
                )))
            }
            Err(telos_tools::Error::Cancelled) => {
                self.publish_tool_result(execution_id, task, tool_name, false, duration_ms);
                Err(AttemptEnd::Cancelled)
            }
            Err(e) => {
                self.publish_tool_result(execution_id, task, tool_name, false, duration_ms);
                let class = FailureClass::from(&e);
                Err(AttemptEnd::Failed(CallFailure::new(class, e.to_string())))
            }
        }
    }

    fn publish_tool_result(
        &self,
        execution_id: Uuid,
        task: &Task,
        tool_name: &str,
        success: bool,
        duration_ms: u64,
    ) {
        self.bus.publish(AgentEvent::ToolResult {
            execution_id,
            task_id: task.id.clone(),
            tool_name: tool_name.to_string(),
            success,
            duration_ms,
        });
    }

    /// Record a coordination message and mirror it onto the event bus
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
}

/// Append side effects of a successful call to the run's ledgers
fn record_side_effects(ctx: &ExecutionContext, spec: &ToolSpec, arguments: &serde_json::Value) {
    if spec.capabilities.writes_fs && looks_like_write(arguments) {
        for path in extract_paths(arguments) {
            ctx.note_file_created(path);
        }
    }
    if spec.capabilities.executes_shell {
        if let Some(command) = arguments.get("command").and_then(|v| v.as_str()) {
            ctx.note_command(command);
        }
    }
    if spec.capabilities.accesses_network {
        let query = arguments
            .get("query")
            .or_else(|| arguments.get("url"))
            .and_then(|v| v.as_str());
        if let Some(query) = query {
            ctx.note_web_query(query);
        }
    }
}
