//! Failure-class-driven recovery
//!
//! Each failure class maps to one strategy; strategies invoke tools through
//! `invoke_validated`, which never recurses back into recovery, so one
//! failing call runs at most one strategy per attempt.

use super::dispatch::{AttemptEnd, CallResult};
use super::Executor;
use crate::context::ExecutionContext;
use crate::coordination::{AgentRole, MessageKind};
use crate::plan::{PlannedCall, Task};
use crate::planner::heuristics::{extract_paths, replace_path, split_connectives};
use std::sync::Arc;
use telos_tools::{FailureClass, ParamKind, PriorOutputs, RecoveryStrategy, ToolOutcome};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// A classified call failure
#[derive(Debug, Clone)]
pub(super) struct CallFailure {
    /// Failure class
    pub class: FailureClass,
    /// Error text
    pub message: String,
    /// When set, neither recovery nor retry may run (approval denials,
    /// unknown tools)
    pub no_retry: bool,
}

impl CallFailure {
    pub(super) fn new(class: FailureClass, message: impl Into<String>) -> Self {
        Self {
            class,
            message: message.into(),
            no_retry: false,
        }
    }

    pub(super) fn terminal(class: FailureClass, message: impl Into<String>) -> Self {
        Self {
            class,
            message: message.into(),
            no_retry: true,
        }
    }
}

impl Executor {
    /// Apply the recovery strategy for a failed call.
    ///
    /// On success the returned result is flagged `recovered = true`; when no
    /// strategy applies or recovery also fails, the original failure comes
    /// back unchanged.
    #[allow(clippy::too_many_arguments)]
    pub(super) async fn try_recover(
        &self,
        execution_id: Uuid,
        task: &Task,
        call: &PlannedCall,
        arguments: serde_json::Value,
        failure: CallFailure,
        ctx: &Arc<ExecutionContext>,
        prior: &PriorOutputs,
        cancel: &CancellationToken,
    ) -> CallResult {
        let strategy = failure.class.strategy();
        debug!(
            task_id = %task.id,
            class = %failure.class,
            strategy = ?strategy,
            "Attempting recovery"
        );

        let recovered = match strategy {
            RecoveryStrategy::PathVariants => {
                self.recover_path_variants(execution_id, task, call, &arguments, ctx, prior, cancel)
                    .await
            }
            RecoveryStrategy::ResolveWorkingDir => {
                self.recover_resolve_working_dir(
                    execution_id,
                    task,
                    call,
                    &arguments,
                    ctx,
                    prior,
                    cancel,
                )
                .await
            }
            RecoveryStrategy::DecomposeSteps => {
                self.recover_decompose(execution_id, task, call, &arguments, ctx, prior, cancel)
                    .await
            }
            RecoveryStrategy::ResynthesizeArguments => {
                self.recover_resynthesize(
                    execution_id,
                    task,
                    call,
                    &failure.message,
                    ctx,
                    prior,
                    cancel,
                )
                .await
            }
            RecoveryStrategy::ReadOnlyFallback => {
                self.recover_read_only(execution_id, task, call, &arguments, ctx, prior, cancel)
                    .await
            }
            RecoveryStrategy::RetryOnce => {
                match self
                    .invoke_validated(
                        execution_id,
                        task,
                        &call.tool_name,
                        arguments.clone(),
                        ctx,
                        prior,
                        cancel,
                    )
                    .await
                {
                    Ok(outcome) => Some(outcome),
                    Err(AttemptEnd::Cancelled) => return Err(AttemptEnd::Cancelled),
                    Err(_) => None,
                }
            }
            RecoveryStrategy::SyntheticResult => {
                info!(task_id = %task.id, "Producing synthetic result for unclassified failure");
                Some(ToolOutcome::success(serde_json::json!({
                    "recovered": true,
                    "synthetic": true,
                    "note": "best-effort result produced after an unrecoverable tool error",
                    "source_error": failure.message,
                })))
            }
            RecoveryStrategy::Fail => None,
        };

        match recovered {
            Some(outcome) => {
                info!(task_id = %task.id, class = %failure.class, "Recovery succeeded");
                Ok((outcome, true))
            }
            None => {
                warn!(task_id = %task.id, class = %failure.class, "Recovery failed");
                Err(AttemptEnd::Failed(failure))
            }
        }
    }

    /// NotFound: try canonical path variants under the working directory,
    /// then fall back to a related search tool.
    #[allow(clippy::too_many_arguments)]
    async fn recover_path_variants(
        &self,
        execution_id: Uuid,
        task: &Task,
        call: &PlannedCall,
        arguments: &serde_json::Value,
        ctx: &Arc<ExecutionContext>,
        prior: &PriorOutputs,
        cancel: &CancellationToken,
    ) -> Option<ToolOutcome> {
        for path in extract_paths(arguments) {
            let file_name = std::path::Path::new(&path)
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.clone());

            let mut candidates = vec![ctx.working_dir().join(&path)];
            if file_name != path {
                candidates.push(ctx.working_dir().join(&file_name));
            }

            for candidate in candidates {
                let candidate = candidate.to_string_lossy().to_string();
                if candidate == path {
                    continue;
                }
                let retry_args = replace_path(arguments, &path, &candidate);
                match self
                    .invoke_validated(
                        execution_id,
                        task,
                        &call.tool_name,
                        retry_args,
                        ctx,
                        prior,
                        cancel,
                    )
                    .await
                {
                    Ok(outcome) => {
                        debug!(task_id = %task.id, candidate = %candidate, "Path variant worked");
                        return Some(outcome);
                    }
                    Err(AttemptEnd::Cancelled) => return None,
                    Err(_) => {}
                }
            }

            // Fall back to a related read-only tool if one is registered
            for (fallback, param) in [("search", "query"), ("grep", "pattern")] {
                if !self.registry.has(fallback) {
                    continue;
                }
                let fallback_args = serde_json::json!({ param: file_name.clone() });
                if let Some(spec) = self.registry.spec(fallback) {
                    if telos_tools::validate_args(spec, &fallback_args).is_err() {
                        continue;
                    }
                }
                if let Ok(outcome) = self
                    .invoke_validated(
                        execution_id,
                        task,
                        fallback,
                        fallback_args,
                        ctx,
                        prior,
                        cancel,
                    )
                    .await
                {
                    info!(task_id = %task.id, fallback = %fallback, "Related-tool fallback worked");
                    return Some(outcome);
                }
            }
        }
        None
    }

    /// BadPath: resolve against the working directory and retry once
    #[allow(clippy::too_many_arguments)]
    async fn recover_resolve_working_dir(
        &self,
        execution_id: Uuid,
        task: &Task,
        call: &PlannedCall,
        arguments: &serde_json::Value,
        ctx: &Arc<ExecutionContext>,
        prior: &PriorOutputs,
        cancel: &CancellationToken,
    ) -> Option<ToolOutcome> {
        let mut retry_args = arguments.clone();
        let mut changed = false;
        for path in extract_paths(arguments) {
            if !std::path::Path::new(&path).is_absolute() {
                let resolved = ctx.working_dir().join(&path).to_string_lossy().to_string();
                retry_args = replace_path(&retry_args, &path, &resolved);
                changed = true;
            }
        }
        if !changed {
            return None;
        }

        match self
            .invoke_validated(
                execution_id,
                task,
                &call.tool_name,
                retry_args,
                ctx,
                prior,
                cancel,
            )
            .await
        {
            Ok(outcome) => Some(outcome),
            Err(_) => None,
        }
    }

    /// Timeout: decompose the work at natural connectives and run the
    /// pieces sequentially, each under the full task timeout.
    #[allow(clippy::too_many_arguments)]
    async fn recover_decompose(
        &self,
        execution_id: Uuid,
        task: &Task,
        call: &PlannedCall,
        arguments: &serde_json::Value,
        ctx: &Arc<ExecutionContext>,
        prior: &PriorOutputs,
        cancel: &CancellationToken,
    ) -> Option<ToolOutcome> {
        // Prefer splitting a compound command; fall back to splitting a
        // compound query along the task description's connectives.
        let (key, pieces) = if let Some(command) =
            arguments.get("command").and_then(|v| v.as_str())
        {
            if command.contains("&&") {
                (
                    "command",
                    command
                        .split("&&")
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect::<Vec<_>>(),
                )
            } else {
                ("command", split_connectives(command))
            }
        } else if let Some(query) = arguments.get("query").and_then(|v| v.as_str()) {
            ("query", split_connectives(query))
        } else {
            ("", Vec::new())
        };

        if pieces.len() < 2 {
            debug!(task_id = %task.id, "Nothing to decompose");
            return None;
        }

        info!(task_id = %task.id, pieces = pieces.len(), "Decomposing timed-out call");
        let mut step_outputs = Vec::with_capacity(pieces.len());
        for piece in pieces {
            let mut retry_args = arguments.clone();
            if let Some(object) = retry_args.as_object_mut() {
                object.insert(key.to_string(), serde_json::Value::String(piece));
            }
            match self
                .invoke_validated(
                    execution_id,
                    task,
                    &call.tool_name,
                    retry_args,
                    ctx,
                    prior,
                    cancel,
                )
                .await
            {
                Ok(outcome) => step_outputs.push(outcome.output),
                Err(_) => return None,
            }
        }

        Some(ToolOutcome::success(serde_json::json!({
            "decomposed": true,
            "steps": step_outputs,
        })))
    }

    /// BadArguments: ask the planner to re-synthesize arguments
    #[allow(clippy::too_many_arguments)]
    async fn recover_resynthesize(
        &self,
        execution_id: Uuid,
        task: &Task,
        call: &PlannedCall,
        error: &str,
        ctx: &Arc<ExecutionContext>,
        prior: &PriorOutputs,
        cancel: &CancellationToken,
    ) -> Option<ToolOutcome> {
        let planner = self.planner.as_ref()?;

        self.coordinate(
            execution_id,
            AgentRole::Executor,
            AgentRole::Planner,
            MessageKind::Question,
            format!(
                "arguments for '{}' were rejected ({error}); please re-synthesize",
                call.tool_name
            ),
        );

        let new_args = match planner
            .resynthesize_arguments(&task.description, call, error)
            .await
        {
            Ok(args) => args,
            Err(e) => {
                warn!(task_id = %task.id, error = %e, "Argument re-synthesis failed");
                self.coordinate(
                    execution_id,
                    AgentRole::Planner,
                    AgentRole::Executor,
                    MessageKind::Error,
                    format!("re-synthesis failed: {e}"),
                );
                return None;
            }
        };

        self.coordinate(
            execution_id,
            AgentRole::Planner,
            AgentRole::Executor,
            MessageKind::Response,
            format!("re-synthesized arguments for '{}'", call.tool_name),
        );

        match self
            .invoke_validated(
                execution_id,
                task,
                &call.tool_name,
                new_args,
                ctx,
                prior,
                cancel,
            )
            .await
        {
            Ok(outcome) => Some(outcome),
            Err(_) => None,
        }
    }

    /// PermissionDenied: switch to the tool's read-only action when its
    /// schema has one; otherwise report.
    #[allow(clippy::too_many_arguments)]
    async fn recover_read_only(
        &self,
        execution_id: Uuid,
        task: &Task,
        call: &PlannedCall,
        arguments: &serde_json::Value,
        ctx: &Arc<ExecutionContext>,
        prior: &PriorOutputs,
        cancel: &CancellationToken,
    ) -> Option<ToolOutcome> {
        let spec = self.registry.spec(&call.tool_name)?;
        let action = spec.param("action")?;
        let has_read = matches!(&action.kind, ParamKind::Enum(options) if options.iter().any(|o| o == "read"));
        if !has_read {
            return None;
        }
        let current = arguments.get("action").and_then(|v| v.as_str())?;
        if current == "read" {
            return None;
        }

        let mut retry_args = arguments.clone();
        if let Some(object) = retry_args.as_object_mut() {
            object.insert(
                "action".to_string(),
                serde_json::Value::String("read".to_string()),
            );
            object.remove("content");
        }

        info!(task_id = %task.id, tool = %call.tool_name, "Retrying with read-only action");
        match self
            .invoke_validated(
                execution_id,
                task,
                &call.tool_name,
                retry_args,
                ctx,
                prior,
                cancel,
            )
            .await
        {
            Ok(outcome) => Some(outcome),
            Err(_) => None,
        }
    }
}
