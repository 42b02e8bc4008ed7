//! Planner - natural language to dependency-ordered task plans
//!
//! The planner turns a user prompt plus a registry snapshot into either a
//! direct conversational answer or a topologically sorted task plan with
//! synthesized tool arguments. It never mutates global state and never
//! performs tool calls itself.
//!
//! # Module Structure
//!
//! - `prompt`: planning prompt and tool-manifest rendering
//! - `parse`: parsing the model's JSON plan shapes
//! - `heuristics`: timeout classes and connective splitting
//! - `deps`: heuristic dependency derivation and topological sort
//! - `complexity`: advisory complexity scoring

mod complexity;
mod deps;
pub(crate) mod heuristics;
mod parse;
mod prompt;


use crate::error::PlannerError;
use crate::plan::{Plan, PlannedCall, Task};
use parse::{PlanShape, StepShape};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use telos_llm::{ChatRequest, LlmClient, Message};
use telos_tools::{validate_args, ToolRegistry};
use tracing::{debug, instrument, warn};

/// Configuration for the planner
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Timeout for planning LLM calls
    pub planning_timeout: Duration,
    /// Upper bound on plan length
    pub max_steps: usize,
    /// Per-task attempt ceiling stamped onto materialized tasks
    pub task_max_attempts: u32,
    /// Temperature for planning calls
    pub temperature: f32,
    /// Max tokens for planning calls
    pub max_tokens: u32,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            planning_timeout: Duration::from_secs(30),
            max_steps: 8,
            task_max_attempts: 2,
            temperature: 0.2,
            max_tokens: 2048,
        }
    }
}

impl PlannerConfig {
    /// Create a new configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the planning timeout
    #[must_use]
    pub fn with_planning_timeout(mut self, timeout: Duration) -> Self {
        self.planning_timeout = timeout;
        self
    }

    /// Set the plan-length cap
    #[must_use]
    pub fn with_max_steps(mut self, max: usize) -> Self {
        self.max_steps = max.max(1);
        self
    }

    /// Set the per-task attempt ceiling
    #[must_use]
    pub fn with_task_max_attempts(mut self, max: u32) -> Self {
        self.task_max_attempts = max.max(1);
        self
    }
}

/// Planner for converting natural language into executable plans
pub struct Planner {
    client: Arc<dyn LlmClient>,
    registry: Arc<ToolRegistry>,
    config: PlannerConfig,
}

impl Planner {
    /// Create a new planner
    #[must_use]
    pub fn new(
        client: Arc<dyn LlmClient>,
        registry: Arc<ToolRegistry>,
        config: PlannerConfig,
    ) -> Self {
        Self {
            client,
            registry,
            config,
        }
    }

    /// Create with default configuration
    #[must_use]
    pub fn with_defaults(client: Arc<dyn LlmClient>, registry: Arc<ToolRegistry>) -> Self {
        Self::new(client, registry, PlannerConfig::default())
    }

    /// Get the configuration
    #[must_use]
    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Create a plan for a user prompt.
    ///
    /// # Errors
    ///
    /// Fails with `PlannerError` when the model's output cannot be parsed
    /// after one simplified retry, references unknown tools, violates a
    /// tool's schema, or yields a cyclic dependency graph.
    #[instrument(skip(self), fields(prompt_len = prompt.len()))]
    pub async fn create_plan(&self, prompt: &str) -> std::result::Result<Plan, PlannerError> {
        let trimmed = prompt.trim();
        if trimmed.is_empty() {
            // An empty prompt gets a clarification request rather than an
            // error, so interactive callers see a usable reply.
            return Ok(Plan::conversation(
                prompt,
                "I need a request to work with. What would you like me to do?",
            ));
        }

        let manifest = prompt::render_manifest(self.registry.as_ref());
        let system = prompt::planning_prompt(&manifest, self.config.max_steps);

        let request = ChatRequest::new(vec![Message::system(system), Message::user(trimmed)])
            .with_force_json(true)
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens);

        let response = self.chat_with_timeout(request).await?;

        let shape = match parse::parse_plan_shape(&response.content) {
            Ok(shape) => shape,
            Err(first_error) => {
                debug!(error = %first_error, "Plan parse failed, retrying with simplified prompt");
                let retry = ChatRequest::new(vec![
                    Message::system(prompt::simplified_prompt(&manifest)),
                    Message::user(trimmed),
                ])
                .with_force_json(true)
                .with_temperature(0.0)
                .with_max_tokens(self.config.max_tokens);

                let response = self.chat_with_timeout(retry).await?;
                parse::parse_plan_shape(&response.content).map_err(|second_error| {
                    warn!(error = %second_error, "Plan parse failed twice");
                    PlannerError::Unparseable
                })?
            }
        };

        match shape {
            PlanShape::Conversation { response } => Ok(Plan::conversation(trimmed, response)),
            PlanShape::Tasks { plan } => self.materialize(trimmed, plan),
        }
    }

    /// Re-synthesize arguments for a failing call.
    ///
    /// Used by the executor's recovery path when a tool rejected its
    /// arguments: the planner asks the model for a corrected argument object
    /// and validates it against the schema before handing it back.
    #[instrument(skip(self, call, error))]
    pub async fn resynthesize_arguments(
        &self,
        task_description: &str,
        call: &PlannedCall,
        error: &str,
    ) -> std::result::Result<serde_json::Value, PlannerError> {
        let spec = self
            .registry
            .spec(&call.tool_name)
            .ok_or_else(|| PlannerError::UnknownTool {
                tool: call.tool_name.clone(),
            })?;

        let system = prompt::resynthesis_prompt(spec, &call.arguments, error);
        let request = ChatRequest::new(vec![
            Message::system(system),
            Message::user(task_description.to_string()),
        ])
        .with_force_json(true)
        .with_temperature(0.0)
        .with_max_tokens(512);

        let response = self.chat_with_timeout(request).await?;
        let args = parse::parse_json_object(&response.content)
            .map_err(|_| PlannerError::Unparseable)?;

        validate_args(spec, &args).map_err(|e| PlannerError::BadArguments {
            tool: call.tool_name.clone(),
            reason: e.to_string(),
        })?;

        Ok(args)
    }

    async fn chat_with_timeout(
        &self,
        request: ChatRequest,
    ) -> std::result::Result<telos_llm::ChatResponse, PlannerError> {
        let timeout = self.config.planning_timeout;
        match tokio::time::timeout(timeout, self.client.chat(request)).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => Err(PlannerError::Llm(e)),
            Err(_) => Err(PlannerError::Llm(telos_llm::Error::Timeout(
                timeout.as_millis() as u64,
            ))),
        }
    }

    /// Turn parsed steps into validated, dependency-ordered tasks
    fn materialize(
        &self,
        prompt: &str,
        mut steps: Vec<StepShape>,
    ) -> std::result::Result<Plan, PlannerError> {
        if steps.len() > self.config.max_steps {
            warn!(
                planned = steps.len(),
                cap = self.config.max_steps,
                "Plan exceeds step cap, truncating"
            );
            steps.truncate(self.config.max_steps);
        }

        // Assign stable ids where the model omitted or duplicated them
        let mut seen_ids = BTreeSet::new();
        for (index, step) in steps.iter_mut().enumerate() {
            let id = match step.id.take() {
                Some(id) if !id.is_empty() && !seen_ids.contains(&id) => id,
                _ => format!("task-{}", index + 1),
            };
            seen_ids.insert(id.clone());
            step.id = Some(id);
        }

        let mut tasks = Vec::with_capacity(steps.len());
        for step in steps {
            let id = step.id.unwrap_or_default();
            let spec = self
                .registry
                .spec(&step.tool)
                .ok_or_else(|| PlannerError::UnknownTool {
                    tool: step.tool.clone(),
                })?;

            let arguments = serde_json::Value::Object(step.args);
            validate_args(spec, &arguments).map_err(|e| PlannerError::BadArguments {
                tool: step.tool.clone(),
                reason: e.to_string(),
            })?;

            let mut task = Task::new(id, step.description)
                .with_call(PlannedCall::new(&step.tool, arguments))
                .with_timeout(heuristics::timeout_for(spec, &step.tool))
                .with_max_attempts(self.config.task_max_attempts);
            if let Some(criteria) = step.success_criteria {
                task = task.with_success_criteria(criteria);
            }

            for dep in step.depends_on {
                if seen_ids.contains(&dep) {
                    task.dependencies.insert(dep);
                } else {
                    warn!(task = %task.id, dep = %dep, "Dropping dependency on unknown task id");
                }
            }

            tasks.push(task);
        }

        deps::derive_heuristic_dependencies(&mut tasks, self.registry.as_ref());
        let sorted = deps::topological_sort(tasks)?;
        let complexity = complexity::classify(prompt);

        Ok(Plan::tasks(prompt, sorted, complexity))
    }
}
