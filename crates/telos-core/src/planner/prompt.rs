//! Planning prompt construction
//!
//! The tool manifest is rendered from the registry's typed schemas so the
//! model's argument synthesis is grounded in the declared parameters rather
//! than inferred from tool names.

use telos_tools::{ParamKind, ToolRegistry, ToolSpec};

/// Render the registry into the manifest section of the planning prompt
#[must_use]
pub(super) fn render_manifest(registry: &ToolRegistry) -> String {
    let mut out = String::new();
    for spec in registry.enumerate() {
        out.push_str(&format!("- {}: {}\n", spec.name, spec.description));
        for param in &spec.params {
            let requirement = if param.required { "required" } else { "optional" };
            match &param.kind {
                ParamKind::Enum(options) => {
                    out.push_str(&format!(
                        "    {} ({}, {}): {} [one of: {}]\n",
                        param.name,
                        param.kind.json_type(),
                        requirement,
                        param.description,
                        options.join(", ")
                    ));
                }
                kind => {
                    out.push_str(&format!(
                        "    {} ({}, {}): {}\n",
                        param.name,
                        kind.json_type(),
                        requirement,
                        param.description
                    ));
                }
            }
        }
    }
    if out.is_empty() {
        out.push_str("(no tools registered)\n");
    }
    out
}

/// The full planning prompt
#[must_use]
pub(super) fn planning_prompt(manifest: &str, max_steps: usize) -> String {
    format!(
        r#"You are the planning component of an autonomous agent. Given a user request, decide whether it needs tools.

Reply with EXACTLY ONE JSON object and nothing else, in one of two shapes:

1. For questions answerable without tools:
{{"type": "conversation", "response": "<your answer>"}}

2. For work that needs tools:
{{"type": "tasks", "plan": [
  {{"id": "task-1", "description": "<what this step does>", "tool": "<tool name>", "args": {{<arguments>}}, "depends_on": [], "success_criteria": "<how to tell it worked>"}}
]}}

Rules:
- Each task uses exactly one tool.
- Express prerequisites as earlier tasks and reference them in depends_on.
- Give every task an explicit success criterion.
- Keep the plan atomic and short: no more than {max_steps} tasks.
- Use only the tools listed below, with their exact parameter names. Do not invent tools or parameters.

## Available tools
{manifest}"#
    )
}

/// Simplified prompt used for the single parse-failure retry
#[must_use]
pub(super) fn simplified_prompt(manifest: &str) -> String {
    format!(
        r#"Reply with ONLY a JSON object. No prose, no code fences.

Either: {{"type": "conversation", "response": "..."}}
Or: {{"type": "tasks", "plan": [{{"id": "task-1", "description": "...", "tool": "...", "args": {{}}, "depends_on": [], "success_criteria": "..."}}]}}

Tools:
{manifest}"#
    )
}

/// Prompt asking for corrected arguments after a tool rejected them
#[must_use]
pub(super) fn resynthesis_prompt(
    spec: &ToolSpec,
    old_args: &serde_json::Value,
    error: &str,
) -> String {
    format!(
        r#"The tool '{name}' rejected its arguments.

Schema:
{schema}

Previous arguments:
{old_args}

Error:
{error}

Reply with ONLY the corrected JSON argument object for '{name}'. No prose."#,
        name = spec.name,
        schema = spec.json_schema(),
    )
}
