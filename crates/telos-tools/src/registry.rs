//! Registry - tool registration and discovery
//!
//! The registry is populated once at process start and is read-only during
//! orchestration. Enumeration order is stable (sorted by name) so planner
//! prompts are reproducible across runs.

use crate::error::{Error, Result};
use crate::schema::ToolSpec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use telos_llm::ToolManifestEntry;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Result of a tool invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutcome {
    /// Whether execution succeeded
    pub success: bool,
    /// Output data
    pub output: serde_json::Value,
    /// Error message if failed
    pub error: Option<String>,
}

impl ToolOutcome {
    /// Create a successful outcome
    #[must_use]
    pub fn success(output: serde_json::Value) -> Self {
        Self {
            success: true,
            output,
            error: None,
        }
    }

    /// Create a failed outcome
    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: serde_json::Value::Null,
            error: Some(error.into()),
        }
    }
}

/// Read-only view of outputs produced by already-completed tasks.
///
/// Keyed by task id. Handed to tools so dependent invocations can ground
/// their work in earlier results without sharing mutable state.
#[derive(Debug, Clone, Default)]
pub struct PriorOutputs {
    outputs: BTreeMap<String, serde_json::Value>,
}

impl PriorOutputs {
    /// Create an empty view
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an iterator of (task id, output) pairs
    pub fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = (String, serde_json::Value)>,
    {
        Self {
            outputs: iter.into_iter().collect(),
        }
    }

    /// Get the output of a task
    #[must_use]
    pub fn get(&self, task_id: &str) -> Option<&serde_json::Value> {
        self.outputs.get(task_id)
    }

    /// Iterate over (task id, output) pairs in task-id order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &serde_json::Value)> {
        self.outputs.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Whether any outputs are present
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// Number of recorded outputs
    #[must_use]
    pub fn len(&self) -> usize {
        self.outputs.len()
    }
}

/// Trait for tool implementations
///
/// Handlers must honor the cancellation token promptly and must not panic on
/// malformed arguments — the executor validates first, but handlers are the
/// last line of defense.
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool spec
    fn spec(&self) -> &ToolSpec;

    /// Execute the tool with validated arguments
    async fn execute(
        &self,
        args: serde_json::Value,
        cancel: CancellationToken,
        prior: &PriorOutputs,
    ) -> Result<ToolOutcome>;
}

/// Registry for tools, immutable after startup
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    /// Create a new empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Register a tool
    ///
    /// # Errors
    ///
    /// Returns `Error::Duplicate` if a tool with the same name exists.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.spec().name.clone();
        if self.tools.contains_key(&name) {
            return Err(Error::Duplicate(name));
        }
        debug!(tool = %name, "Registering tool");
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Look up a tool by name
    ///
    /// # Errors
    ///
    /// Returns `Error::Unknown` if the name does not resolve.
    pub fn lookup(&self, name: &str) -> Result<Arc<dyn Tool>> {
        self.tools
            .get(name)
            .cloned()
            .ok_or_else(|| Error::Unknown(name.to_string()))
    }

    /// Get a tool's spec by name
    #[must_use]
    pub fn spec(&self, name: &str) -> Option<&ToolSpec> {
        self.tools.get(name).map(|t| t.spec())
    }

    /// Check if a tool exists
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Enumerate registered specs in stable (name) order
    pub fn enumerate(&self) -> impl Iterator<Item = &ToolSpec> {
        self.tools.values().map(|t| t.spec())
    }

    /// List all tool names in stable order
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// Render all specs as LLM manifest entries
    #[must_use]
    pub fn manifest(&self) -> Vec<ToolManifestEntry> {
        self.enumerate().map(ToolSpec::manifest_entry).collect()
    }

    /// Get tool count
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
