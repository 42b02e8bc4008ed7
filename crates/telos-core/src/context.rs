//! Execution context: the per-run side-effect ledger
//!
//! Shared by reference across concurrently running tasks. Each task writes
//! only its own output slot; dependent tasks read completed slots through a
//! `PriorOutputs` view. Ledger appends are independent short critical
//! sections.

use dashmap::DashMap;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use telos_tools::PriorOutputs;

/// Per-run execution context
#[derive(Debug, Default)]
pub struct ExecutionContext {
    /// Working directory for relative paths
    working_dir: PathBuf,
    /// Environment handed to tools
    environment: HashMap<String, String>,
    /// Files created during the run
    files_created: Mutex<Vec<PathBuf>>,
    /// Files modified during the run
    files_modified: Mutex<Vec<PathBuf>>,
    /// Files deleted during the run
    files_deleted: Mutex<Vec<PathBuf>>,
    /// Shell commands executed
    commands_executed: Mutex<Vec<String>>,
    /// Web queries issued
    web_queries: Mutex<Vec<String>>,
    /// Task outputs, one writer per slot
    outputs: DashMap<String, serde_json::Value>,
}

impl ExecutionContext {
    /// Create a context rooted at a working directory
    #[must_use]
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            ..Self::default()
        }
    }

    /// Set the environment handed to tools
    #[must_use]
    pub fn with_environment(mut self, environment: HashMap<String, String>) -> Self {
        self.environment = environment;
        self
    }

    /// The working directory
    #[must_use]
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// The environment
    #[must_use]
    pub fn environment(&self) -> &HashMap<String, String> {
        &self.environment
    }

    /// Record a task's output. Each task writes exactly one slot.
    pub fn record_output(&self, task_id: impl Into<String>, output: serde_json::Value) {
        self.outputs.insert(task_id.into(), output);
    }

    /// Get one task's output
    #[must_use]
    pub fn output(&self, task_id: &str) -> Option<serde_json::Value> {
        self.outputs.get(task_id).map(|v| v.clone())
    }

    /// Build a read-only view of the outputs of the given tasks
    #[must_use]
    pub fn outputs_for<'a, I>(&self, task_ids: I) -> PriorOutputs
    where
        I: IntoIterator<Item = &'a String>,
    {
        PriorOutputs::from_iter(task_ids.into_iter().filter_map(|id| {
            self.outputs
                .get(id.as_str())
                .map(|v| (id.clone(), v.clone()))
        }))
    }

    /// Note a file creation
    pub fn note_file_created(&self, path: impl Into<PathBuf>) {
        self.files_created
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(path.into());
    }

    /// Note a file modification
    pub fn note_file_modified(&self, path: impl Into<PathBuf>) {
        self.files_modified
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(path.into());
    }

    /// Note a file deletion
    pub fn note_file_deleted(&self, path: impl Into<PathBuf>) {
        self.files_deleted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(path.into());
    }

    /// Note an executed shell command
    pub fn note_command(&self, command: impl Into<String>) {
        self.commands_executed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(command.into());
    }

    /// Note a web query
    pub fn note_web_query(&self, query: impl Into<String>) {
        self.web_queries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(query.into());
    }

    /// Files created so far
    #[must_use]
    pub fn files_created(&self) -> Vec<PathBuf> {
        self.files_created
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Files modified so far
    #[must_use]
    pub fn files_modified(&self) -> Vec<PathBuf> {
        self.files_modified
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Commands executed so far
    #[must_use]
    pub fn commands_executed(&self) -> Vec<String> {
        self.commands_executed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Web queries issued so far
    #[must_use]
    pub fn web_queries(&self) -> Vec<String> {
        self.web_queries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Whether any filesystem write effect was recorded
    #[must_use]
    pub fn has_file_effects(&self) -> bool {
        !self
            .files_created
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_empty()
            || !self
                .files_modified
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .is_empty()
            || !self
                .files_deleted
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .is_empty()
    }

    /// Number of task outputs recorded
    #[must_use]
    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_slots() {
        let ctx = ExecutionContext::new("/tmp");
        ctx.record_output("t1", serde_json::json!({"n": 1}));
        ctx.record_output("t2", serde_json::json!({"n": 2}));

        assert_eq!(ctx.output("t1").unwrap()["n"], 1);
        assert!(ctx.output("t9").is_none());

        let deps = vec!["t1".to_string(), "t9".to_string()];
        let view = ctx.outputs_for(&deps);
        assert_eq!(view.len(), 1);
        assert_eq!(view.get("t1").unwrap()["n"], 1);
    }

    #[test]
    fn test_ledgers() {
        let ctx = ExecutionContext::new(".");
        assert!(!ctx.has_file_effects());

        ctx.note_file_created("hello.txt");
        ctx.note_command("ls -la");
        ctx.note_web_query("rust schedulers");

        assert!(ctx.has_file_effects());
        assert_eq!(ctx.files_created().len(), 1);
        assert_eq!(ctx.commands_executed(), vec!["ls -la".to_string()]);
        assert_eq!(ctx.web_queries().len(), 1);
    }
}
