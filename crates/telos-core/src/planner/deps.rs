//! Heuristic dependency derivation and topological sorting
//!
//! Declared dependencies come from the model; three rules add more on top:
//! a file write depends on the latest earlier read of the same file, a test
//! task depends on earlier create/implement tasks, and a deploy task
//! depends on earlier test tasks.

use super::heuristics::{extract_paths, looks_like_write};
use crate::error::PlannerError;
use crate::plan::Task;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::OnceLock;
use telos_tools::ToolRegistry;
use tracing::debug;

fn test_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(test|verify|validate|check)\b").unwrap())
}

fn build_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(create|implement|write|build|add|generate)\b").unwrap())
}

fn deploy_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(deploy|install|release|publish)\b").unwrap())
}

/// Add heuristic dependencies on top of any declared ones
pub(super) fn derive_heuristic_dependencies(tasks: &mut [Task], registry: &ToolRegistry) {
    // Per-task read/write path sets, in plan order
    let mut reads: Vec<BTreeSet<String>> = Vec::with_capacity(tasks.len());
    let mut writes: Vec<BTreeSet<String>> = Vec::with_capacity(tasks.len());

    for task in tasks.iter() {
        let mut task_reads = BTreeSet::new();
        let mut task_writes = BTreeSet::new();
        for call in &task.tool_calls {
            let Some(spec) = registry.spec(&call.tool_name) else {
                continue;
            };
            let paths = extract_paths(&call.arguments);
            if spec.capabilities.writes_fs && looks_like_write(&call.arguments) {
                task_writes.extend(paths);
            } else if spec.capabilities.reads_fs {
                task_reads.extend(paths);
            }
        }
        reads.push(task_reads);
        writes.push(task_writes);
    }

    for i in 0..tasks.len() {
        // A write depends on the latest earlier read of the same file
        for path in writes[i].clone() {
            if let Some(j) = (0..i).rev().find(|&j| reads[j].contains(&path)) {
                let dep = tasks[j].id.clone();
                if dep != tasks[i].id {
                    debug!(task = %tasks[i].id, dep = %dep, path = %path, "Write-after-read dependency");
                    tasks[i].dependencies.insert(dep);
                }
            }
        }

        // A test task depends on earlier create/implement tasks
        if test_pattern().is_match(&tasks[i].description) {
            let deps: Vec<String> = (0..i)
                .filter(|&j| build_pattern().is_match(&tasks[j].description))
                .map(|j| tasks[j].id.clone())
                .collect();
            for dep in deps {
                tasks[i].dependencies.insert(dep);
            }
        }

        // A deploy task depends on earlier test tasks
        if deploy_pattern().is_match(&tasks[i].description) {
            let deps: Vec<String> = (0..i)
                .filter(|&j| test_pattern().is_match(&tasks[j].description))
                .map(|j| tasks[j].id.clone())
                .collect();
            for dep in deps {
                tasks[i].dependencies.insert(dep);
            }
        }

        // Self-dependencies can fall out of overlapping heuristics
        let own = tasks[i].id.clone();
        tasks[i].dependencies.remove(&own);
    }
}

/// Kahn's algorithm. Preserves declared order among independent tasks.
///
/// # Errors
///
/// Returns `PlannerError::CyclicDependencies` naming the tasks left
/// unsorted when a cycle exists.
pub(super) fn topological_sort(tasks: Vec<Task>) -> Result<Vec<Task>, PlannerError> {
    let order: Vec<String> = tasks.iter().map(|t| t.id.clone()).collect();
    let mut by_id: BTreeMap<String, Task> = tasks.into_iter().map(|t| (t.id.clone(), t)).collect();

    let mut in_degree: BTreeMap<String, usize> = BTreeMap::new();
    let mut dependents: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for id in &order {
        let task = &by_id[id];
        in_degree.insert(id.clone(), task.dependencies.len());
        for dep in &task.dependencies {
            dependents.entry(dep.clone()).or_default().push(id.clone());
        }
    }

    let mut queue: VecDeque<String> = order
        .iter()
        .filter(|id| in_degree[*id] == 0)
        .cloned()
        .collect();
    let mut sorted = Vec::with_capacity(order.len());

    while let Some(id) = queue.pop_front() {
        if let Some(task) = by_id.remove(&id) {
            sorted.push(task);
        }
        for dependent in dependents.get(&id).cloned().unwrap_or_default() {
            if let Some(degree) = in_degree.get_mut(&dependent) {
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(dependent);
                }
            }
        }
    }

    if by_id.is_empty() {
        Ok(sorted)
    } else {
        Err(PlannerError::CyclicDependencies {
            involved: by_id.into_keys().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::PlannedCall;
    use std::sync::Arc;
    use telos_tools::{CapabilitySet, ParamKind, ParamSpec, PriorOutputs, Tool, ToolOutcome, ToolSpec};
    use tokio_util::sync::CancellationToken;

    struct Fake(ToolSpec);

    #[async_trait::async_trait]
    impl Tool for Fake {
        fn spec(&self) -> &ToolSpec {
            &self.0
        }
        async fn execute(
            &self,
            _args: serde_json::Value,
            _cancel: CancellationToken,
            _prior: &PriorOutputs,
        ) -> telos_tools::Result<ToolOutcome> {
            Ok(ToolOutcome::success(serde_json::Value::Null))
        }
    }

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry
            .register(Arc::new(Fake(
                ToolSpec::new("file", "File operations")
                    .with_param(ParamSpec::required(
                        "action",
                        ParamKind::Enum(vec!["read".into(), "write".into()]),
                        "Operation",
                    ))
                    .with_param(ParamSpec::required("path", ParamKind::String, "Path"))
                    .with_param(ParamSpec::optional("content", ParamKind::String, "Content"))
                    .with_capabilities(CapabilitySet {
                        reads_fs: true,
                        writes_fs: true,
                        ..CapabilitySet::none()
                    }),
            )))
            .unwrap();
        registry
    }

    fn read_task(id: &str, path: &str) -> Task {
        Task::new(id, format!("look at {path}")).with_call(PlannedCall::new(
            "file",
            serde_json::json!({"action": "read", "path": path}),
        ))
    }

    fn write_task(id: &str, path: &str) -> Task {
        Task::new(id, format!("save {path}")).with_call(PlannedCall::new(
            "file",
            serde_json::json!({"action": "write", "path": path, "content": "x"}),
        ))
    }

    #[test]
    fn test_write_after_read_dependency() {
        let registry = registry();
        let mut tasks = vec![
            read_task("t1", "data.csv"),
            read_task("t2", "other.csv"),
            write_task("t3", "data.csv"),
        ];
        derive_heuristic_dependencies(&mut tasks, &registry);
        assert!(tasks[2].dependencies.contains("t1"));
        assert!(!tasks[2].dependencies.contains("t2"));
    }

    #[test]
    fn test_test_depends_on_create() {
        let registry = registry();
        let mut tasks = vec![
            Task::new("t1", "implement the parser"),
            Task::new("t2", "test the parser"),
        ];
        derive_heuristic_dependencies(&mut tasks, &registry);
        assert!(tasks[1].dependencies.contains("t1"));
    }

    #[test]
    fn test_deploy_depends_on_test() {
        let registry = registry();
        let mut tasks = vec![
            Task::new("t1", "create the service"),
            Task::new("t2", "test the service"),
            Task::new("t3", "deploy the service"),
        ];
        derive_heuristic_dependencies(&mut tasks, &registry);
        assert!(tasks[2].dependencies.contains("t2"));
    }

    #[test]
    fn test_topological_sort_orders_dependencies_first() {
        let tasks = vec![
            Task::new("t1", "later").with_dependency("t2"),
            Task::new("t2", "earlier"),
        ];
        let sorted = topological_sort(tasks).unwrap();
        assert_eq!(sorted[0].id, "t2");
        assert_eq!(sorted[1].id, "t1");
    }

    #[test]
    fn test_topological_sort_detects_cycle() {
        let tasks = vec![
            Task::new("t1", "a").with_dependency("t2"),
            Task::new("t2", "b").with_dependency("t1"),
        ];
        match topological_sort(tasks) {
            Err(PlannerError::CyclicDependencies { involved }) => {
                assert_eq!(involved.len(), 2);
            }
            other => panic!("expected cycle error, got {other:?}"),
        }
    }

    #[test]
    fn test_sort_preserves_declared_order_of_independent_tasks() {
        let tasks = vec![
            Task::new("b", "first declared"),
            Task::new("a", "second declared"),
        ];
        let sorted = topological_sort(tasks).unwrap();
        assert_eq!(sorted[0].id, "b");
    }
}
