use super::*;
use crate::config::ApprovalMode;
use crate::events::EventBus;
use std::sync::Arc;
use telos_llm::ScriptedClient;
use telos_tools::{
    CapabilitySet, ParamKind, ParamSpec, PriorOutputs, Tool, ToolOutcome, ToolRegistry, ToolSpec,
};
use tokio_util::sync::CancellationToken;

struct EchoTool {
    spec: ToolSpec,
}

impl EchoTool {
    fn web() -> Self {
        Self {
            spec: ToolSpec::new("web", "Search the web")
                .with_param(ParamSpec::required("query", ParamKind::String, "Query"))
                .with_capabilities(CapabilitySet {
                    accesses_network: true,
                    ..CapabilitySet::none()
                }),
        }
    }

    fn file() -> Self {
        Self {
            spec: ToolSpec::new("file", "Read and write files")
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
        }
    }
}

#[async_trait::async_trait]
impl Tool for EchoTool {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn execute(
        &self,
        args: serde_json::Value,
        _cancel: CancellationToken,
        _prior: &PriorOutputs,
    ) -> telos_tools::Result<ToolOutcome> {
        Ok(ToolOutcome::success(serde_json::json!({"echo": args})))
    }
}

struct BrokenTool {
    spec: ToolSpec,
}

#[async_trait::async_trait]
impl Tool for BrokenTool {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn execute(
        &self,
        _args: serde_json::Value,
        _cancel: CancellationToken,
        _prior: &PriorOutputs,
    ) -> telos_tools::Result<ToolOutcome> {
        Err(telos_tools::Error::PermissionDenied("sealed".into()))
    }
}

fn registry() -> Arc<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(EchoTool::web())).unwrap();
    registry.register(Arc::new(EchoTool::file())).unwrap();
    registry
        .register(Arc::new(BrokenTool {
            spec: ToolSpec::new("broken", "Always fails")
                .with_param(ParamSpec::optional("query", ParamKind::String, "Query")),
        }))
        .unwrap();
    Arc::new(registry)
}

fn orchestrator_with(script: ScriptedClient) -> Orchestrator {
    let config = OrchestratorConfig::new().with_approval_mode(ApprovalMode::Yolo);
    Orchestrator::new(Arc::new(script), registry(), config)
}

#[tokio::test]
async fn test_slash_help() {
    let orchestrator = orchestrator_with(ScriptedClient::new());
    let result = orchestrator.execute("/help").await;
    assert!(result.success);
    assert!(result.response.contains("/status"));
    assert!(result.tools_used.is_empty());
}

#[tokio::test]
async fn test_slash_tools_lists_registry() {
    let orchestrator = orchestrator_with(ScriptedClient::new());
    let result = orchestrator.execute("/tools").await;
    assert!(result.response.contains("web"));
    assert!(result.response.contains("file"));
}

#[tokio::test]
async fn test_slash_clear_truncates_conversation() {
    let orchestrator = orchestrator_with(
        ScriptedClient::new().with_response(r#"{"type": "conversation", "response": "hi"}"#),
    );

    orchestrator.execute("hello").await;
    assert_eq!(orchestrator.status().await.conversation_messages, 2);

    let result = orchestrator.execute("/clear").await;
    assert!(result.success);
    assert_eq!(orchestrator.status().await.conversation_messages, 0);
}

#[tokio::test]
async fn test_slash_quit_sets_exit_flag() {
    let orchestrator = orchestrator_with(ScriptedClient::new());
    assert!(!orchestrator.exit_requested());
    orchestrator.execute("/quit").await;
    assert!(orchestrator.exit_requested());

    let orchestrator = orchestrator_with(ScriptedClient::new());
    orchestrator.execute("/exit").await;
    assert!(orchestrator.exit_requested());
}

#[tokio::test]
async fn test_slash_unknown_command() {
    let orchestrator = orchestrator_with(ScriptedClient::new());
    let result = orchestrator.execute("/frobnicate").await;
    assert!(result.response.contains("Unknown command"));
}

#[tokio::test]
async fn test_conversation_request_appends_history() {
    let orchestrator = orchestrator_with(
        ScriptedClient::new().with_response(r#"{"type": "conversation", "response": "4"}"#),
    );

    let result = orchestrator.execute("What is 2+2?").await;
    assert!(result.success);
    assert_eq!(result.response, "4");
    assert!(result.tools_used.is_empty());
    assert_eq!(orchestrator.status().await.conversation_messages, 2);
}

#[tokio::test]
async fn test_planner_failure_surfaces_to_user() {
    let orchestrator = orchestrator_with(
        ScriptedClient::new()
            .with_error(telos_llm::Error::Api("backend exploded".into())),
    );

    let result = orchestrator.execute("Do something").await;
    assert!(!result.success);
    assert!(result.error.is_some());
    assert!(result.response.contains("could not plan"));
}

#[tokio::test]
async fn test_file_write_plan_responds_tersely() {
    let script = ScriptedClient::new().with_response(
        r#"{"type": "tasks", "plan": [
            {"id": "task-1", "description": "create hello.txt", "tool": "file",
             "args": {"action": "write", "path": "hello.txt", "content": "hi"},
             "depends_on": [], "success_criteria": "file exists"}
        ]}"#,
    );
    let orchestrator = orchestrator_with(script);

    let result = orchestrator.execute("Create hello.txt containing 'hi'").await;
    assert!(result.success);
    assert_eq!(result.response, "Done.");
    assert_eq!(result.tools_used, vec!["file".to_string()]);
}

#[tokio::test]
async fn test_mixed_outcome_lists_failures_and_advisory() {
    let script = ScriptedClient::new()
        .with_response(
            r#"{"type": "tasks", "plan": [
                {"id": "task-1", "description": "search the web", "tool": "web",
                 "args": {"query": "x"}, "depends_on": [], "success_criteria": "ok"},
                {"id": "task-2", "description": "poke the sealed system", "tool": "broken",
                 "args": {}, "depends_on": [], "success_criteria": "ok"}
            ]}"#,
        )
        // Advisory strategy call
        .with_response("Ask an operator to unseal the system first.");
    let orchestrator = orchestrator_with(script);

    let result = orchestrator.execute("search x and poke the system").await;
    assert!(!result.success);
    assert!(result.response.contains("Completed:"));
    assert!(result.response.contains("search the web"));
    assert!(result.response.contains("Failed:"));
    assert!(result.response.contains("permission_denied"));
    assert!(result.response.contains("Suggested next step"));
    assert_eq!(result.tools_used, vec!["web".to_string()]);
    assert!(result.error.unwrap().contains("partial"));
}

#[tokio::test]
async fn test_coordination_log_cleared_per_run() {
    let orchestrator = orchestrator_with(
        ScriptedClient::new()
            .with_response(r#"{"type": "conversation", "response": "a"}"#)
            .with_response(r#"{"type": "conversation", "response": "b"}"#),
    );

    orchestrator.execute("first").await;
    let after_first = orchestrator.coordination_log().len();
    orchestrator.execute("second").await;
    let after_second = orchestrator.coordination_log().len();

    // The log holds only the second run's messages
    assert_eq!(after_first, after_second);
}

#[tokio::test]
async fn test_pause_blocks_until_resume() {
    let orchestrator = Arc::new(orchestrator_with(
        ScriptedClient::new().with_response(r#"{"type": "conversation", "response": "late"}"#),
    ));

    orchestrator.pause();
    let handle = {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move { orchestrator.execute("are you there?").await })
    };

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert!(!handle.is_finished());

    orchestrator.resume();
    let result = handle.await.unwrap();
    assert_eq!(result.response, "late");
}

#[tokio::test]
async fn test_event_bus_sees_lifecycle() {
    let orchestrator = orchestrator_with(
        ScriptedClient::new().with_response(r#"{"type": "conversation", "response": "ok"}"#),
    );
    let mut rx = orchestrator.event_bus().subscribe();

    orchestrator.execute("hello").await;

    let mut names = Vec::new();
    while let Ok(event) = rx.try_recv() {
        names.push(event.name());
    }
    assert_eq!(names.first(), Some(&"orchestration_started"));
    assert!(names.contains(&"planning_started"));
    assert!(names.contains(&"planning_completed"));
    assert_eq!(names.last(), Some(&"orchestration_completed"));
}
