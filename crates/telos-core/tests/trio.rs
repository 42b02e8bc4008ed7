//! End-to-end scenarios driving the planner, executor, and orchestrator
//! together with a scripted model and in-memory tools.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use telos_core::{
    AgentEvent, ApprovalMode, ExecutorConfig, Orchestrator, OrchestratorConfig,
};
use telos_llm::ScriptedClient;
use telos_tools::{
    CapabilitySet, ParamKind, ParamSpec, PriorOutputs, Tool, ToolOutcome, ToolRegistry, ToolSpec,
};
use tokio_util::sync::CancellationToken;

/// A web-search stand-in returning a fixed result string
struct WebTool {
    spec: ToolSpec,
    result: String,
}

impl WebTool {
    fn new(result: &str) -> Self {
        Self {
            spec: ToolSpec::new("web", "Search the web")
                .with_param(ParamSpec::required("query", ParamKind::String, "Query"))
                .with_capabilities(CapabilitySet {
                    accesses_network: true,
                    ..CapabilitySet::none()
                }),
            result: result.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl Tool for WebTool {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn execute(
        &self,
        args: serde_json::Value,
        _cancel: CancellationToken,
        _prior: &PriorOutputs,
    ) -> telos_tools::Result<ToolOutcome> {
        Ok(ToolOutcome::success(serde_json::json!({
            "query": args["query"],
            "results": self.result,
        })))
    }
}

/// A file tool that really writes under its working directory
struct FileTool {
    spec: ToolSpec,
    root: std::path::PathBuf,
}

impl FileTool {
    fn new(root: impl Into<std::path::PathBuf>) -> Self {
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
            root: root.into(),
        }
    }
}

#[async_trait::async_trait]
impl Tool for FileTool {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn execute(
        &self,
        args: serde_json::Value,
        _cancel: CancellationToken,
        _prior: &PriorOutputs,
    ) -> telos_tools::Result<ToolOutcome> {
        let path = args["path"].as_str().unwrap_or_default();
        let target = if std::path::Path::new(path).is_absolute() {
            std::path::PathBuf::from(path)
        } else {
            self.root.join(path)
        };
        match args["action"].as_str() {
            Some("write") => {
                let content = args["content"].as_str().unwrap_or_default();
                std::fs::write(&target, content)
                    .map_err(|e| telos_tools::Error::Runtime(e.to_string()))?;
                Ok(ToolOutcome::success(
                    serde_json::json!({"written": target.display().to_string()}),
                ))
            }
            Some("read") => match std::fs::read_to_string(&target) {
                Ok(content) => Ok(ToolOutcome::success(serde_json::json!({"content": content}))),
                Err(e) => Err(telos_tools::Error::NotFound(e.to_string())),
            },
            _ => Err(telos_tools::Error::BadArguments {
                tool: "file".to_string(),
                reason: "unsupported action".to_string(),
            }),
        }
    }
}

/// A slow tool tracking peak concurrency; cancellable
struct SlowTool {
    spec: ToolSpec,
    delay: Duration,
    running: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl SlowTool {
    fn new(name: &str, delay: Duration) -> Self {
        Self {
            spec: ToolSpec::new(name, "A slow operation")
                .with_param(ParamSpec::required("query", ParamKind::String, "Query"))
                .with_capabilities(CapabilitySet {
                    accesses_network: true,
                    ..CapabilitySet::none()
                }),
            delay,
            running: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait::async_trait]
impl Tool for SlowTool {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn execute(
        &self,
        args: serde_json::Value,
        cancel: CancellationToken,
        _prior: &PriorOutputs,
    ) -> telos_tools::Result<ToolOutcome> {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let result = tokio::select! {
            () = cancel.cancelled() => Err(telos_tools::Error::Cancelled),
            () = tokio::time::sleep(self.delay) => {
                Ok(ToolOutcome::success(serde_json::json!({"done": args["query"]})))
            }
        };
        self.running.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

fn orchestrator(
    script: ScriptedClient,
    registry: ToolRegistry,
    config: OrchestratorConfig,
) -> Orchestrator {
    Orchestrator::new(Arc::new(script), Arc::new(registry), config)
}

fn yolo() -> OrchestratorConfig {
    OrchestratorConfig::new().with_approval_mode(ApprovalMode::Yolo)
}

// ── Scenario 1: pure conversation ───────────────────────────────────

#[tokio::test]
async fn conversation_prompt_uses_no_tools() {
    let script = ScriptedClient::new()
        .with_response(r#"{"type": "conversation", "response": "2+2 = 4"}"#);
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(WebTool::new("unused"))).unwrap();

    let agent = orchestrator(script, registry, yolo());
    let result = agent.execute("What is 2+2?").await;

    assert!(result.success);
    assert!(result.response.contains('4'));
    assert!(result.tools_used.is_empty());
}

// ── Scenario 2: single file write ───────────────────────────────────

#[tokio::test]
async fn file_write_plan_creates_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let script = ScriptedClient::new().with_response(
        r#"{"type": "tasks", "plan": [
            {"id": "task-1", "description": "create hello.txt", "tool": "file",
             "args": {"action": "write", "path": "hello.txt", "content": "hi"},
             "depends_on": [], "success_criteria": "hello.txt exists"}
        ]}"#,
    );
    let mut registry = ToolRegistry::new();
    registry
        .register(Arc::new(FileTool::new(dir.path())))
        .unwrap();

    let agent = orchestrator(
        script,
        registry,
        yolo().with_working_dir(dir.path()),
    );
    let result = agent.execute("Create hello.txt containing 'hi'").await;

    assert!(result.success);
    assert_eq!(result.response, "Done.");
    let written = std::fs::read_to_string(dir.path().join("hello.txt")).unwrap();
    assert_eq!(written, "hi");
}

// ── Scenario 3: search then dependent report ────────────────────────

#[tokio::test]
async fn dependent_write_is_grounded_and_ordered() {
    let dir = tempfile::tempdir().unwrap();
    let script = ScriptedClient::new()
        .with_response(
            r#"{"type": "tasks", "plan": [
                {"id": "task-1", "description": "search for zebra facts", "tool": "web",
                 "args": {"query": "zebra facts"}, "depends_on": [], "success_criteria": "results"},
                {"id": "task-2", "description": "write a report to r.md", "tool": "file",
                 "args": {"action": "write", "path": "r.md", "content": "placeholder"},
                 "depends_on": ["task-1"], "success_criteria": "r.md exists"}
            ]}"#,
        )
        // Grounded content synthesis for the dependent write
        .with_response("# Zebra report\nZebra42 is the rarest stripe pattern.");
    let mut registry = ToolRegistry::new();
    registry
        .register(Arc::new(WebTool::new(
            "Zebra42 is the rarest stripe pattern, see https://zebras.example/Zebra42",
        )))
        .unwrap();
    registry
        .register(Arc::new(FileTool::new(dir.path())))
        .unwrap();

    let agent = orchestrator(script, registry, yolo().with_working_dir(dir.path()));
    let mut events = agent.event_bus().subscribe();
    let result = agent.execute("Search for zebras then write a report to r.md").await;

    assert!(result.success);
    let report = std::fs::read_to_string(dir.path().join("r.md")).unwrap();
    // The synthesized content carries tokens from the search output
    assert!(report.contains("Zebra42"), "report not grounded: {report}");

    // Event ordering: task-1 completes before task-2 starts
    let mut order = Vec::new();
    while let Ok(event) = events.try_recv() {
        match event {
            AgentEvent::TaskStarted { task_id, .. } => order.push(format!("start:{task_id}")),
            AgentEvent::TaskCompleted { task_id, .. } => order.push(format!("done:{task_id}")),
            _ => {}
        }
    }
    let done_1 = order.iter().position(|e| e == "done:task-1").unwrap();
    let start_2 = order.iter().position(|e| e == "start:task-2").unwrap();
    assert!(done_1 < start_2, "event order: {order:?}");
}

// ── Scenario 4: unknown tool never runs ─────────────────────────────

#[tokio::test]
async fn unknown_tool_is_rejected_without_crash() {
    let script = ScriptedClient::new().with_response(
        r#"{"type": "tasks", "plan": [
            {"id": "task-1", "description": "list files", "tool": "ls",
             "args": {}, "depends_on": [], "success_criteria": "listing"}
        ]}"#,
    );
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(WebTool::new("unused"))).unwrap();

    let agent = orchestrator(script, registry, yolo());
    let result = agent.execute("List current directory files").await;

    assert!(!result.success);
    assert!(result.error.unwrap().contains("ls"));
    assert!(result.tools_used.is_empty());
}

// ── Scenario 5: parallelism under the concurrency ceiling ───────────

#[tokio::test]
async fn three_independent_tasks_under_ceiling_of_two() {
    let slow = Arc::new(SlowTool::new("web", Duration::from_millis(60)));
    let peak = Arc::clone(&slow.peak);
    let mut registry = ToolRegistry::new();
    registry.register(slow).unwrap();

    let script = ScriptedClient::new()
        .with_response(
            r#"{"type": "tasks", "plan": [
                {"id": "task-1", "description": "lookup a", "tool": "web",
                 "args": {"query": "a"}, "depends_on": [], "success_criteria": "ok"},
                {"id": "task-2", "description": "lookup b", "tool": "web",
                 "args": {"query": "b"}, "depends_on": [], "success_criteria": "ok"},
                {"id": "task-3", "description": "lookup c", "tool": "web",
                 "args": {"query": "c"}, "depends_on": [], "success_criteria": "ok"}
            ]}"#,
        )
        .with_response("All three lookups finished.");

    let config = yolo().with_executor(ExecutorConfig::default().with_max_concurrency(2));
    let agent = orchestrator(script, registry, config);
    let result = agent.execute("Look up a, b, and c").await;

    assert!(result.success);
    assert_eq!(result.tools_used.len(), 3);
    assert!(peak.load(Ordering::SeqCst) <= 2, "ceiling exceeded");
}

// ── Scenario 6: abort mid-execution ─────────────────────────────────

#[tokio::test]
async fn abort_cancels_in_flight_tools() {
    let slow = Arc::new(SlowTool::new("web", Duration::from_secs(30)));
    let running = Arc::clone(&slow.running);
    let mut registry = ToolRegistry::new();
    registry.register(slow).unwrap();

    let script = ScriptedClient::new().with_response(
        r#"{"type": "tasks", "plan": [
            {"id": "task-1", "description": "lookup a", "tool": "web",
             "args": {"query": "a"}, "depends_on": [], "success_criteria": "ok"},
            {"id": "task-2", "description": "lookup b", "tool": "web",
             "args": {"query": "b"}, "depends_on": [], "success_criteria": "ok"}
        ]}"#,
    );

    let agent = Arc::new(orchestrator(script, registry, yolo()));
    let handle = {
        let agent = Arc::clone(&agent);
        tokio::spawn(async move { agent.execute("Look up a and b").await })
    };

    // Wait until both tools are mid-flight, then abort
    for _ in 0..100 {
        if running.load(Ordering::SeqCst) == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(running.load(Ordering::SeqCst), 2);
    agent.abort().await;

    let result = handle.await.unwrap();
    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("aborted"));
    assert!(result.response.to_lowercase().contains("cancel"));
    // Both tools observed cancellation
    for _ in 0..100 {
        if running.load(Ordering::SeqCst) == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(running.load(Ordering::SeqCst), 0);
}

// ── Property: conversation grows monotonically except /clear ────────

#[tokio::test]
async fn conversation_grows_until_cleared() {
    let script = ScriptedClient::new()
        .with_response(r#"{"type": "conversation", "response": "one"}"#)
        .with_response(r#"{"type": "conversation", "response": "two"}"#);
    let agent = orchestrator(script, ToolRegistry::new(), yolo());

    agent.execute("first").await;
    let after_first = agent.status().await.conversation_messages;
    agent.execute("second").await;
    let after_second = agent.status().await.conversation_messages;
    assert!(after_second > after_first);

    agent.execute("/clear").await;
    assert_eq!(agent.status().await.conversation_messages, 0);
}

// ── Property: token usage surfaces on the bus ───────────────────────

#[tokio::test]
async fn token_usage_events_flow_from_client() {
    let script = ScriptedClient::new()
        .with_response(r#"{"type": "conversation", "response": "ok"}"#)
        .with_usage(telos_llm::TokenUsage {
            prompt_tokens: 11,
            completion_tokens: 5,
            total_tokens: 16,
        });
    let agent = orchestrator(script, ToolRegistry::new(), yolo());
    let mut events = agent.event_bus().subscribe();

    agent.execute("hello").await;

    let mut saw_usage = false;
    while let Ok(event) = events.try_recv() {
        if let AgentEvent::TokenUsage { total_tokens, .. } = event {
            assert_eq!(total_tokens, 16);
            saw_usage = true;
        }
    }
    assert!(saw_usage);
}
