//! The observability bridge
//!
//! Two cooperating collectors:
//!
//! - **Attached**: subscribes to the agent's event bus, aggregates metrics
//!   synchronously, and persists records best-effort. Every handler is
//!   wrapped so a monitoring failure is logged and dropped, never raised
//!   into the agent.
//! - **Autonomous**: polls the record store and the log directory on an
//!   interval, so dashboards keep reflecting the last known state even if
//!   the agent crashes or the bridge detaches.
//!
//! Attachment is idempotent per source. Detaching removes subscriptions but
//! leaves the autonomous collector running. The bridge holds no references
//! that keep the agent alive: subscriptions are receiver-side only.

use crate::autonomous;
use crate::collector::MetricsCollector;
use crate::record::{ExecutionRecord, SessionRecord};
use crate::store::RecordStore;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use telos_core::{AgentEvent, EventBus};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Which agent surface a subscription came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BridgeSource {
    /// The orchestrator's event bus
    Orchestrator,
    /// The conversation-memory event surface
    Memory,
}

/// Bridge configuration
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Autonomous poll interval
    pub poll_interval: Duration,
    /// Log directory scanned by the autonomous collector
    pub log_dir: Option<PathBuf>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(15),
            log_dir: None,
        }
    }
}

impl BridgeConfig {
    /// Create a new configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the autonomous poll interval
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the log directory to scan
    #[must_use]
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }
}

/// The observability bridge
pub struct MonitorBridge {
    store: Arc<dyn RecordStore>,
    collector: MetricsCollector,
    session: Arc<RwLock<SessionRecord>>,
    attachments: Mutex<HashMap<BridgeSource, JoinHandle<()>>>,
    autonomous: Mutex<Option<JoinHandle<()>>>,
    config: BridgeConfig,
}

impl MonitorBridge {
    /// Create a bridge over a record store
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self::with_config(store, BridgeConfig::default())
    }

    /// Create with explicit configuration
    #[must_use]
    pub fn with_config(store: Arc<dyn RecordStore>, config: BridgeConfig) -> Self {
        Self {
            store,
            collector: MetricsCollector::new(),
            session: Arc::new(RwLock::new(SessionRecord::new("attached"))),
            attachments: Mutex::new(HashMap::new()),
            autonomous: Mutex::new(None),
            config,
        }
    }

    /// The live metrics collector
    #[must_use]
    pub fn collector(&self) -> &MetricsCollector {
        &self.collector
    }

    /// Export current metrics in Prometheus format
    #[must_use]
    pub fn export_metrics(&self) -> String {
        self.collector.registry().export_prometheus()
    }

    /// The monitoring session id
    pub async fn session_id(&self) -> Uuid {
        self.session.read().await.id
    }

    /// Subscribe to an event bus for the given source.
    ///
    /// Idempotent per source: a second attach for the same source is a
    /// no-op and returns false.
    pub fn attach(&self, source: BridgeSource, bus: &EventBus) -> bool {
        let mut attachments = self
            .attachments
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = attachments.get(&source) {
            if !handle.is_finished() {
                debug!(source = ?source, "Already attached, ignoring");
                return false;
            }
        }

        info!(source = ?source, "Bridge attached");
        let mut rx = bus.subscribe();
        let store = Arc::clone(&self.store);
        let collector = self.collector.clone();
        let session = Arc::clone(&self.session);

        let handle = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        handle_event(&store, &collector, &session, &event).await;
                    }
                    Err(RecvError::Lagged(missed)) => {
                        // Monitoring fell behind; the agent is never slowed
                        // down for us, so just note the gap.
                        warn!(missed, "Bridge subscriber lagged, events dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            debug!("Bridge subscriber loop ended");
        });

        attachments.insert(source, handle);
        true
    }

    /// Remove every subscription. The autonomous collector keeps running.
    pub fn detach(&self) {
        let mut attachments = self
            .attachments
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        for (source, handle) in attachments.drain() {
            info!(source = ?source, "Bridge detached");
            handle.abort();
        }
    }

    /// Start the autonomous collector
    pub fn start(&self) {
        let mut autonomous = self.autonomous.lock().unwrap_or_else(|e| e.into_inner());
        if autonomous.as_ref().map(|h| !h.is_finished()).unwrap_or(false) {
            return;
        }
        info!("Autonomous collector started");
        *autonomous = Some(autonomous::spawn(
            Arc::clone(&self.store),
            self.collector.clone(),
            self.config.clone(),
        ));
    }

    /// Whether the autonomous collector is running
    #[must_use]
    pub fn autonomous_running(&self) -> bool {
        self.autonomous
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Stop everything: subscriptions, the autonomous collector, and the
    /// session record (ended best-effort).
    pub fn stop(&self) {
        self.detach();
        if let Some(handle) = self
            .autonomous
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            handle.abort();
        }

        let store = Arc::clone(&self.store);
        let session = Arc::clone(&self.session);
        tokio::spawn(async move {
            let snapshot = {
                let mut session = session.write().await;
                session.end();
                session.clone()
            };
            if let Err(e) = store.upsert_session(&snapshot).await {
                warn!(error = %e, "Failed to close monitoring session");
            }
        });
        info!("Bridge stopped");
    }
}

impl Drop for MonitorBridge {
    fn drop(&mut self) {
        // Abort background tasks so a dropped bridge cannot outlive its
        // owner or block shutdown.
        if let Ok(mut attachments) = self.attachments.lock() {
            for (_, handle) in attachments.drain() {
                handle.abort();
            }
        }
        if let Ok(mut autonomous) = self.autonomous.lock() {
            if let Some(handle) = autonomous.take() {
                handle.abort();
            }
        }
    }
}

/// Handle one event. Infallible by construction: every failure path is
/// logged and swallowed here, at the monitoring boundary.
async fn handle_event(
    store: &Arc<dyn RecordStore>,
    collector: &MetricsCollector,
    session: &Arc<RwLock<SessionRecord>>,
    event: &AgentEvent,
) {
    collector.observe(event);

    let session_snapshot = match event {
        AgentEvent::OrchestrationCompleted { .. } => {
            let mut session = session.write().await;
            session.turn_count += 1;
            Some(session.clone())
        }
        AgentEvent::TokenUsage { total_tokens, .. } => {
            let mut session = session.write().await;
            session.tokens_used += i64::from(*total_tokens);
            None
        }
        _ => None,
    };

    let session_id = session.read().await.id;
    if let Some(record) = ExecutionRecord::from_event(session_id, event) {
        if let Err(e) = store.insert_record(&record).await {
            warn!(error = %e, store = store.name(), "Record persistence failed, in-memory only");
        }
    }

    if let Some(snapshot) = session_snapshot {
        if let Err(e) = store.upsert_session(&snapshot).await {
            warn!(error = %e, "Session persistence failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use crate::store::MemoryRecordStore;
    use uuid::Uuid;

    /// A store whose writes always fail
    struct BrokenStore;

    #[async_trait::async_trait]
    impl RecordStore for BrokenStore {
        async fn insert_record(&self, _record: &ExecutionRecord) -> Result<()> {
            Err(Error::Database("disk on fire".into()))
        }
        async fn upsert_session(&self, _session: &SessionRecord) -> Result<()> {
            Err(Error::Database("disk on fire".into()))
        }
        async fn get_session(&self, _id: Uuid) -> Result<Option<SessionRecord>> {
            Ok(None)
        }
        async fn record_count(&self) -> Result<u64> {
            Err(Error::Database("disk on fire".into()))
        }
        async fn recent_records(&self, _limit: u32) -> Result<Vec<ExecutionRecord>> {
            Ok(Vec::new())
        }
        fn name(&self) -> &str {
            "broken"
        }
    }

    fn tool_result_event() -> AgentEvent {
        AgentEvent::ToolResult {
            execution_id: Uuid::new_v4(),
            task_id: "t1".into(),
            tool_name: "file".into(),
            success: true,
            duration_ms: 10,
        }
    }

    #[tokio::test]
    async fn test_attach_is_idempotent_per_source() {
        let bus = EventBus::new(32);
        let bridge = MonitorBridge::new(Arc::new(MemoryRecordStore::new()));

        assert!(bridge.attach(BridgeSource::Orchestrator, &bus));
        assert!(!bridge.attach(BridgeSource::Orchestrator, &bus));
        assert!(bridge.attach(BridgeSource::Memory, &bus));
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn test_events_become_records_and_metrics() {
        let bus = EventBus::new(32);
        let store = Arc::new(MemoryRecordStore::new());
        let bridge = MonitorBridge::new(Arc::clone(&store) as Arc<dyn RecordStore>);
        bridge.attach(BridgeSource::Orchestrator, &bus);

        bus.publish(tool_result_event());

        // Give the subscriber a moment to drain
        for _ in 0..100 {
            if store.record_count().await.unwrap() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(store.record_count().await.unwrap(), 1);
        assert_eq!(
            bridge
                .collector()
                .registry()
                .labeled_counter("telos_tool_executions_total")
                .get(&[("tool", "file"), ("status", "ok")]),
            1
        );
    }

    #[tokio::test]
    async fn test_store_failures_degrade_to_in_memory() {
        let bus = EventBus::new(32);
        let bridge = MonitorBridge::new(Arc::new(BrokenStore));
        bridge.attach(BridgeSource::Orchestrator, &bus);

        bus.publish(tool_result_event());
        bus.publish(tool_result_event());

        for _ in 0..100 {
            let counted = bridge
                .collector()
                .registry()
                .labeled_counter("telos_tool_executions_total")
                .get(&[("tool", "file"), ("status", "ok")]);
            if counted == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        // Metrics survive even though every persistence write failed
        assert_eq!(
            bridge
                .collector()
                .registry()
                .labeled_counter("telos_tool_executions_total")
                .get(&[("tool", "file"), ("status", "ok")]),
            2
        );
    }

    #[tokio::test]
    async fn test_detach_leaves_autonomous_running() {
        let bus = EventBus::new(32);
        let bridge = MonitorBridge::with_config(
            Arc::new(MemoryRecordStore::new()),
            BridgeConfig::new().with_poll_interval(Duration::from_millis(20)),
        );
        bridge.attach(BridgeSource::Orchestrator, &bus);
        bridge.start();

        bridge.detach();
        // Aborted subscriber tasks drop their receivers at the next yield
        for _ in 0..100 {
            if bus.subscriber_count() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(bus.subscriber_count(), 0);
        assert!(bridge.autonomous_running());

        bridge.stop();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!bridge.autonomous_running());
    }

    #[tokio::test]
    async fn test_session_accumulates_turns_and_tokens() {
        let bus = EventBus::new(32);
        let store = Arc::new(MemoryRecordStore::new());
        let bridge = MonitorBridge::new(Arc::clone(&store) as Arc<dyn RecordStore>);
        bridge.attach(BridgeSource::Orchestrator, &bus);
        let session_id = bridge.session_id().await;

        let execution_id = Uuid::new_v4();
        bus.publish(AgentEvent::TokenUsage {
            execution_id,
            prompt_tokens: 7,
            completion_tokens: 3,
            total_tokens: 10,
        });
        bus.publish(AgentEvent::OrchestrationCompleted {
            execution_id,
            success: true,
        });

        for _ in 0..100 {
            if store.get_session(session_id).await.unwrap().is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let session = store.get_session(session_id).await.unwrap().unwrap();
        assert_eq!(session.turn_count, 1);
        assert_eq!(session.tokens_used, 10);
    }
}
