//! Watchdog: runaway-task cancellation and stall alerts
//!
//! Inspects in-flight tasks at a fixed interval. A task past
//! `timeout * grace_factor` is force-cancelled and will surface as
//! `timed_out`. Separately, if no task has made progress for the stall
//! window while work is in flight, a `HealthAlert` event fires — it never
//! cancels anything itself.

use super::{ActiveTask, ExecutorConfig};
use crate::events::{AgentEvent, EventBus};
use dashmap::{DashMap, DashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::warn;
use uuid::Uuid;

/// Progress tracking shared between the scheduler and the watchdog
#[derive(Debug, Clone)]
pub(crate) struct WatchdogState {
    last_progress: Arc<Mutex<Instant>>,
    alerted: Arc<AtomicBool>,
}

impl WatchdogState {
    pub(crate) fn new() -> Self {
        Self {
            last_progress: Arc::new(Mutex::new(Instant::now())),
            alerted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Note that the run made progress (a dispatch or a completion)
    pub(crate) fn note_progress(&self) {
        *self.last_progress.lock().unwrap_or_else(|e| e.into_inner()) = Instant::now();
        self.alerted.store(false, Ordering::Relaxed);
    }

    fn stalled_for(&self) -> std::time::Duration {
        self.last_progress
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .elapsed()
    }
}

/// Spawn the watchdog for one plan run
pub(super) fn spawn(
    execution_id: Uuid,
    active: Arc<DashMap<String, ActiveTask>>,
    forced_timeouts: Arc<DashSet<String>>,
    bus: Arc<EventBus>,
    state: WatchdogState,
    config: ExecutorConfig,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(config.watchdog_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick fires immediately; skip it
        ticker.tick().await;

        loop {
            ticker.tick().await;

            for entry in active.iter() {
                let budget = entry.timeout.mul_f64(config.grace_factor);
                if entry.started.elapsed() > budget {
                    warn!(
                        task_id = %entry.key(),
                        elapsed_ms = entry.started.elapsed().as_millis() as u64,
                        "Force-cancelling task past its grace budget"
                    );
                    forced_timeouts.insert(entry.key().clone());
                    entry.token.cancel();
                }
            }

            if !active.is_empty()
                && state.stalled_for() > config.stall_alert_after
                && !state.alerted.swap(true, Ordering::Relaxed)
            {
                warn!(execution_id = %execution_id, "No task progress within stall window");
                bus.publish(AgentEvent::HealthAlert {
                    execution_id,
                    detail: format!(
                        "no task progress for {}s with {} task(s) in flight",
                        config.stall_alert_after.as_secs(),
                        active.len()
                    ),
                });
            }
        }
    })
}
