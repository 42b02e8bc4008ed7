//! Autonomous collector
//!
//! Polls the record store and the log directory on a fixed interval,
//! refreshing gauges from persisted state. Runs independently of any
//! subscription, so dashboards keep a last-known-state view when the agent
//! crashes or the bridge detaches.

use crate::bridge::BridgeConfig;
use crate::collector::MetricsCollector;
use crate::store::RecordStore;
use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub(crate) fn spawn(
    store: Arc<dyn RecordStore>,
    collector: MetricsCollector,
    config: BridgeConfig,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(config.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            match store.record_count().await {
                Ok(count) => {
                    collector
                        .registry()
                        .gauge("telos_store_records")
                        .set(count as i64);
                }
                Err(e) => {
                    // Store outage: keep the last known gauge value
                    warn!(error = %e, store = store.name(), "Record-store poll failed");
                }
            }

            match store.recent_records(25).await {
                Ok(records) => {
                    let failures = records.iter().filter(|r| !r.success).count();
                    collector
                        .registry()
                        .gauge("telos_store_recent_failures")
                        .set(failures as i64);
                }
                Err(e) => {
                    debug!(error = %e, "Recent-record poll failed");
                }
            }

            if let Some(log_dir) = &config.log_dir {
                match scan_log_dir(log_dir) {
                    Ok((files, bytes)) => {
                        collector
                            .registry()
                            .gauge("telos_log_files")
                            .set(files as i64);
                        collector
                            .registry()
                            .gauge("telos_log_bytes")
                            .set(bytes as i64);
                    }
                    Err(e) => {
                        debug!(error = %e, dir = %log_dir.display(), "Log-directory scan failed");
                    }
                }
            }
        }
    })
}

/// Count `.log` files and their total size under a directory
fn scan_log_dir(dir: &Path) -> std::io::Result<(usize, u64)> {
    let mut files = 0;
    let mut bytes = 0;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("log") {
            files += 1;
            bytes += entry.metadata()?.len();
        }
    }
    Ok((files, bytes))
}
