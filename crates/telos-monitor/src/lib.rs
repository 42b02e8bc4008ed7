//! Telos Monitor - Observability Bridge
//!
//! This crate watches the agent without ever sitting in its critical path:
//! - Record: execution and session records persisted per run
//! - Store: the record-store trait with in-memory and SQLite backends
//! - Metrics: counters, gauges, and histograms with Prometheus export
//! - Collector: event-stream aggregation into metrics and records
//! - Bridge: attached (subscription) and autonomous (polling) collection
//!
//! Monitoring failures are always swallowed and logged; they never reach the
//! agent. Detaching the bridge mid-run does not change the run's outcome.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod autonomous;
pub mod bridge;
pub mod collector;
pub mod error;
pub mod metrics;
pub mod record;
pub mod store;

pub use bridge::{BridgeConfig, BridgeSource, MonitorBridge};
pub use collector::MetricsCollector;
pub use error::{Error, Result};
pub use metrics::{Counter, Gauge, Histogram, LabeledCounter, LabeledHistogram, MetricsRegistry};
pub use record::{ExecutionRecord, RecordType, SessionRecord, SessionStatus};
pub use store::{MemoryRecordStore, RecordStore, SqliteRecordStore};
