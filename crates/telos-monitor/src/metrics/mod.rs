//! Lightweight metrics without external dependencies
//!
//! Counters, gauges, and histograms backed by atomics, with labeled
//! variants and Prometheus text export. A process-global registry is
//! available for surfaces that cannot thread a registry through.

mod labeled;
mod registry;
mod types;


pub use labeled::{LabelKey, LabeledCounter, LabeledHistogram};
pub use registry::MetricsRegistry;
pub use types::{Counter, Gauge, Histogram};

/// Process-global registry
pub mod global {
    use super::MetricsRegistry;
    use std::sync::OnceLock;

    static REGISTRY: OnceLock<MetricsRegistry> = OnceLock::new();

    /// Get the global metrics registry
    pub fn registry() -> &'static MetricsRegistry {
        REGISTRY.get_or_init(MetricsRegistry::new)
    }

    /// Export all global metrics in Prometheus format
    #[must_use]
    pub fn export_prometheus() -> String {
        registry().export_prometheus()
    }
}
