use super::labeled::{format_labels, LabeledCounter, LabeledHistogram};
use super::types::{Counter, Gauge, Histogram};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Registry of named metrics
#[derive(Debug, Default, Clone)]
pub struct MetricsRegistry {
    counters: Arc<RwLock<HashMap<String, Counter>>>,
    gauges: Arc<RwLock<HashMap<String, Gauge>>>,
    histograms: Arc<RwLock<HashMap<String, Histogram>>>,
    labeled_counters: Arc<RwLock<HashMap<String, LabeledCounter>>>,
    labeled_histograms: Arc<RwLock<HashMap<String, LabeledHistogram>>>,
}

macro_rules! get_or_create {
    ($map:expr, $name:expr) => {{
        {
            let map = $map.read().unwrap_or_else(|e| e.into_inner());
            if let Some(metric) = map.get($name) {
                return metric.clone();
            }
        }
        let mut map = $map.write().unwrap_or_else(|e| e.into_inner());
        map.entry($name.to_string()).or_default().clone()
    }};
}

fn sorted<T: Clone>(map: &Arc<RwLock<HashMap<String, T>>>) -> Vec<(String, T)> {
    let map = map.read().unwrap_or_else(|e| e.into_inner());
    let mut entries: Vec<(String, T)> = map.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    entries
}

impl MetricsRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create a counter
    pub fn counter(&self, name: &str) -> Counter {
        get_or_create!(self.counters, name)
    }

    /// Get or create a gauge
    pub fn gauge(&self, name: &str) -> Gauge {
        get_or_create!(self.gauges, name)
    }

    /// Get or create a histogram
    pub fn histogram(&self, name: &str) -> Histogram {
        get_or_create!(self.histograms, name)
    }

    /// Get or create a labeled counter
    pub fn labeled_counter(&self, name: &str) -> LabeledCounter {
        get_or_create!(self.labeled_counters, name)
    }

    /// Get or create a labeled histogram
    pub fn labeled_histogram(&self, name: &str) -> LabeledHistogram {
        get_or_create!(self.labeled_histograms, name)
    }

    /// Export every metric in Prometheus text format.
    ///
    /// Output is sorted by metric name and label set, so two registries fed
    /// the same observations export byte-identical text.
    #[must_use]
    pub fn export_prometheus(&self) -> String {
        let mut out = String::new();

        for (name, counter) in sorted(&self.counters) {
            out.push_str(&format!("# TYPE {name} counter\n{name} {}\n", counter.get()));
        }

        for (name, gauge) in sorted(&self.gauges) {
            out.push_str(&format!("# TYPE {name} gauge\n{name} {}\n", gauge.get()));
        }

        for (name, histogram) in sorted(&self.histograms) {
            out.push_str(&format!("# TYPE {name} histogram\n"));
            write_histogram(&mut out, &name, &[], &histogram);
        }

        for (name, family) in sorted(&self.labeled_counters) {
            out.push_str(&format!("# TYPE {name} counter\n"));
            let mut entries = family.entries();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            for (labels, value) in entries {
                out.push_str(&format!("{name}{} {value}\n", format_labels(&labels)));
            }
        }

        for (name, family) in sorted(&self.labeled_histograms) {
            out.push_str(&format!("# TYPE {name} histogram\n"));
            let mut entries = family.entries();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            for (labels, histogram) in entries {
                write_histogram(&mut out, &name, &labels, &histogram);
            }
        }

        out
    }
}

fn write_histogram(
    out: &mut String,
    name: &str,
    labels: &[(String, String)],
    histogram: &Histogram,
) {
    for (bound, count) in histogram.buckets() {
        let mut bucket_labels = labels.to_vec();
        bucket_labels.push(("le".to_string(), bound.to_string()));
        out.push_str(&format!(
            "{name}_bucket{} {count}\n",
            format_labels(&bucket_labels)
        ));
    }
    let mut inf_labels = labels.to_vec();
    inf_labels.push(("le".to_string(), "+Inf".to_string()));
    out.push_str(&format!(
        "{name}_bucket{} {}\n",
        format_labels(&inf_labels),
        histogram.count()
    ));
    let label_text = format_labels(labels);
    out.push_str(&format!("{name}_sum{label_text} {}\n", histogram.sum()));
    out.push_str(&format!("{name}_count{label_text} {}\n", histogram.count()));
}
