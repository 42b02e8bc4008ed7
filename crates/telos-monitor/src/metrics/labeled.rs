use super::types::{Counter, Histogram};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// A sorted label set used as a map key
pub type LabelKey = Vec<(String, String)>;

fn label_key(labels: &[(&str, &str)]) -> LabelKey {
    let mut key: LabelKey = labels
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    key.sort();
    key
}

/// A counter family keyed by label sets
#[derive(Debug, Default, Clone)]
pub struct LabeledCounter {
    entries: Arc<RwLock<HashMap<LabelKey, Counter>>>,
}

impl LabeledCounter {
    /// Create a new labeled counter
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment by 1 for the given label set
    pub fn inc(&self, labels: &[(&str, &str)]) {
        self.inc_by(labels, 1);
    }

    /// Increment by `n` for the given label set
    pub fn inc_by(&self, labels: &[(&str, &str)], n: u64) {
        let key = label_key(labels);
        {
            let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
            if let Some(counter) = entries.get(&key) {
                counter.inc_by(n);
                return;
            }
        }
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.entry(key).or_default().inc_by(n);
    }

    /// Value for one label set (0 if never touched)
    #[must_use]
    pub fn get(&self, labels: &[(&str, &str)]) -> u64 {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(&label_key(labels)).map_or(0, Counter::get)
    }

    /// All (labels, value) pairs
    #[must_use]
    pub fn entries(&self) -> Vec<(LabelKey, u64)> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries
            .iter()
            .map(|(labels, counter)| (labels.clone(), counter.get()))
            .collect()
    }
}

/// A histogram family keyed by label sets
#[derive(Debug, Clone)]
pub struct LabeledHistogram {
    entries: Arc<RwLock<HashMap<LabelKey, Histogram>>>,
    bounds: Vec<f64>,
}

impl Default for LabeledHistogram {
    fn default() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            bounds: Histogram::new().bounds().to_vec(),
        }
    }
}

impl LabeledHistogram {
    /// Create with default latency buckets
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe a value for the given label set
    pub fn observe(&self, labels: &[(&str, &str)], value: f64) {
        let key = label_key(labels);
        {
            let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
            if let Some(histogram) = entries.get(&key) {
                histogram.observe(value);
                return;
            }
        }
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries
            .entry(key)
            .or_insert_with(|| Histogram::with_buckets(self.bounds.clone()))
            .observe(value);
    }

    /// All (labels, histogram) pairs
    #[must_use]
    pub fn entries(&self) -> Vec<(LabelKey, Histogram)> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries
            .iter()
            .map(|(labels, histogram)| (labels.clone(), histogram.clone()))
            .collect()
    }
}

/// Format labels as `{k="v",k2="v2"}`, empty string for no labels
#[must_use]
pub(super) fn format_labels(labels: &[(String, String)]) -> String {
    if labels.is_empty() {
        return String::new();
    }
    let parts: Vec<String> = labels
        .iter()
        .map(|(k, v)| format!("{k}=\"{v}\""))
        .collect();
    format!("{{{}}}", parts.join(","))
}
