//! Metrics sink collaborator.
//!
//! The bridge only ever writes metrics; storage and export belong to the
//! embedding system. [`InMemoryMetrics`] is the bundled implementation,
//! used by the binary's shutdown summary and by tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

/// Write-only counter/gauge store addressed by resource identifier.
pub trait MetricsSink: Send + Sync {
    fn counter_inc(&self, resource_id: &str, metric: &str, delta: i64);

    /// Gauges are additionally keyed by partition.
    fn gauge_set(&self, resource_id: &str, partition: Option<i32>, metric: &str, value: i64);
}

#[derive(Default)]
pub struct InMemoryMetrics {
    counters: Mutex<HashMap<(String, String), i64>>,
    gauges: Mutex<HashMap<(String, String, Option<i32>), i64>>,
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counter_value(&self, resource_id: &str, metric: &str) -> i64 {
        self.counters
            .lock()
            .unwrap()
            .get(&(resource_id.to_string(), metric.to_string()))
            .copied()
            .unwrap_or(0)
    }

    pub fn gauge_value(&self, resource_id: &str, partition: Option<i32>, metric: &str) -> Option<i64> {
        self.gauges
            .lock()
            .unwrap()
            .get(&(resource_id.to_string(), metric.to_string(), partition))
            .copied()
    }

    /// Sorted view of all recorded values, for logging and assertions.
    pub fn snapshot(&self) -> BTreeMap<String, i64> {
        let mut out = BTreeMap::new();
        for ((id, metric), value) in self.counters.lock().unwrap().iter() {
            out.insert(format!("{}/{}", id, metric), *value);
        }
        for ((id, metric, partition), value) in self.gauges.lock().unwrap().iter() {
            let key = match partition {
                Some(p) => format!("{}/{}@{}", id, metric, p),
                None => format!("{}/{}", id, metric),
            };
            out.insert(key, *value);
        }
        out
    }
}

impl MetricsSink for InMemoryMetrics {
    fn counter_inc(&self, resource_id: &str, metric: &str, delta: i64) {
        *self
            .counters
            .lock()
            .unwrap()
            .entry((resource_id.to_string(), metric.to_string()))
            .or_insert(0) += delta;
    }

    fn gauge_set(&self, resource_id: &str, partition: Option<i32>, metric: &str, value: i64) {
        self.gauges
            .lock()
            .unwrap()
            .insert((resource_id.to_string(), metric.to_string(), partition), value);
    }
}
