//! Telemetry subscription and metric translation.
//!
//! The underlying client emits a fixed vocabulary of buffering/delivery
//! events. A translator is attached once per resource identifier and maps
//! those events onto named counters and gauges in the [`MetricsSink`].
//!
//! The registration table is an explicit, injectable hub rather than
//! ambient global state, so repeated start/stop cycles deduplicate their
//! subscriptions and tests can scope a fresh hub per run.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::metrics::MetricsSink;

/// Fixed vocabulary of client telemetry events.
pub const TELEMETRY_EVENTS: [&str; 9] = [
    "dropped",
    "dropped_queue_full",
    "queuing",
    "retried",
    "failed",
    "inflight",
    "retried_failed",
    "retried_success",
    "success",
];

/// Tags carried by every telemetry event.
#[derive(Debug, Clone)]
pub struct TelemetryMetadata {
    pub resource_id: String,
    pub partition: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct TelemetryEvent {
    pub name: String,
    pub measurements: HashMap<String, i64>,
    pub metadata: TelemetryMetadata,
}

impl TelemetryEvent {
    pub fn new(name: &str, resource_id: &str, value: i64) -> Self {
        Self {
            name: name.to_string(),
            measurements: HashMap::from([("value".to_string(), value)]),
            metadata: TelemetryMetadata {
                resource_id: resource_id.to_string(),
                partition: None,
            },
        }
    }

    pub fn with_partition(mut self, partition: i32) -> Self {
        self.metadata.partition = Some(partition);
        self
    }

    pub fn value(&self) -> i64 {
        self.measurements.get("value").copied().unwrap_or(0)
    }
}

/// Registration metadata stored with a handler and passed back on dispatch.
#[derive(Debug, Clone)]
pub struct HandlerContext {
    pub resource_id: String,
}

pub type HandlerFn = Arc<dyn Fn(&TelemetryEvent, &HandlerContext) + Send + Sync>;

struct Handler {
    events: HashSet<String>,
    callback: HandlerFn,
    context: HandlerContext,
}

/// Process-wide registration table for telemetry handlers, keyed by
/// handler identifier. Attach and detach are idempotent and atomic per key.
#[derive(Clone, Default)]
pub struct TelemetryHub {
    inner: Arc<Mutex<HashMap<String, Arc<Handler>>>>,
}

impl TelemetryHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler under `handler_id` for the given event names.
    ///
    /// Re-registering under an existing id is a no-op; returns whether a
    /// new registration was inserted.
    pub fn attach(
        &self,
        handler_id: &str,
        event_names: &[&str],
        callback: HandlerFn,
        context: HandlerContext,
    ) -> bool {
        let mut table = self.inner.lock().unwrap();
        if table.contains_key(handler_id) {
            return false;
        }
        table.insert(
            handler_id.to_string(),
            Arc::new(Handler {
                events: event_names.iter().map(|e| e.to_string()).collect(),
                callback,
                context,
            }),
        );
        true
    }

    /// Removes the handler under `handler_id`; removing an unregistered id
    /// is a no-op. Returns whether a registration was removed.
    pub fn detach(&self, handler_id: &str) -> bool {
        self.inner.lock().unwrap().remove(handler_id).is_some()
    }

    pub fn is_attached(&self, handler_id: &str) -> bool {
        self.inner.lock().unwrap().contains_key(handler_id)
    }

    /// Dispatches an event to every handler subscribed to its name.
    pub fn emit(&self, event: &TelemetryEvent) {
        let handlers: Vec<Arc<Handler>> = {
            let table = self.inner.lock().unwrap();
            table
                .values()
                .filter(|h| h.events.contains(&event.name))
                .cloned()
                .collect()
        };
        for handler in handlers {
            (handler.callback)(event, &handler.context);
        }
    }
}

/// Deterministic handler identifier for a resource identifier, so stale
/// registrations can be exactly identified for teardown.
pub fn handler_id(resource_id: &str) -> String {
    format!("kafka-producer-{}", resource_id)
}

/// Attaches the metric translator for `resource_id`. Idempotent.
pub fn install(hub: &TelemetryHub, metrics: Arc<dyn MetricsSink>, resource_id: &str) -> bool {
    let context = HandlerContext {
        resource_id: resource_id.to_string(),
    };
    let callback: HandlerFn =
        Arc::new(move |event, ctx| translate(metrics.as_ref(), event, ctx));
    hub.attach(&handler_id(resource_id), &TELEMETRY_EVENTS, callback, context)
}

/// Detaches the translator for `resource_id`. No-op when not attached.
pub fn uninstall(hub: &TelemetryHub, resource_id: &str) -> bool {
    hub.detach(&handler_id(resource_id))
}

fn translate(metrics: &dyn MetricsSink, event: &TelemetryEvent, ctx: &HandlerContext) {
    // Events tagged for another bridge sharing the process are not ours.
    if event.metadata.resource_id != ctx.resource_id {
        return;
    }

    let id = ctx.resource_id.as_str();
    let value = event.value();
    let partition = event.metadata.partition;

    match event.name.as_str() {
        "dropped" => metrics.counter_inc(id, "dropped", value),
        "dropped_queue_full" => {
            metrics.counter_inc(id, "dropped.queue_full", value);
            // The client emits a duplicate `dropped` alongside every
            // `dropped_queue_full`; net it out so each drop counts once.
            metrics.counter_inc(id, "dropped", -value);
        }
        "queuing" => metrics.gauge_set(id, partition, "queuing", value),
        "inflight" => metrics.gauge_set(id, partition, "inflight", value),
        "retried" => metrics.counter_inc(id, "retried", value),
        "failed" => metrics.counter_inc(id, "failed", value),
        "retried_failed" => metrics.counter_inc(id, "retried.failed", value),
        "retried_success" => metrics.counter_inc(id, "retried.success", value),
        "success" => metrics.counter_inc(id, "success", value),
        other => debug!(event = other, "ignoring unrecognized telemetry event"),
    }
}
