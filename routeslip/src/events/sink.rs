//! Event sink trait and implementations.

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, info, warn, Level};

/// A recorded event: type plus optional JSON payload.
pub type RecordedEvent = (String, Option<serde_json::Value>);

/// Trait for event sinks that can receive events.
///
/// Cursors and dispatchers report what they hand out, what they route and
/// what goes wrong through a sink.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Emits an event asynchronously.
    ///
    /// # Arguments
    ///
    /// * `event_type` - The type of event (e.g., "cursor.advanced")
    /// * `data` - Optional event data
    async fn emit(&self, event_type: &str, data: Option<serde_json::Value>);

    /// Emits an event without awaiting.
    ///
    /// Must never panic; the cursor calls this on its hot path.
    fn try_emit(&self, event_type: &str, data: Option<serde_json::Value>);
}

/// Discards every event. The default sink for cursors and dispatchers.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event_type: &str, _data: Option<serde_json::Value>) {}

    fn try_emit(&self, _event_type: &str, _data: Option<serde_json::Value>) {}
}

/// Forwards events to `tracing`.
///
/// Fault events (`*.fault`, `*.failed`) are always logged at WARN regardless
/// of the configured level.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingEventSink {
    /// Creates a logging sink with the specified level.
    #[must_use]
    pub const fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub const fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    fn log_event(&self, event_type: &str, data: Option<&serde_json::Value>) {
        if event_type.ends_with(".fault") || event_type.ends_with(".failed") {
            warn!(event_type = %event_type, event_data = ?data, "routeslip event");
        } else if self.level == Level::DEBUG || self.level == Level::TRACE {
            debug!(event_type = %event_type, event_data = ?data, "routeslip event");
        } else {
            info!(event_type = %event_type, event_data = ?data, "routeslip event");
        }
    }
}

#[async_trait]
impl EventSink for LoggingEventSink {
    async fn emit(&self, event_type: &str, data: Option<serde_json::Value>) {
        self.log_event(event_type, data.as_ref());
    }

    fn try_emit(&self, event_type: &str, data: Option<serde_json::Value>) {
        self.log_event(event_type, data.as_ref());
    }
}

/// Keeps every event in memory, for tests.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: RwLock<Vec<RecordedEvent>>,
}

impl CollectingEventSink {
    /// Creates an empty collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.read().clone()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Counts events of exactly this type.
    #[must_use]
    pub fn count(&self, event_type: &str) -> usize {
        self.events
            .read()
            .iter()
            .filter(|(t, _)| t == event_type)
            .count()
    }

    /// Returns events whose type starts with the prefix.
    #[must_use]
    pub fn events_of_type(&self, type_prefix: &str) -> Vec<RecordedEvent> {
        self.events
            .read()
            .iter()
            .filter(|(t, _)| t.starts_with(type_prefix))
            .cloned()
            .collect()
    }

    /// Clears all collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }
}

#[async_trait]
impl EventSink for CollectingEventSink {
    async fn emit(&self, event_type: &str, data: Option<serde_json::Value>) {
        self.try_emit(event_type, data);
    }

    fn try_emit(&self, event_type: &str, data: Option<serde_json::Value>) {
        self.events.write().push((event_type.to_string(), data));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_sink() {
        let sink = NoOpEventSink;
        sink.emit("cursor.advanced", None).await;
        sink.try_emit("cursor.fault", Some(serde_json::json!({"cursor": 9})));
    }

    #[tokio::test]
    async fn test_logging_sink_handles_every_level() {
        for sink in [LoggingEventSink::default(), LoggingEventSink::debug()] {
            sink.emit("cursor.advanced", Some(serde_json::json!({"stage": "a"}))).await;
            sink.try_emit("dispatch.failed", None);
        }
    }

    #[tokio::test]
    async fn test_collecting_sink() {
        let sink = CollectingEventSink::new();
        assert!(sink.is_empty());

        sink.emit("cursor.advanced", None).await;
        sink.try_emit("cursor.exhausted", Some(serde_json::json!({"request_id": "r"})));

        assert_eq!(sink.len(), 2);
        let events = sink.events();
        assert_eq!(events[0].0, "cursor.advanced");
        assert_eq!(events[1].1.as_ref().unwrap()["request_id"], "r");
    }

    #[tokio::test]
    async fn test_collecting_sink_filter() {
        let sink = CollectingEventSink::new();
        sink.emit("cursor.advanced", None).await;
        sink.emit("cursor.advanced", None).await;
        sink.emit("cursor.exhausted", None).await;
        sink.emit("dispatch.routed", None).await;

        assert_eq!(sink.events_of_type("cursor.").len(), 3);
        assert_eq!(sink.count("cursor.advanced"), 2);
        assert_eq!(sink.count("dispatch.routed"), 1);

        sink.clear();
        assert!(sink.is_empty());
    }
}
