//! Event sink system for observability.
//!
//! Sinks are injected into the cursor and the dispatcher; there is no
//! process-wide sink.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

/// Event type names emitted by this crate.
pub mod types {
    /// A stage was handed out by a cursor.
    pub const CURSOR_ADVANCED: &str = "cursor.advanced";
    /// A cursor answered "no next stage".
    pub const CURSOR_EXHAUSTED: &str = "cursor.exhausted";
    /// Cursor state was found corrupted and converted to exhaustion.
    pub const CURSOR_FAULT: &str = "cursor.fault";
    /// The dispatcher routed a message to a stage.
    pub const DISPATCH_ROUTED: &str = "dispatch.routed";
    /// The dispatcher finished walking a message's itinerary.
    pub const DISPATCH_COMPLETED: &str = "dispatch.completed";
    /// The dispatcher stopped because a stage failed or was unknown.
    pub const DISPATCH_FAILED: &str = "dispatch.failed";
}
