//! Port for structured batch event logging.
//!
//! Defines the [`BatchEventLogger`] trait for recording batch lifecycle and
//! round events to a structured log.
//!
//! This is separate from `tracing`-based operation logs: tracing handles
//! human-readable diagnostic messages, while this port captures what
//! happened to every batch and task in a machine-readable format (JSONL).

use serde_json::Value;

/// A structured batch event for logging.
///
/// Each event has a type string and a JSON payload with event-specific
/// fields. The sink adds the timestamp.
pub struct BatchEvent {
    /// Event type identifier (e.g., "batch_created", "round_completed").
    pub event_type: &'static str,
    /// JSON payload with event-specific data.
    pub payload: Value,
}

impl BatchEvent {
    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }
}

/// Port for logging batch events to a structured log.
///
/// The `log` method is synchronous and non-fallible: a logging failure
/// must never disturb the batch being logged.
pub trait BatchEventLogger: Send + Sync {
    /// Record a batch event.
    fn log(&self, event: BatchEvent);
}

/// No-op implementation for tests and when logging is disabled.
pub struct NoEventLogger;

impl BatchEventLogger for NoEventLogger {
    fn log(&self, _event: BatchEvent) {}
}
