//! The [`LogSink`] interface and simple sinks.

use std::sync::{Arc, Mutex};

use crate::event::{LogEvent, LogLevel};

/// Receives ordered progress events from the pipeline.
///
/// Implementations must be cheap and non-blocking: `emit` is called
/// inline from the pipeline's own task, between provider calls.
pub trait LogSink: Send + Sync {
    fn emit(&self, event: LogEvent);
}

impl<T: LogSink + ?Sized> LogSink for Arc<T> {
    fn emit(&self, event: LogEvent) {
        (**self).emit(event)
    }
}

// ---------------------------------------------------------------------------
// TracingSink
// ---------------------------------------------------------------------------

/// Forwards events to `tracing` at the matching level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn emit(&self, event: LogEvent) {
        let asset_id = event.asset_id.as_deref().unwrap_or("-");
        match event.level {
            LogLevel::Info => tracing::info!(asset_id, "{}", event.message),
            LogLevel::Warn => tracing::warn!(asset_id, "{}", event.message),
            LogLevel::Error => tracing::error!(asset_id, "{}", event.message),
        }
    }
}

// ---------------------------------------------------------------------------
// MemorySink
// ---------------------------------------------------------------------------

/// Collects events in memory, in emission order.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<LogEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything emitted so far.
    pub fn events(&self) -> Vec<LogEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Just the messages, for concise assertions.
    pub fn messages(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.message).collect()
    }
}

impl LogSink for MemorySink {
    fn emit(&self, event: LogEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
