//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] fans every [`LogEvent`] out to any number of viewers. It
//! is designed to be shared via `Arc<EventBus>` and injected into the
//! pipeline as its [`LogSink`].

use tokio::sync::broadcast;

use crate::event::LogEvent;
use crate::sink::LogSink;

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// A single publisher's events are delivered to every subscriber in
/// publication order.
///
/// # Usage
///
/// ```rust
/// use kinetic_events::{EventBus, LogEvent, LogSink};
///
/// let bus = EventBus::default();
/// let _rx = bus.subscribe();
///
/// bus.emit(LogEvent::info("Starting asset generation..."));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<LogEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped.
    pub fn publish(&self, event: LogEvent) {
        // A SendError only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<LogEvent> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl LogSink for EventBus {
    fn emit(&self, event: LogEvent) {
        self.publish(event);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
