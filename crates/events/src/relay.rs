//! Relay from a bus subscription into another sink.
//!
//! [`LogRelay`] drains a [`broadcast::Receiver`] and re-emits every
//! [`LogEvent`] into a downstream [`LogSink`] (the process log, a
//! WebSocket fan-out, a file). It runs as a background task and stops
//! when the [`EventBus`](crate::bus::EventBus) is dropped.

use tokio::sync::broadcast;

use crate::event::LogEvent;
use crate::sink::LogSink;

/// Background task forwarding bus events to a sink.
pub struct LogRelay;

impl LogRelay {
    /// Run the relay loop until the channel closes.
    ///
    /// Returns the number of events forwarded.
    pub async fn run<S: LogSink + ?Sized>(
        mut receiver: broadcast::Receiver<LogEvent>,
        sink: &S,
    ) -> u64 {
        let mut forwarded = 0;
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    sink.emit(event);
                    forwarded += 1;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Log relay lagged, some events were dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::debug!(forwarded, "Event bus closed, log relay shutting down");
                    break;
                }
            }
        }
        forwarded
    }
}
