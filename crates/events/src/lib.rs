//! Progress events for the kinetic asset pipeline.
//!
//! This crate provides the log plumbing between the pipeline and whoever
//! is watching it:
//!
//! - [`LogEvent`]: a timestamped, human-readable progress message.
//! - [`LogSink`]: the single interface the pipeline emits into.
//! - [`EventBus`]: in-process fan-out backed by `tokio::sync::broadcast`.
//! - [`LogRelay`]: background task draining a bus subscription into
//!   another sink.
//! - [`TracingSink`] / [`MemorySink`]: sinks for logs and tests.

pub mod bus;
pub mod event;
pub mod relay;
pub mod sink;

pub use bus::EventBus;
pub use event::{LogEvent, LogLevel};
pub use relay::LogRelay;
pub use sink::{LogSink, MemorySink, TracingSink};
