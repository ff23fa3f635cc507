//! The progress event envelope.

use std::fmt;

use chrono::Utc;
use kinetic_core::types::Timestamp;
use serde::{Deserialize, Serialize};

/// Severity of a [`LogEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// A single progress message emitted by the pipeline.
///
/// Constructed via [`LogEvent::info`], [`LogEvent::warn`] or
/// [`LogEvent::error`] and optionally tagged with the asset it concerns
/// via [`with_asset`](LogEvent::with_asset).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    pub level: LogLevel,

    /// Human-readable message, without timestamp.
    pub message: String,

    /// Asset id the message is about, if any.
    pub asset_id: Option<String>,

    /// When the event was created (UTC).
    pub timestamp: Timestamp,
}

impl LogEvent {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            asset_id: None,
            timestamp: Utc::now(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Info, message)
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Warn, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Error, message)
    }

    /// Attach the asset this event is about.
    pub fn with_asset(mut self, asset_id: impl Into<String>) -> Self {
        self.asset_id = Some(asset_id.into());
        self
    }
}

/// Renders as `[HH:MM:SS] message`, the format shown to viewers.
impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.timestamp.format("%H:%M:%S"), self.message)
    }
}
