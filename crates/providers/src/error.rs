//! Failure classification for provider calls.
//!
//! Every provider call resolves to image bytes or one of these variants.
//! The variant alone decides what happens next: the retry policy retries
//! [`Transient`](GenerationError::Transient) and
//! [`WarmingUp`](GenerationError::WarmingUp), and gives up immediately on
//! the rest.

use std::time::Duration;

/// Errors returned by image providers and the background remover.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GenerationError {
    /// Missing credentials or a missing prerequisite asset. Never retried.
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    /// Network failure, timeout, throttling or a 5xx response.
    #[error("Transient provider failure: {0}")]
    Transient(String),

    /// The model is cold and being loaded. The provider may estimate how
    /// long that takes.
    #[error("Model is warming up (estimated wait: {})", format_wait(.estimated_wait))]
    WarmingUp { estimated_wait: Option<Duration> },

    /// A 4xx response or an unusable payload. Never retried.
    #[error("Permanent provider failure: {0}")]
    Permanent(String),
}

impl GenerationError {
    /// Whether the retry policy may try again after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::WarmingUp { .. })
    }

    /// Classify a non-success HTTP status.
    ///
    /// 408 and 429 are throttling/timeouts and 5xx are server faults, all
    /// worth retrying; every other status is permanent.
    pub fn from_status(status: u16, body: &str) -> Self {
        let body = truncate(body, 200);
        let message = format!("HTTP {status}: {body}");
        match status {
            408 | 429 | 500..=599 => Self::Transient(message),
            _ => Self::Permanent(message),
        }
    }
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Self::from_status(status.as_u16(), &err.to_string());
        }
        if err.is_decode() || err.is_builder() {
            Self::Permanent(err.to_string())
        } else {
            Self::Transient(err.to_string())
        }
    }
}

fn format_wait(wait: &Option<Duration>) -> String {
    match wait {
        Some(d) => format!("{:.1}s", d.as_secs_f64()),
        None => "unknown".to_string(),
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
