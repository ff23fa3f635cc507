//! Bounded retry for provider calls.
//!
//! Two policies share one loop ([`with_retry`]):
//!
//! - **Exponential** (image generation): wait `unit * 2^n` after the
//!   n-th failure (0-based), clamped to [`RetryPolicy::max_delay`].
//! - **Provider-hinted** (background removal): a
//!   [`WarmingUp`](GenerationError::WarmingUp) failure waits the
//!   provider's estimate (or a default); any other transient failure waits
//!   a fixed delay.
//!
//! Both count every attempt against the same ceiling. Unavailable and
//! permanent failures end the loop immediately. There is no wait after
//! the last attempt.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::GenerationError;

// ---------------------------------------------------------------------------
// Sleeper
// ---------------------------------------------------------------------------

/// Source of backoff waits. Production uses [`TokioSleeper`]; tests swap
/// in a recorder so wait sequences can be asserted without sleeping.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// How the wait between attempts is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// `unit * 2^n` after the n-th failure.
    Exponential { unit: Duration },
    /// Provider estimate for warm-ups, `error_delay` for everything else.
    ProviderHinted {
        error_delay: Duration,
        default_warmup: Duration,
    },
}

/// Tunable parameters for a retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first. Treated as at least 1.
    pub max_attempts: u32,
    pub backoff: Backoff,
    /// Upper bound on any single wait.
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Generation default: 3 attempts, 1s doubling, capped at 30s.
    pub fn generation() -> Self {
        Self {
            max_attempts: 3,
            backoff: Backoff::Exponential {
                unit: Duration::from_secs(1),
            },
            max_delay: Duration::from_secs(30),
        }
    }

    /// Background-removal default: 5 attempts, warm-ups wait the
    /// provider's estimate (10s if none), errors wait 2s, capped at 120s.
    pub fn background_removal() -> Self {
        Self {
            max_attempts: 5,
            backoff: Backoff::ProviderHinted {
                error_delay: Duration::from_secs(2),
                default_warmup: Duration::from_secs(10),
            },
            max_delay: Duration::from_secs(120),
        }
    }

    /// Wait before the next attempt, after failure number `failure_index`
    /// (0-based) with `error`.
    pub fn delay_for(&self, failure_index: u32, error: &GenerationError) -> Duration {
        let delay = match self.backoff {
            Backoff::Exponential { unit } => exponential_delay(unit, failure_index),
            Backoff::ProviderHinted {
                error_delay,
                default_warmup,
            } => match error {
                GenerationError::WarmingUp { estimated_wait } => {
                    estimated_wait.unwrap_or(default_warmup)
                }
                _ => error_delay,
            },
        };
        delay.min(self.max_delay)
    }
}

/// `unit * 2^exponent`, saturating instead of overflowing.
pub fn exponential_delay(unit: Duration, exponent: u32) -> Duration {
    let factor = 2u32.checked_pow(exponent).unwrap_or(u32::MAX);
    unit.saturating_mul(factor)
}

// ---------------------------------------------------------------------------
// Loop
// ---------------------------------------------------------------------------

/// Describes an upcoming wait, handed to the observer before sleeping.
#[derive(Debug)]
pub struct RetryWait<'a> {
    /// 1-based number of the attempt that just failed.
    pub attempt: u32,
    pub max_attempts: u32,
    pub delay: Duration,
    pub error: &'a GenerationError,
}

/// The retry budget ran out, or a non-retryable failure ended the loop.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("gave up after {attempts} attempt(s): {last_error}")]
pub struct RetryExhausted {
    pub attempts: u32,
    pub last_error: GenerationError,
}

/// Run `op` under `policy`.
///
/// `op` receives the 1-based attempt number. `on_wait` is called before
/// every backoff sleep so callers can report it.
pub async fn with_retry<T, F, Fut, W>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    mut on_wait: W,
    mut op: F,
) -> Result<T, RetryExhausted>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, GenerationError>>,
    W: FnMut(&RetryWait<'_>),
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        let error = match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        if !error.is_retryable() || attempt >= max_attempts {
            tracing::debug!(attempt, error = %error, "Giving up");
            return Err(RetryExhausted {
                attempts: attempt,
                last_error: error,
            });
        }

        let delay = policy.delay_for(attempt - 1, &error);
        tracing::debug!(
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "Attempt failed, backing off",
        );
        on_wait(&RetryWait {
            attempt,
            max_attempts,
            delay,
            error: &error,
        });
        sleeper.sleep(delay).await;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
