//! Exponential backoff for fallible async operations, driven by a rate-limit signal.
//!
//! Only failures classified as rate-limited are retried; anything else returns at once.
//! The wait between attempts is `min(base_delay_ms * 2^retry, max_delay_ms)` where `retry`
//! counts from 0 for the first retry. Waiting uses `tokio::time::sleep`, so other tasks keep
//! running while a call backs off.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Classifies a failure for the retrier.
pub trait RetryClassify {
    /// True when the failure is upstream throttling (HTTP 429 or equivalent).
    fn is_rate_limited(&self) -> bool;
}

/// Retry configuration. Pure data; each call to [`retry`] reads it and nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Values below 1 are treated as 1.
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 8_000,
        }
    }
}

impl RetryPolicy {
    /// Policy with `max_attempts` and the default delays.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Sets base and cap for the backoff delay.
    pub fn with_delays(mut self, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        self.base_delay_ms = base_delay_ms;
        self.max_delay_ms = max_delay_ms;
        self
    }

    /// Delay before retry number `retry` (0-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u64.checked_pow(retry).unwrap_or(u64::MAX);
        let ms = self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms);
        Duration::from_millis(ms)
    }
}

/// Outcome of a failed [`retry`].
#[derive(Debug)]
pub enum RetryError<E> {
    /// Every attempt was rate-limited; carries the last failure.
    Exhausted { attempts: u32, last: E },
    /// A failure that is not retried, returned from the attempt that produced it.
    Fatal(E),
}

impl<E> RetryError<E> {
    /// The underlying failure.
    pub fn into_inner(self) -> E {
        match self {
            Self::Exhausted { last, .. } => last,
            Self::Fatal(e) => e,
        }
    }
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted { attempts, last } => {
                write!(f, "retries exhausted after {} attempts: {}", attempts, last)
            }
            Self::Fatal(e) => write!(f, "{}", e),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for RetryError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Exhausted { last, .. } => Some(last),
            Self::Fatal(e) => e.source(),
        }
    }
}

/// Runs `operation` until it succeeds, fails with a non-rate-limit error, or attempts run out.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, operation: F) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: RetryClassify + fmt::Display,
{
    retry_notify(policy, operation, |_, _| {}).await
}

/// Same as [`retry`], calling `notify(attempt, delay)` before each backoff sleep.
pub async fn retry_notify<T, E, F, Fut, N>(
    policy: &RetryPolicy,
    mut operation: F,
    mut notify: N,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: RetryClassify + fmt::Display,
    N: FnMut(u32, Duration),
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_rate_limited() => return Err(RetryError::Fatal(e)),
            Err(e) if attempt >= max_attempts => {
                warn!(attempts = attempt, error = %e, "Rate limited; retries exhausted");
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last: e,
                });
            }
            Err(e) => {
                let delay = policy.delay_for(attempt - 1);
                debug!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Rate limited; backing off"
                );
                notify(attempt, delay);
                tokio::time::sleep(delay).await;
            }
        }
    }
}
