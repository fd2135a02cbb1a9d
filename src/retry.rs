//! Exponential backoff with jitter for upstream API calls.
//!
//! [`RetryPolicy`] computes `min(base * 2^attempt + jitter, max)` and drives a retry
//! loop around any fallible async operation. Whether an error is worth another
//! attempt is decided by a caller-supplied classify function, so the same driver
//! serves every upstream endpoint.

use crate::config::{
    UPSTREAM_INITIAL_BACKOFF_SECS, UPSTREAM_MAX_BACKOFF_SECS, UPSTREAM_MAX_RETRIES,
};
use async_trait::async_trait;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// What the retry driver should do with a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Transient failure: back off and try again
    Retry,
    /// Permanent failure: return the error immediately
    Abort,
}

/// Terminal outcome of a retried operation
#[derive(Debug, Clone, Error)]
pub enum RetryError<E> {
    /// The operation failed with an error classified as non-retryable
    #[error("non-retryable failure: {0}")]
    Aborted(E),
    /// Every allowed attempt failed with a retryable error
    #[error("retries exhausted after {attempts} attempts: {last}")]
    Exhausted {
        /// Number of attempts made
        attempts: u32,
        /// Error returned by the final attempt
        last: E,
    },
}

impl<E> RetryError<E> {
    /// The error that ended the loop.
    pub const fn last_error(&self) -> &E {
        match self {
            Self::Aborted(e) | Self::Exhausted { last: e, .. } => e,
        }
    }
}

/// One failed attempt that is about to be retried
#[derive(Debug)]
pub struct RetryAttempt<'a, E> {
    /// 1-based number of the attempt that just failed
    pub attempt_number: u32,
    /// Pause before the next attempt
    pub delay_before_next: Duration,
    /// Why the attempt failed
    pub error: &'a E,
}

/// Hook invoked before each backoff sleep
#[async_trait]
pub trait RetryObserver<E: Sync>: Send + Sync {
    /// Called after a retryable failure, before sleeping.
    async fn on_retry(&self, attempt: &RetryAttempt<'_, E>);
}

/// Observer that does nothing
pub struct NoopObserver;

#[async_trait]
impl<E: Sync> RetryObserver<E> for NoopObserver {
    async fn on_retry(&self, _attempt: &RetryAttempt<'_, E>) {}
}

/// Uniform random jitter in `[0, 1s)`.
#[must_use]
pub fn default_jitter() -> Duration {
    tokio_retry::strategy::jitter(Duration::from_secs(1))
}

/// Jitter source that always returns zero.
#[must_use]
pub const fn no_jitter() -> Duration {
    Duration::ZERO
}

/// Backoff parameters and retry-loop driver
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    jitter: fn() -> Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(UPSTREAM_INITIAL_BACKOFF_SECS),
            Duration::from_secs(UPSTREAM_MAX_BACKOFF_SECS),
        )
    }
}

impl RetryPolicy {
    /// Create a policy with [`UPSTREAM_MAX_RETRIES`] attempts and random jitter.
    #[must_use]
    pub const fn new(base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: UPSTREAM_MAX_RETRIES,
            base_delay,
            max_delay,
            jitter: default_jitter,
        }
    }

    /// Lower the attempt count. Values are clamped to `1..=UPSTREAM_MAX_RETRIES`;
    /// the ceiling cannot be raised.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.clamp(1, UPSTREAM_MAX_RETRIES);
        self
    }

    /// Replace the jitter source.
    #[must_use]
    pub const fn with_jitter(mut self, jitter: fn() -> Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Policy with no delays at all, for tests and local tooling.
    #[must_use]
    pub const fn immediate() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO).with_jitter(no_jitter)
    }

    /// Attempts allowed per call.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Upper bound of [`RetryPolicy::delay`].
    #[must_use]
    pub const fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Pause after the attempt with 0-based index `attempt_index`.
    ///
    /// # Examples
    ///
    /// ```
    /// use relay_chat_bot::retry::{no_jitter, RetryPolicy};
    /// use std::time::Duration;
    ///
    /// let policy = RetryPolicy::new(Duration::from_secs(1), Duration::from_secs(30))
    ///     .with_jitter(no_jitter);
    /// assert_eq!(policy.delay(0), Duration::from_secs(1));
    /// assert_eq!(policy.delay(3), Duration::from_secs(8));
    /// assert_eq!(policy.delay(10), Duration::from_secs(30));
    /// ```
    #[must_use]
    pub fn delay(&self, attempt_index: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt_index).unwrap_or(u32::MAX);
        let exponential = self
            .base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay);
        exponential
            .saturating_add((self.jitter)())
            .min(self.max_delay)
    }

    /// Run `operation` until it succeeds, fails with an error that `classify` marks
    /// as [`Disposition::Abort`], or the attempts run out.
    ///
    /// `observer` is notified before every backoff sleep.
    ///
    /// # Errors
    ///
    /// Returns [`RetryError::Aborted`] for a non-retryable failure and
    /// [`RetryError::Exhausted`] with the last error once all attempts failed.
    pub async fn run<T, E, F, Fut, C>(
        &self,
        mut operation: F,
        classify: C,
        observer: &dyn RetryObserver<E>,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send,
        C: Fn(&E) -> Disposition + Send + Sync,
        E: Display + Send + Sync,
        T: Send,
    {
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            let error = match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        info!(attempt, "Upstream call succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) => e,
            };

            if classify(&error) == Disposition::Abort {
                warn!(attempt, error = %error, "Upstream call failed with non-retryable error");
                return Err(RetryError::Aborted(error));
            }

            if attempt >= self.max_attempts {
                warn!(
                    attempts = attempt,
                    error = %error,
                    "Upstream call failed, all attempts exhausted"
                );
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last: error,
                });
            }

            let delay = self.delay(attempt - 1);
            info!(
                attempt,
                max_attempts = self.max_attempts,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %error,
                "Retrying upstream call"
            );

            observer
                .on_retry(&RetryAttempt {
                    attempt_number: attempt,
                    delay_before_next: delay,
                    error: &error,
                })
                .await;

            tokio::time::sleep(delay).await;
            debug!(attempt = attempt + 1, "Backoff elapsed");
        }
    }
}
