//! Exponential backoff for source fetches and sink calls.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tp_config::SyncConfig;
use tp_sink::SinkError;
use tp_source::SourceError;

/// Errors a [`RetryPolicy`] knows how to judge.
pub trait Retryable: Display {
    /// Whether repeating the same call may succeed.
    fn is_transient(&self) -> bool;

    /// Wait the remote end asked for before the next attempt.
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

impl Retryable for SinkError {
    fn is_transient(&self) -> bool {
        Self::is_transient(self)
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after_secs } => Some(Duration::from_secs(*retry_after_secs)),
            _ => None,
        }
    }
}

impl Retryable for SourceError {
    fn is_transient(&self) -> bool {
        Self::is_transient(self)
    }
}

/// How often, and how patiently, a failing call is repeated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts including the first. Always at least 1.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

/// The last error of a call that did not succeed, and how many attempts
/// were made before giving up.
#[derive(Debug)]
pub struct Exhausted<E = SinkError> {
    pub error: E,
    pub attempts: u32,
}

impl RetryPolicy {
    #[must_use]
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }

    /// A single attempt, no retries.
    #[must_use]
    pub const fn once() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay after failed attempt number `attempt` (1-based): the base delay
    /// doubled per earlier attempt, capped at `max_delay`.
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let base_ms = u64::try_from(self.base_delay.as_millis()).unwrap_or(u64::MAX);
        let max_ms = u64::try_from(self.max_delay.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(base_ms.saturating_mul(2_u64.saturating_pow(exponent)).min(max_ms))
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    ///
    /// Only transient errors are retried. Every failed attempt is logged at
    /// `warn` with `scope` and its attempt number.
    ///
    /// # Errors
    ///
    /// Returns [`Exhausted`] with the last error once no further attempt
    /// will be made.
    pub async fn run<T, E, F, Fut>(&self, scope: &str, mut op: F) -> Result<T, Exhausted<E>>
    where
        E: Retryable,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!(scope, attempt, "succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(error) => {
                    let retryable = error.is_transient();
                    tracing::warn!(
                        scope,
                        attempt,
                        max_attempts = self.max_attempts,
                        retryable,
                        error = %error,
                        "call failed"
                    );
                    if !retryable || attempt >= self.max_attempts {
                        return Err(Exhausted {
                            error,
                            attempts: attempt,
                        });
                    }
                    let delay = error.retry_after().map_or_else(
                        || self.delay_after(attempt),
                        |wait| wait.min(self.max_delay),
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        }
    }

    fn transient() -> SinkError {
        SinkError::Transport("connection reset".into())
    }

    #[test]
    fn delay_doubles_then_caps() {
        let policy = RetryPolicy::from_config(&SyncConfig::default());
        assert_eq!(policy.delay_after(1), Duration::from_millis(250));
        assert_eq!(policy.delay_after(2), Duration::from_millis(500));
        assert_eq!(policy.delay_after(3), Duration::from_millis(1_000));
        assert_eq!(policy.delay_after(10), Duration::from_millis(8_000));
        assert_eq!(policy.delay_after(64), Duration::from_millis(8_000));
    }

    #[tokio::test]
    async fn transient_errors_are_retried_until_success() {
        let calls = AtomicU32::new(0);
        let result = fast(3)
            .run("test", || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(transient())
                } else {
                    Ok("done")
                }
            })
            .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retries_stop_at_the_ceiling() {
        let calls = AtomicU32::new(0);
        let err = fast(3)
            .run("test", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(transient())
            })
            .await
            .unwrap_err();
        assert_eq!(err.attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let err = fast(5)
            .run("test", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(SinkError::Api {
                    status: 409,
                    message: "duplicate".into(),
                })
            })
            .await
            .unwrap_err();
        assert_eq!(err.attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unavailable_source_is_retried_but_rejection_is_not() {
        let calls = AtomicU32::new(0);
        let records = fast(3)
            .run("company", || async {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(SourceError::Unavailable("connection reset by peer".into()))
                } else {
                    Ok(vec!["Acme Traders"])
                }
            })
            .await
            .unwrap();
        assert_eq!(records, vec!["Acme Traders"]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let err = fast(3)
            .run("company", || async {
                Err::<(), _>(SourceError::Rejected("unknown company".into()))
            })
            .await
            .unwrap_err();
        assert_eq!(err.attempts, 1);
    }

    #[test]
    fn rate_limit_wait_comes_from_the_sink() {
        let limited = SinkError::RateLimited { retry_after_secs: 2 };
        assert_eq!(Retryable::retry_after(&limited), Some(Duration::from_secs(2)));
        assert_eq!(Retryable::retry_after(&transient()), None);
    }
}
