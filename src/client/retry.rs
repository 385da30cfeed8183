//! Bounded retries with exponential backoff.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use super::config::RetryConfig;
use crate::{Error, Result};

/// Runs a request, retrying transient failures.
///
/// Transient means [`Error::is_retryable`]: transport failures, rate
/// limiting, and the configured 5xx statuses. Everything else, including
/// token rejections, is returned immediately.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    /// Create a policy from its configuration.
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// The policy's configuration.
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Call `call` until it succeeds, fails permanently, or the attempt
    /// budget is spent.
    ///
    /// # Errors
    ///
    /// Non-transient errors are returned as-is. When every attempt fails
    /// transiently the last error is wrapped in [`Error::TransientFailure`].
    ///
    /// # Example
    ///
    /// ```
    /// use enverus_rs::client::RetryPolicy;
    /// use enverus_rs::RetryConfig;
    ///
    /// # async fn example() -> enverus_rs::Result<()> {
    /// let policy = RetryPolicy::new(RetryConfig::default().with_retries(3));
    /// let value = policy.execute(|| async { Ok::<_, enverus_rs::Error>(42) }).await?;
    /// assert_eq!(value, 42);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn execute<F, Fut, T>(&self, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.config.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;
            let err = match call().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() => err,
                Err(err) => return Err(err),
            };

            if attempt >= max_attempts {
                return Err(Error::TransientFailure {
                    attempts: attempt,
                    source: Box::new(err),
                });
            }

            let delay = self.delay_after(attempt, &err);
            warn!(
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "transient failure; backing off"
            );
            tokio::time::sleep(delay).await;
        }
    }

    fn delay_after(&self, attempt: u32, err: &Error) -> Duration {
        let backoff = self.config.backoff_for_attempt(attempt);
        match err {
            Error::RateLimited { retry_after_secs } => {
                backoff.max(Duration::from_secs(*retry_after_secs).min(self.config.max_backoff))
            }
            _ => backoff,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy(retries: u32) -> RetryPolicy {
        RetryPolicy::new(
            RetryConfig::default()
                .with_retries(retries)
                .with_backoff_factor(0.0),
        )
    }

    fn unavailable() -> Error {
        Error::Server {
            status: 503,
            message: "unavailable".into(),
        }
    }

    #[tokio::test]
    async fn test_succeeds_after_retries_minus_one_failures() {
        let calls = AtomicU32::new(0);
        let result = policy(4)
            .execute(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n < 4 {
                        Err(unavailable())
                    } else {
                        Ok("rows")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "rows");
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_fails_after_retries_failures() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = policy(3)
            .execute(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(unavailable()) }
            })
            .await;

        match result {
            Err(Error::TransientFailure { attempts, source }) => {
                assert_eq!(attempts, 3);
                assert!(matches!(*source, Error::Server { status: 503, .. }));
            }
            other => panic!("Expected TransientFailure, got {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_transient_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = policy(5)
            .execute(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(Error::TokenRejected { status: 401 }) }
            })
            .await;

        assert!(matches!(result, Err(Error::TokenRejected { status: 401 })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_rate_limit_delay_honours_retry_after() {
        let policy = RetryPolicy::new(RetryConfig::default().with_backoff_factor(1.0));
        let delay = policy.delay_after(1, &Error::RateLimited { retry_after_secs: 7 });
        assert_eq!(delay, Duration::from_secs(7));

        let delay = policy.delay_after(4, &Error::RateLimited { retry_after_secs: 2 });
        assert_eq!(delay, Duration::from_secs(8));
    }
}
