//! Client configuration options.

use std::time::Duration;

use tracing::Level;

use crate::models::DEFAULT_PAGE_SIZE;

/// Configuration for the Developer API client.
///
/// # Example
///
/// ```
/// use enverus_rs::{ClientConfig, RetryConfig};
/// use std::time::Duration;
///
/// let config = ClientConfig::default()
///     .with_timeout(Duration::from_secs(60))
///     .with_retry(RetryConfig::default().with_retries(5).with_backoff_factor(10.0))
///     .with_page_size(10_000);
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Override for the API base URL; defaults to the version's URL
    pub base_url: Option<String>,
    /// Request timeout
    pub timeout: Duration,
    /// User-Agent header value
    pub user_agent: String,
    /// Retry configuration
    pub retry: RetryConfig,
    /// Rows per page when a query does not set its own
    pub page_size: u32,
    /// Install a log subscriber at this level when the client is built
    pub log_level: Option<Level>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_secs(30),
            user_agent: format!("enverus-rs/{} (Rust)", env!("CARGO_PKG_VERSION")),
            retry: RetryConfig::default(),
            page_size: DEFAULT_PAGE_SIZE,
            log_level: None,
        }
    }
}

impl ClientConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Point the client at a different API base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the User-Agent header.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the retry configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Set the default page size.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Print this crate's events at `level` through a `tracing-subscriber` formatter.
    pub fn with_log_level(mut self, level: Level) -> Self {
        self.log_level = Some(level);
        self
    }
}

/// Configuration for retrying transient failures.
///
/// `retries` is the total number of attempts per logical request. After the
/// n-th transient failure the client waits `backoff_factor * 2^(n-1)`
/// seconds, capped at `max_backoff`.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Attempt budget per request (at least one attempt is always made)
    pub retries: u32,
    /// Base delay in seconds
    pub backoff_factor: f64,
    /// Upper bound on a single delay
    pub max_backoff: Duration,
    /// HTTP status codes treated as transient server failures
    pub retry_statuses: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retries: 5,
            backoff_factor: 1.0,
            max_backoff: Duration::from_secs(120),
            retry_statuses: vec![500, 502, 503, 504],
        }
    }
}

impl RetryConfig {
    /// Create a configuration that makes a single attempt.
    pub fn no_retry() -> Self {
        Self {
            retries: 1,
            ..Default::default()
        }
    }

    /// Set the attempt budget.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Set the base delay in seconds.
    pub fn with_backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = factor;
        self
    }

    /// Set the maximum delay.
    pub fn with_max_backoff(mut self, duration: Duration) -> Self {
        self.max_backoff = duration;
        self
    }

    /// Number of attempts actually made.
    pub fn max_attempts(&self) -> u32 {
        self.retries.max(1)
    }

    /// Delay after the given failed attempt (1-based).
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(30) as i32;
        let secs = self.backoff_factor.max(0.0) * 2f64.powi(exponent);
        let max_secs = self.max_backoff.as_secs_f64();
        Duration::from_secs_f64(secs.min(max_secs))
    }

    /// Check if a status code should be retried.
    pub fn should_retry_status(&self, status: u16) -> bool {
        self.retry_statuses.contains(&status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.page_size, 1000);
        assert!(config.base_url.is_none());
        assert!(config.log_level.is_none());
    }

    #[test]
    fn test_retry_backoff() {
        let config = RetryConfig::default().with_backoff_factor(0.5);
        assert_eq!(config.backoff_for_attempt(1), Duration::from_millis(500));
        assert_eq!(config.backoff_for_attempt(2), Duration::from_millis(1000));
        assert_eq!(config.backoff_for_attempt(3), Duration::from_millis(2000));
    }

    #[test]
    fn test_retry_backoff_max() {
        let config = RetryConfig::default()
            .with_backoff_factor(10.0)
            .with_max_backoff(Duration::from_secs(30));

        // 10 * 2^3 = 80, but capped at 30
        assert_eq!(config.backoff_for_attempt(4), Duration::from_secs(30));
    }

    #[test]
    fn test_zero_retries_still_attempts_once() {
        assert_eq!(RetryConfig::default().with_retries(0).max_attempts(), 1);
        assert_eq!(RetryConfig::no_retry().max_attempts(), 1);
        assert_eq!(RetryConfig::default().max_attempts(), 5);
    }

    #[test]
    fn test_should_retry_status() {
        let config = RetryConfig::default();
        assert!(config.should_retry_status(503));
        assert!(!config.should_retry_status(404));
        assert!(!config.should_retry_status(401));
    }
}
