//! Retry with exponential backoff for recoverable backend errors
//!
//! Retrying is the adapter's concern: the orchestrator never re-runs a
//! failed backend invocation on its own.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::error::Result;

/// Retry policy configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (0 means no retries)
    pub max_retries: u32,

    /// Initial backoff duration
    pub initial_interval: Duration,

    /// Maximum backoff duration
    pub max_interval: Duration,

    /// Multiplier for backoff between retries
    pub multiplier: f64,

    /// Random jitter factor added to each backoff interval (0.0..1.0)
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_interval: Duration::from_millis(200),
            max_interval: Duration::from_secs(5),
            multiplier: 2.0,
            jitter: 0.2,
        }
    }
}

/// Executor for retry operations with exponential backoff
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    config: RetryConfig,
}

impl RetryExecutor {
    /// Create a new retry executor with the specified configuration
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Execute a fallible operation, retrying retryable errors
    pub async fn execute<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempts = 0;
        let mut interval = self.config.initial_interval;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempts < self.config.max_retries => {
                    let backoff = self.with_jitter(interval);
                    log::warn!(
                        "Backend call failed with retryable error, retrying in {:?} (attempt {}/{}): {}",
                        backoff,
                        attempts + 1,
                        self.config.max_retries,
                        err
                    );
                    tokio::time::sleep(backoff).await;
                    attempts += 1;
                    interval = interval.mul_f64(self.config.multiplier).min(self.config.max_interval);
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn with_jitter(&self, interval: Duration) -> Duration {
        if self.config.jitter <= 0.0 {
            return interval;
        }
        let factor = rand::thread_rng().gen_range(0.0..self.config.jitter);
        interval.mul_f64(1.0 + factor)
    }

    /// Get the current retry configuration
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }
}
