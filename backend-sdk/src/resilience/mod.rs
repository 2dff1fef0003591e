//! Resilience patterns for analysis backend calls
//!
//! This module composes the patterns every backend invocation passes
//! through:
//! - Circuit breaker (fail fast while a backend is down)
//! - Retry with exponential backoff for recoverable errors
//! - Per-call timeout
//! - Local rate-limit budget
//!
//! `GuardedBackend` is the facade the orchestration layer talks to.

mod circuit_breaker;
mod retry;

pub use circuit_breaker::{CallMetrics, CircuitBreaker, CircuitState};
pub use retry::{RetryConfig, RetryExecutor};

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::backend::{AnalysisBackend, AnalysisContent, BackendAnalysis, BackendIdentity};
use crate::config::BackendConfiguration;
use crate::error::{BackendError, Result};

/// Sliding-window rate limiter for one backend's local call budget
#[derive(Debug)]
pub struct RateLimiter {
    per_minute: u32,
    per_hour: u32,
    calls: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(per_minute: u32, per_hour: u32) -> Self {
        Self {
            per_minute,
            per_hour,
            calls: Mutex::new(VecDeque::new()),
        }
    }

    /// Claim one slot of the budget, or fail fast with `RateLimited`
    pub fn acquire(&self) -> Result<()> {
        let now = Instant::now();
        let mut calls = self.calls.lock().unwrap();
        while let Some(oldest) = calls.front() {
            if now.duration_since(*oldest) > Duration::from_secs(3600) {
                calls.pop_front();
            } else {
                break;
            }
        }
        if calls.len() >= self.per_hour as usize {
            return Err(BackendError::rate_limited(format!(
                "Hourly budget of {} requests exhausted",
                self.per_hour
            )));
        }
        let last_minute = calls
            .iter()
            .rev()
            .take_while(|t| now.duration_since(**t) <= Duration::from_secs(60))
            .count();
        if last_minute >= self.per_minute as usize {
            return Err(BackendError::rate_limited(format!(
                "Per-minute budget of {} requests exhausted",
                self.per_minute
            )));
        }
        calls.push_back(now);
        Ok(())
    }
}

/// One analysis backend wrapped with its full resilience stack
///
/// The circuit breaker state is shared across all jobs routed to this
/// backend: every caller holds the same `Arc<GuardedBackend>`.
pub struct GuardedBackend {
    backend: Arc<dyn AnalysisBackend>,
    breaker: CircuitBreaker,
    retry: RetryExecutor,
    limiter: RateLimiter,
    timeout: Duration,
}

impl GuardedBackend {
    /// Wrap a backend using its configuration
    pub fn new(backend: Arc<dyn AnalysisBackend>, config: &BackendConfiguration) -> Self {
        let identity = backend.identity();
        Self {
            backend,
            breaker: CircuitBreaker::new(identity.to_string(), config.circuit_breaker.clone()),
            retry: RetryExecutor::new(RetryConfig {
                max_retries: config.max_retries,
                ..RetryConfig::default()
            }),
            limiter: RateLimiter::new(config.requests_per_minute, config.requests_per_hour),
            timeout: config.timeout,
        }
    }

    /// The wrapped backend's identity
    pub fn identity(&self) -> BackendIdentity {
        self.backend.identity()
    }

    /// The wrapped backend's declared duration hint
    pub fn estimated_duration(&self) -> Duration {
        self.backend.estimated_duration()
    }

    /// Current circuit state
    pub fn circuit_state(&self) -> CircuitState {
        self.breaker.state()
    }

    /// Snapshot of the call metrics record
    pub fn metrics(&self) -> CallMetrics {
        self.breaker.metrics()
    }

    /// Invoke the backend through the full resilience stack
    pub async fn analyze(&self, content: &AnalysisContent) -> Result<BackendAnalysis> {
        self.retry.execute(|| self.attempt(content)).await
    }

    async fn attempt(&self, content: &AnalysisContent) -> Result<BackendAnalysis> {
        // Budget first: a rate-limit rejection must not leave a half-open
        // probe slot claimed.
        self.limiter.acquire()?;
        self.breaker.check()?;

        let started = Instant::now();
        let outcome = tokio::time::timeout(self.timeout, self.backend.analyze(content)).await;
        let latency = started.elapsed();

        match outcome {
            Ok(Ok(result)) => {
                self.breaker.record_success(latency);
                Ok(result)
            }
            Ok(Err(err)) => {
                self.breaker.record_failure(latency);
                Err(err)
            }
            Err(_) => {
                // A timeout is treated identically to a backend failure
                self.breaker.record_failure(latency);
                Err(BackendError::timeout(format!(
                    "Backend {} call exceeded {}ms",
                    self.identity(),
                    self.timeout.as_millis()
                )))
            }
        }
    }
}

// The wrapped backend is a trait object, so spell the identity out instead
impl fmt::Debug for GuardedBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardedBackend")
            .field("backend", &self.backend.identity())
            .field("circuit_state", &self.breaker.state())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
