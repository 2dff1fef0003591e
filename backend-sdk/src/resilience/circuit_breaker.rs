//! Circuit breaker implementation for failing analysis backends
//!
//! Wraps a single backend. After enough failures inside the monitoring
//! window the circuit opens and calls fail fast; after the reset timeout a
//! single probe call decides whether the backend has recovered.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::CircuitBreakerConfig;
use crate::error::{BackendError, Result};

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation, calls pass through
    Closed,
    /// Failing, calls rejected without reaching the backend
    Open,
    /// Testing recovery, exactly one probe call allowed
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "CLOSED"),
            CircuitState::Open => write!(f, "OPEN"),
            CircuitState::HalfOpen => write!(f, "HALF-OPEN"),
        }
    }
}

/// Per-call metrics, updated on every completed backend call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallMetrics {
    pub total_calls: u64,
    pub successful_calls: u64,
    pub failed_calls: u64,
    /// Rolling average call latency in milliseconds
    pub average_latency_ms: f64,
    pub last_call_at: Option<DateTime<Utc>>,
    /// Success rate is at least 80%
    pub healthy: bool,
}

impl Default for CallMetrics {
    fn default() -> Self {
        Self {
            total_calls: 0,
            successful_calls: 0,
            failed_calls: 0,
            average_latency_ms: 0.0,
            last_call_at: None,
            healthy: true,
        }
    }
}

impl CallMetrics {
    fn record(&mut self, success: bool, latency: Duration) {
        self.total_calls += 1;
        if success {
            self.successful_calls += 1;
        } else {
            self.failed_calls += 1;
        }
        let sample = latency.as_secs_f64() * 1000.0;
        self.average_latency_ms += (sample - self.average_latency_ms) / self.total_calls as f64;
        self.last_call_at = Some(Utc::now());
        self.healthy = self.successful_calls as f64 / self.total_calls as f64 >= 0.8;
    }
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    /// Timestamps of recent failures inside the monitoring window
    failures: VecDeque<Instant>,
    /// When the circuit last transitioned state
    last_transition: Instant,
    /// A half-open probe call is currently in flight
    probe_in_flight: bool,
    metrics: CallMetrics,
}

/// A thread-safe circuit breaker guarding one backend
#[derive(Debug)]
pub struct CircuitBreaker {
    /// Backend name, for logging
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    /// Create a new circuit breaker with the given configuration
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                failures: VecDeque::new(),
                last_transition: Instant::now(),
                probe_in_flight: false,
                metrics: CallMetrics::default(),
            }),
        }
    }

    /// Check whether a call may proceed
    ///
    /// In the open state this transitions to half-open once the reset timeout
    /// has elapsed and admits the single probe call; every other caller is
    /// rejected until the probe settles.
    pub fn check(&self) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            CircuitState::Closed => Ok(()),
            CircuitState::Open => {
                if inner.last_transition.elapsed() >= self.config.reset_timeout {
                    log::info!(
                        "Circuit {} HALF-OPEN: testing backend recovery",
                        self.name
                    );
                    inner.state = CircuitState::HalfOpen;
                    inner.last_transition = Instant::now();
                    inner.probe_in_flight = true;
                    Ok(())
                } else {
                    let remaining = self
                        .config
                        .reset_timeout
                        .saturating_sub(inner.last_transition.elapsed());
                    Err(BackendError::circuit_open(format!(
                        "Circuit for {} is open, retry in {}ms",
                        self.name,
                        remaining.as_millis()
                    )))
                }
            }
            CircuitState::HalfOpen => {
                if inner.probe_in_flight {
                    Err(BackendError::circuit_open(format!(
                        "Circuit for {} is half-open and a probe is already in flight",
                        self.name
                    )))
                } else {
                    inner.probe_in_flight = true;
                    Ok(())
                }
            }
        }
    }

    /// Record a successful backend call
    pub fn record_success(&self, latency: Duration) {
        let mut inner = self.inner.lock().unwrap();
        inner.metrics.record(true, latency);
        match inner.state {
            CircuitState::Closed => {
                // A success breaks the consecutive-failure run
                inner.failures.clear();
            }
            CircuitState::HalfOpen => {
                log::info!("Circuit {} CLOSED: backend recovered", self.name);
                inner.state = CircuitState::Closed;
                inner.last_transition = Instant::now();
                inner.probe_in_flight = false;
                inner.failures.clear();
            }
            CircuitState::Open => {
                log::warn!(
                    "Circuit {}: success recorded while open, ignoring",
                    self.name
                );
            }
        }
    }

    /// Record a failed backend call
    ///
    /// Only real call outcomes are recorded here; circuit-open or rate-limit
    /// rejections never reach this method.
    pub fn record_failure(&self, latency: Duration) {
        let mut inner = self.inner.lock().unwrap();
        inner.metrics.record(false, latency);
        match inner.state {
            CircuitState::Closed => {
                let now = Instant::now();
                let window = self.config.window;
                inner.failures.push_back(now);
                while let Some(oldest) = inner.failures.front() {
                    if now.duration_since(*oldest) > window {
                        inner.failures.pop_front();
                    } else {
                        break;
                    }
                }
                if inner.failures.len() >= self.config.failure_threshold {
                    log::warn!(
                        "Circuit {} OPEN: {} failures within the monitoring window",
                        self.name,
                        inner.failures.len()
                    );
                    inner.state = CircuitState::Open;
                    inner.last_transition = Instant::now();
                }
            }
            CircuitState::HalfOpen => {
                log::warn!("Circuit {} REOPENED: probe call failed", self.name);
                inner.state = CircuitState::Open;
                inner.last_transition = Instant::now();
                inner.probe_in_flight = false;
            }
            CircuitState::Open => {
                log::debug!(
                    "Circuit {}: failure recorded while open, ignoring",
                    self.name
                );
            }
        }
    }

    /// Get the current circuit state
    pub fn state(&self) -> CircuitState {
        self.inner.lock().unwrap().state
    }

    /// Get the current failure count inside the monitoring window
    pub fn failure_count(&self) -> usize {
        self.inner.lock().unwrap().failures.len()
    }

    /// Snapshot of the call metrics record
    pub fn metrics(&self) -> CallMetrics {
        self.inner.lock().unwrap().metrics.clone()
    }

    /// Reset the circuit to the closed state, clearing counters
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        log::info!(
            "Circuit {} manually reset to CLOSED from {}",
            self.name,
            inner.state
        );
        inner.state = CircuitState::Closed;
        inner.last_transition = Instant::now();
        inner.probe_in_flight = false;
        inner.failures.clear();
    }
}
