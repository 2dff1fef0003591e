//! # Backend SDK
//!
//! Everything a single analysis backend needs to be called safely by the
//! orchestration engine.
//!
//! This crate provides:
//!
//! - The `AnalysisBackend` trait and the closed `BackendIdentity` set
//! - A concrete HTTP backend for chat-completion style provider APIs
//! - Resilience patterns: circuit breaker, retry, timeout, rate-limit budget
//! - Per-backend configuration loading
//! - A normalized error taxonomy with retryable/permanent classification
//!
//! ## Architecture
//!
//! The orchestration engine never calls a backend directly; it holds an
//! `Arc<GuardedBackend>` per configured backend and all jobs routed to the
//! same backend share that guard (and therefore its circuit breaker state).

// Re-export backend abstractions
pub mod backend;
pub use backend::{
    AnalysisBackend, AnalysisContent, BackendAnalysis, BackendIdentity, RemoteAnalysisBackend,
};

// Re-export error handling
pub mod error;
pub use error::{BackendError, Result};

// Re-export resilience patterns
pub mod resilience;
pub use resilience::{
    CallMetrics, CircuitBreaker, CircuitState, GuardedBackend, RateLimiter, RetryConfig,
    RetryExecutor,
};

// Re-export configuration management
pub mod config;
pub use config::{
    BackendConfiguration, CircuitBreakerConfig, ConfigProvider, ConfigProviderExt, EnvProvider,
    MapProvider, DEFAULT_PROVIDER,
};

#[cfg(test)]
mod tests;
