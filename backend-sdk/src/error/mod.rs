//! Error handling for the backend SDK
//!
//! This module provides the error system shared by every analysis backend:
//! - Categorizes errors by type (network, timeout, provider, etc.)
//! - Distinguishes retryable from permanent failures
//! - Maps transport errors to normalized variants
//! - Provides a convenient Result type alias

use thiserror::Error;

/// Result type for backend SDK operations
pub type Result<T> = std::result::Result<T, BackendError>;

/// Main error type for analysis backend calls
#[derive(Error, Debug)]
pub enum BackendError {
    /// Network or connection errors
    #[error("Network error: {0}")]
    Network(String),

    /// The call exceeded its configured deadline
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// The local rate-limit budget for this backend is exhausted
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// The circuit breaker rejected the call without reaching the backend
    #[error("Circuit open: {0}")]
    CircuitOpen(String),

    /// The provider returned an error response
    #[error("Upstream error: {message}")]
    Upstream {
        status: Option<u16>,
        message: String,
    },

    /// Response parsing errors
    #[error("Parsing error: {0}")]
    Parsing(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Unexpected or internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BackendError {
    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        BackendError::Network(message.into())
    }

    /// Create a timeout error
    pub fn timeout(message: impl Into<String>) -> Self {
        BackendError::Timeout(message.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(message: impl Into<String>) -> Self {
        BackendError::RateLimited(message.into())
    }

    /// Create a circuit open error
    pub fn circuit_open(message: impl Into<String>) -> Self {
        BackendError::CircuitOpen(message.into())
    }

    /// Create an upstream provider error
    pub fn upstream(status: Option<u16>, message: impl Into<String>) -> Self {
        BackendError::Upstream {
            status,
            message: message.into(),
        }
    }

    /// Create a parsing error
    pub fn parsing(message: impl Into<String>) -> Self {
        BackendError::Parsing(message.into())
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        BackendError::Configuration(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        BackendError::Internal(message.into())
    }

    /// Check if this is a retryable error
    ///
    /// Circuit-open and local rate-limit rejections are deliberately not
    /// retryable: the call never reached the backend, so another attempt
    /// inside the same invocation would only burn the retry budget.
    pub fn is_retryable(&self) -> bool {
        match self {
            BackendError::Network(_) => true,
            BackendError::Timeout(_) => true,
            BackendError::Upstream { status, .. } => match status {
                Some(code) => *code == 429 || *code >= 500,
                None => false,
            },
            _ => false,
        }
    }

    /// Check if this is a permanent error (not retryable)
    pub fn is_permanent(&self) -> bool {
        !self.is_retryable()
    }

    /// True when the call was rejected before reaching the backend
    /// (circuit open or budget exhausted), which must not be counted
    /// as a new failure sample by the circuit breaker
    pub fn is_fast_fail(&self) -> bool {
        matches!(
            self,
            BackendError::CircuitOpen(_) | BackendError::RateLimited(_)
        )
    }
}

/// Convert reqwest errors to BackendError
impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BackendError::timeout(format!("Request timed out: {}", err))
        } else if err.is_connect() {
            BackendError::network(format!("Connection error: {}", err))
        } else if err.is_decode() {
            BackendError::parsing(format!("Response decode error: {}", err))
        } else if let Some(status) = err.status() {
            BackendError::upstream(Some(status.as_u16()), err.to_string())
        } else {
            BackendError::network(format!("HTTP client error: {}", err))
        }
    }
}

/// Convert serde_json errors to BackendError
impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        BackendError::parsing(format!("JSON error: {}", err))
    }
}
