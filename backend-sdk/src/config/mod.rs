//! Configuration management for analysis backends
//!
//! This module provides utilities for loading and validating per-backend
//! configuration, with support for environment variables and in-memory
//! providers for tests.

use std::collections::HashMap;
use std::env;
use std::time::Duration;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::backend::BackendIdentity;
use crate::error::{BackendError, Result};

/// Base trait for configuration providers
pub trait ConfigProvider: Send + Sync {
    /// Get a string configuration value
    fn get_string(&self, key: &str) -> Result<String>;
}

/// Extension methods for configuration providers
pub trait ConfigProviderExt: ConfigProvider {
    /// Get an integer configuration value
    fn get_int(&self, key: &str) -> Result<i64> {
        let value = self.get_string(key)?;
        value.parse::<i64>().map_err(|e| {
            BackendError::configuration(format!("Invalid integer for key {}: {}", key, e))
        })
    }

    /// Get a boolean configuration value
    fn get_bool(&self, key: &str) -> Result<bool> {
        let value = self.get_string(key)?;
        match value.to_lowercase().as_str() {
            "true" | "yes" | "1" | "on" => Ok(true),
            "false" | "no" | "0" | "off" => Ok(false),
            _ => Err(BackendError::configuration(format!(
                "Invalid boolean value for key {}: {}",
                key, value
            ))),
        }
    }

    /// Get a string configuration value with a default
    fn get_string_or(&self, key: &str, default: &str) -> String {
        self.get_string(key).unwrap_or_else(|_| default.to_string())
    }

    /// Get an integer configuration value with a default
    fn get_int_or(&self, key: &str, default: i64) -> i64 {
        self.get_int(key).unwrap_or(default)
    }

    /// Get a boolean configuration value with a default
    fn get_bool_or(&self, key: &str, default: bool) -> bool {
        self.get_bool(key).unwrap_or(default)
    }

    /// Get a millisecond duration value with a default
    fn get_duration_ms_or(&self, key: &str, default: Duration) -> Duration {
        self.get_int(key)
            .ok()
            .and_then(|ms| u64::try_from(ms).ok())
            .map(Duration::from_millis)
            .unwrap_or(default)
    }
}

impl<T: ConfigProvider + ?Sized> ConfigProviderExt for T {}

/// Configuration provider backed by environment variables
#[derive(Debug, Default)]
pub struct EnvProvider;

impl ConfigProvider for EnvProvider {
    fn get_string(&self, key: &str) -> Result<String> {
        env::var(key).map_err(|_| {
            BackendError::configuration(format!("Missing configuration key: {}", key))
        })
    }
}

/// In-memory configuration provider, used in tests and for hot-swapped
/// administrative updates
#[derive(Debug, Default, Clone)]
pub struct MapProvider {
    values: HashMap<String, String>,
}

impl MapProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a configuration value (builder pattern)
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl ConfigProvider for MapProvider {
    fn get_string(&self, key: &str) -> Result<String> {
        self.values.get(key).cloned().ok_or_else(|| {
            BackendError::configuration(format!("Missing configuration key: {}", key))
        })
    }
}

/// The default provider reads from the process environment
pub static DEFAULT_PROVIDER: Lazy<EnvProvider> = Lazy::new(EnvProvider::default);

/// Circuit breaker parameters for one backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures within the monitoring window before the circuit opens
    pub failure_threshold: usize,

    /// How long the circuit stays open before a recovery probe is allowed
    pub reset_timeout: Duration,

    /// Rolling monitoring window for the failure counter
    pub window: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_secs(60),
            window: Duration::from_secs(120),
        }
    }
}

/// Per-backend settings, loaded once at startup
///
/// An administrative hot-swap builds a fresh configuration and re-creates the
/// affected backend guard; guards for unaffected backends are left untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfiguration {
    /// Whether this backend participates in analysis jobs
    pub enabled: bool,

    /// Name of the environment variable holding the API credential
    pub api_key_env: String,

    /// Base URL of the provider API
    pub base_url: String,

    /// Model name requested from the provider
    pub model: String,

    /// Deadline for a single backend call
    pub timeout: Duration,

    /// Maximum retry attempts inside the adapter (0 means no retries)
    pub max_retries: u32,

    /// Rate-limit budget: requests per minute
    pub requests_per_minute: u32,

    /// Rate-limit budget: requests per hour
    pub requests_per_hour: u32,

    /// Declared hint for how long one analysis typically takes
    pub estimated_duration: Duration,

    /// Circuit breaker parameters
    pub circuit_breaker: CircuitBreakerConfig,
}

impl Default for BackendConfiguration {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key_env: String::new(),
            base_url: String::new(),
            model: String::new(),
            timeout: Duration::from_secs(30),
            max_retries: 2,
            requests_per_minute: 60,
            requests_per_hour: 1000,
            estimated_duration: Duration::from_secs(20),
            circuit_breaker: CircuitBreakerConfig::default(),
        }
    }
}

impl BackendConfiguration {
    /// Load the configuration for one backend from a provider
    ///
    /// Keys are prefixed with the backend's env prefix, e.g.
    /// `ANALYSIS_OPENAI_BASE_URL` or `ANALYSIS_GEMINI_TIMEOUT_MS`.
    pub fn from_provider(
        provider: &dyn ConfigProvider,
        identity: BackendIdentity,
    ) -> Result<Self> {
        let prefix = identity.env_prefix();
        let defaults = Self::default();
        let key = |suffix: &str| format!("{}_{}", prefix, suffix);

        Ok(Self {
            enabled: provider.get_bool_or(&key("ENABLED"), true),
            api_key_env: provider.get_string_or(&key("API_KEY_ENV"), &key("API_KEY")),
            base_url: provider.get_string(&key("BASE_URL"))?,
            model: provider.get_string(&key("MODEL"))?,
            timeout: provider.get_duration_ms_or(&key("TIMEOUT_MS"), defaults.timeout),
            max_retries: provider.get_int_or(&key("MAX_RETRIES"), defaults.max_retries as i64)
                as u32,
            requests_per_minute: provider.get_int_or(
                &key("REQUESTS_PER_MINUTE"),
                defaults.requests_per_minute as i64,
            ) as u32,
            requests_per_hour: provider.get_int_or(
                &key("REQUESTS_PER_HOUR"),
                defaults.requests_per_hour as i64,
            ) as u32,
            estimated_duration: provider.get_duration_ms_or(
                &key("ESTIMATED_DURATION_MS"),
                defaults.estimated_duration,
            ),
            circuit_breaker: CircuitBreakerConfig {
                failure_threshold: provider.get_int_or(
                    &key("CB_FAILURE_THRESHOLD"),
                    defaults.circuit_breaker.failure_threshold as i64,
                ) as usize,
                reset_timeout: provider.get_duration_ms_or(
                    &key("CB_RESET_TIMEOUT_MS"),
                    defaults.circuit_breaker.reset_timeout,
                ),
                window: provider.get_duration_ms_or(
                    &key("CB_WINDOW_MS"),
                    defaults.circuit_breaker.window,
                ),
            },
        })
    }

    /// Resolve the API credential named by `api_key_env`
    pub fn resolve_api_key(&self, provider: &dyn ConfigProvider) -> Result<String> {
        provider.get_string(&self.api_key_env)
    }
}
