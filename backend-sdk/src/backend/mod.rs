//! Core abstractions for analysis backends
//!
//! Every interchangeable analysis provider is reached through the
//! `AnalysisBackend` trait. Backends return a structured `BackendAnalysis`
//! or a `BackendError` and know nothing about orchestration, circuit
//! breakers or sibling backends.

mod remote;
pub use remote::RemoteAnalysisBackend;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{BackendError, Result};

/// Identity of one configured analysis backend
///
/// A closed set: backends are enabled/disabled through configuration, never
/// discovered dynamically. Used as a map key everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendIdentity {
    OpenAi,
    Anthropic,
    Gemini,
    Mistral,
}

impl BackendIdentity {
    /// All identities the platform knows about
    pub const ALL: [BackendIdentity; 4] = [
        BackendIdentity::OpenAi,
        BackendIdentity::Anthropic,
        BackendIdentity::Gemini,
        BackendIdentity::Mistral,
    ];

    /// Stable lowercase name, used in logs, events and config keys
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendIdentity::OpenAi => "openai",
            BackendIdentity::Anthropic => "anthropic",
            BackendIdentity::Gemini => "gemini",
            BackendIdentity::Mistral => "mistral",
        }
    }

    /// Environment variable prefix for this backend's configuration
    pub fn env_prefix(&self) -> String {
        format!("ANALYSIS_{}", self.as_str().to_uppercase())
    }
}

impl fmt::Display for BackendIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendIdentity {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(BackendIdentity::OpenAi),
            "anthropic" => Ok(BackendIdentity::Anthropic),
            "gemini" => Ok(BackendIdentity::Gemini),
            "mistral" => Ok(BackendIdentity::Mistral),
            other => Err(BackendError::configuration(format!(
                "Unknown backend identity: {}",
                other
            ))),
        }
    }
}

/// Opaque content payload handed to a backend for analysis
///
/// Supplied by the content store collaborator; the SDK never interprets it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisContent {
    /// Reference to the originating content (document id, submission id, ...)
    pub content_ref: String,

    /// The raw text to analyze
    pub body: String,
}

impl AnalysisContent {
    pub fn new(content_ref: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            content_ref: content_ref.into(),
            body: body.into(),
        }
    }
}

/// Structured result returned by a single backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendAnalysis {
    /// Natural-language summary of the analysis
    pub summary: String,

    /// Key findings reported by the backend
    #[serde(default)]
    pub key_findings: Vec<String>,

    /// Confidence score in the range 0.0..=1.0
    pub confidence: f64,

    /// Overall sentiment label, if the backend reports one
    #[serde(default)]
    pub sentiment: Option<String>,

    /// Content category label, if the backend reports one
    #[serde(default)]
    pub category: Option<String>,
}

/// Base trait for all analysis backends
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// The backend's identity
    fn identity(&self) -> BackendIdentity;

    /// Declared hint for how long one analysis typically takes
    fn estimated_duration(&self) -> Duration;

    /// Analyze the given content and return a structured result
    async fn analyze(&self, content: &AnalysisContent) -> Result<BackendAnalysis>;
}
