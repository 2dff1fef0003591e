//! HTTP analysis backend for chat-completion style provider APIs
//!
//! All four configured providers expose an OpenAI-compatible
//! chat-completions surface, so a single client covers them; the
//! per-provider differences live entirely in `BackendConfiguration`.

use std::time::Duration;

use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::backend::{AnalysisBackend, AnalysisContent, BackendAnalysis, BackendIdentity};
use crate::config::{BackendConfiguration, ConfigProvider};
use crate::error::{BackendError, Result};

use async_trait::async_trait;

/// Fixed instruction sent with every analysis request. Prompt templating is
/// a collaborator concern; the SDK only needs a stable, parseable reply.
const ANALYSIS_INSTRUCTION: &str = "You are a content analysis service for an education \
platform. Analyze the user's content and reply with a single JSON object with the fields: \
summary (string), key_findings (array of strings), confidence (number between 0 and 1), \
sentiment (string), category (string). Reply with JSON only.";

/// Build the shared HTTP client for a backend
fn build_http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .user_agent(concat!("analysis-engine/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()
        .map_err(|e| BackendError::configuration(format!("Failed to build HTTP client: {}", e)))
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Analysis backend that calls a remote provider over HTTP
pub struct RemoteAnalysisBackend {
    identity: BackendIdentity,
    http_client: Client,
    base_url: String,
    model: String,
    api_key: String,
    estimated_duration: Duration,
}

impl RemoteAnalysisBackend {
    /// Create a backend from its configuration, resolving credentials
    /// through the given provider
    pub fn new(
        identity: BackendIdentity,
        config: &BackendConfiguration,
        provider: &dyn ConfigProvider,
    ) -> Result<Self> {
        if config.base_url.is_empty() {
            return Err(BackendError::configuration(format!(
                "Backend {} has no base URL configured",
                identity
            )));
        }
        let api_key = config.resolve_api_key(provider)?;
        // The outer reqwest timeout is a safety net; the guard applies the
        // real per-call deadline.
        let http_client = build_http_client(config.timeout + Duration::from_secs(5))?;

        Ok(Self {
            identity,
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            estimated_duration: config.estimated_duration,
        })
    }

    async fn status_error(&self, status: StatusCode, response: reqwest::Response) -> BackendError {
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body
                .error
                .map(|e| e.message)
                .unwrap_or_else(|| status.to_string()),
            Err(_) => status.to_string(),
        };
        log::warn!(
            "Backend {} returned {}: {}",
            self.identity,
            status,
            message
        );
        BackendError::upstream(Some(status.as_u16()), message)
    }
}

#[async_trait]
impl AnalysisBackend for RemoteAnalysisBackend {
    fn identity(&self) -> BackendIdentity {
        self.identity
    }

    fn estimated_duration(&self) -> Duration {
        self.estimated_duration
    }

    async fn analyze(&self, content: &AnalysisContent) -> Result<BackendAnalysis> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: ANALYSIS_INSTRUCTION,
                },
                ChatMessage {
                    role: "user",
                    content: &content.body,
                },
            ],
            temperature: 0.2,
        };

        log::debug!(
            "Backend {} analyzing content {}",
            self.identity,
            content.content_ref
        );

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.status_error(status, response).await);
        }

        let body: ChatResponse = response.json().await?;
        let reply = body
            .choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
            .ok_or_else(|| BackendError::parsing("Empty completion response"))?;

        let analysis: BackendAnalysis = serde_json::from_str(reply.trim()).map_err(|e| {
            BackendError::parsing(format!(
                "Backend {} reply is not a valid analysis object: {}",
                self.identity, e
            ))
        })?;

        if !(0.0..=1.0).contains(&analysis.confidence) {
            return Err(BackendError::parsing(format!(
                "Backend {} reported an out-of-range confidence: {}",
                self.identity, analysis.confidence
            )));
        }

        Ok(analysis)
    }
}
