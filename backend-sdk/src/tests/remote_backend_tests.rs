//! Mock-server tests for the remote HTTP backend

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::backend::{AnalysisBackend, AnalysisContent, BackendIdentity, RemoteAnalysisBackend};
use crate::config::{BackendConfiguration, MapProvider};
use crate::error::BackendError;

fn config_for(server: &MockServer) -> (BackendConfiguration, MapProvider) {
    let provider = MapProvider::new().with("TEST_API_KEY", "sk-test");
    let config = BackendConfiguration {
        base_url: server.uri(),
        model: "gpt-4o".to_string(),
        api_key_env: "TEST_API_KEY".to_string(),
        timeout: Duration::from_secs(2),
        ..BackendConfiguration::default()
    };
    (config, provider)
}

fn chat_reply(content: &str) -> serde_json::Value {
    json!({
        "choices": [
            { "message": { "role": "assistant", "content": content } }
        ]
    })
}

#[tokio::test]
async fn parses_analysis_from_completion_reply() {
    let server = MockServer::start().await;
    let reply = r#"{
        "summary": "Clear and well structured essay",
        "key_findings": ["good structure", "weak conclusion"],
        "confidence": 0.87,
        "sentiment": "positive",
        "category": "essay"
    }"#;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply(reply)))
        .mount(&server)
        .await;

    let (config, provider) = config_for(&server);
    let backend =
        RemoteAnalysisBackend::new(BackendIdentity::OpenAi, &config, &provider).unwrap();

    let analysis = backend
        .analyze(&AnalysisContent::new("doc-1", "essay text"))
        .await
        .unwrap();

    assert_eq!(analysis.summary, "Clear and well structured essay");
    assert_eq!(analysis.key_findings.len(), 2);
    assert!((analysis.confidence - 0.87).abs() < f64::EPSILON);
    assert_eq!(analysis.sentiment.as_deref(), Some("positive"));
}

#[tokio::test]
async fn server_error_maps_to_retryable_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_json(json!({ "error": { "message": "overloaded" } })),
        )
        .mount(&server)
        .await;

    let (config, provider) = config_for(&server);
    let backend =
        RemoteAnalysisBackend::new(BackendIdentity::OpenAi, &config, &provider).unwrap();

    let err = backend
        .analyze(&AnalysisContent::new("doc-1", "text"))
        .await
        .unwrap_err();

    assert!(err.is_retryable());
    match err {
        BackendError::Upstream { status, message } => {
            assert_eq!(status, Some(500));
            assert_eq!(message, "overloaded");
        }
        other => panic!("expected upstream error, got {:?}", other),
    }
}

#[tokio::test]
async fn malformed_reply_is_a_parsing_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(chat_reply("not json at all")),
        )
        .mount(&server)
        .await;

    let (config, provider) = config_for(&server);
    let backend =
        RemoteAnalysisBackend::new(BackendIdentity::OpenAi, &config, &provider).unwrap();

    let err = backend
        .analyze(&AnalysisContent::new("doc-1", "text"))
        .await
        .unwrap_err();

    assert!(matches!(err, BackendError::Parsing(_)));
    assert!(err.is_permanent());
}

#[tokio::test]
async fn out_of_range_confidence_is_rejected() {
    let server = MockServer::start().await;
    let reply = r#"{"summary": "s", "key_findings": [], "confidence": 3.5}"#;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply(reply)))
        .mount(&server)
        .await;

    let (config, provider) = config_for(&server);
    let backend =
        RemoteAnalysisBackend::new(BackendIdentity::OpenAi, &config, &provider).unwrap();

    let err = backend
        .analyze(&AnalysisContent::new("doc-1", "text"))
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::Parsing(_)));
}

#[test]
fn missing_credentials_fail_construction() {
    let provider = MapProvider::new();
    let config = BackendConfiguration {
        base_url: "https://api.example.com/v1".to_string(),
        model: "gpt-4o".to_string(),
        api_key_env: "ABSENT_KEY".to_string(),
        ..BackendConfiguration::default()
    };

    let result = RemoteAnalysisBackend::new(BackendIdentity::OpenAi, &config, &provider);
    assert!(matches!(result, Err(BackendError::Configuration(_))));
}
