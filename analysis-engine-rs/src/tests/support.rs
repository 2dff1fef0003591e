//! Shared test doubles and builders

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use backend_sdk::{
    AnalysisBackend, AnalysisContent, BackendAnalysis, BackendConfiguration, BackendIdentity,
    GuardedBackend,
};

use crate::notify::{Notifier, PushEvent};

pub fn content() -> AnalysisContent {
    AnalysisContent {
        content_ref: "submission-42".to_string(),
        body: "An essay about the water cycle.".to_string(),
    }
}

pub fn analysis(summary: &str, confidence: f64) -> BackendAnalysis {
    BackendAnalysis {
        summary: summary.to_string(),
        key_findings: vec![format!("{summary} finding")],
        confidence,
        sentiment: Some("neutral".to_string()),
        category: Some("essay".to_string()),
    }
}

/// Backend double that plays back a scripted sequence of outcomes,
/// repeating the last behaviour (success) when the script runs out
pub struct ScriptedBackend {
    identity: BackendIdentity,
    outcomes: Mutex<VecDeque<backend_sdk::Result<BackendAnalysis>>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl ScriptedBackend {
    pub fn new(
        identity: BackendIdentity,
        outcomes: Vec<backend_sdk::Result<BackendAnalysis>>,
    ) -> Self {
        Self {
            identity,
            outcomes: Mutex::new(outcomes.into()),
            calls: AtomicUsize::new(0),
            delay: None,
        }
    }

    pub fn succeeding(identity: BackendIdentity, confidence: f64) -> Self {
        Self::new(identity, vec![Ok(analysis(identity.as_str(), confidence))])
    }

    pub fn failing(identity: BackendIdentity) -> Self {
        Self::new(
            identity,
            vec![Err(backend_sdk::BackendError::upstream(
                Some(503),
                "backend unavailable",
            ))],
        )
    }

    pub fn slow(identity: BackendIdentity, delay: Duration) -> Self {
        Self {
            identity,
            outcomes: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
            delay: Some(delay),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalysisBackend for ScriptedBackend {
    fn identity(&self) -> BackendIdentity {
        self.identity
    }

    fn estimated_duration(&self) -> Duration {
        Duration::from_millis(50)
    }

    async fn analyze(&self, _content: &AnalysisContent) -> backend_sdk::Result<BackendAnalysis> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let scripted = self.outcomes.lock().unwrap().pop_front();
        match scripted {
            Some(outcome) => outcome,
            None => Ok(analysis(self.identity.as_str(), 0.9)),
        }
    }
}

/// Configuration with generous budgets and no adapter retries, so call
/// counts in assertions stay deterministic
pub fn test_config(failure_threshold: usize) -> BackendConfiguration {
    BackendConfiguration {
        enabled: true,
        max_retries: 0,
        timeout: Duration::from_secs(5),
        requests_per_minute: 1_000,
        requests_per_hour: 10_000,
        circuit_breaker: backend_sdk::CircuitBreakerConfig {
            failure_threshold,
            reset_timeout: Duration::from_secs(60),
            window: Duration::from_secs(120),
        },
        ..BackendConfiguration::default()
    }
}

pub fn guard(backend: ScriptedBackend) -> Arc<GuardedBackend> {
    Arc::new(GuardedBackend::new(Arc::new(backend), &test_config(5)))
}

/// Notifier that records every published event in order
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<PushEvent>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<PushEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn publish(&self, event: &PushEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
