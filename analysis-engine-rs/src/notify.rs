//! Push notifications for analysis progress
//!
//! The engine publishes events to job-scoped and user-scoped channels.
//! Delivery is fire-and-forget: a missing subscriber or a lagged channel
//! never affects orchestration control flow.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use backend_sdk::BackendIdentity;

use crate::job::{ConsolidatedResult, JobId, JobStatus, TaskStatus};

/// Event pushed to observers of a job or user
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PushEvent {
    /// One backend's task changed status or progress
    ModelProgress {
        job_id: JobId,
        user_id: String,
        backend: BackendIdentity,
        progress: u8,
        status: TaskStatus,
        overall_progress: u8,
    },

    /// The job reached a terminal status
    AnalysisComplete {
        job_id: JobId,
        user_id: String,
        status: JobStatus,
        result: Option<ConsolidatedResult>,
    },

    /// The job failed as a whole (every backend failed)
    AnalysisError {
        job_id: JobId,
        user_id: String,
        message: String,
    },
}

impl PushEvent {
    pub fn job_id(&self) -> JobId {
        match self {
            PushEvent::ModelProgress { job_id, .. }
            | PushEvent::AnalysisComplete { job_id, .. }
            | PushEvent::AnalysisError { job_id, .. } => *job_id,
        }
    }

    pub fn user_id(&self) -> &str {
        match self {
            PushEvent::ModelProgress { user_id, .. }
            | PushEvent::AnalysisComplete { user_id, .. }
            | PushEvent::AnalysisError { user_id, .. } => user_id,
        }
    }
}

/// Transport the engine publishes progress events through
///
/// Implementations must be best-effort and non-blocking; the engine ignores
/// delivery failures.
pub trait Notifier: Send + Sync {
    fn publish(&self, event: &PushEvent);
}

/// Notifier that drops every event, for tests and headless runs
#[derive(Debug, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn publish(&self, _event: &PushEvent) {}
}

/// Broadcast-channel notifier with job-scoped and user-scoped addressing
///
/// Channels are created lazily on first subscription; publishing to a scope
/// nobody subscribed to is a silent no-op.
pub struct ChannelNotifier {
    capacity: usize,
    job_channels: RwLock<HashMap<JobId, broadcast::Sender<PushEvent>>>,
    user_channels: RwLock<HashMap<String, broadcast::Sender<PushEvent>>>,
}

impl ChannelNotifier {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            job_channels: RwLock::new(HashMap::new()),
            user_channels: RwLock::new(HashMap::new()),
        }
    }

    /// Subscribe to every event of one job
    pub fn subscribe_job(&self, job_id: JobId) -> broadcast::Receiver<PushEvent> {
        let mut channels = self.job_channels.write().unwrap();
        channels
            .entry(job_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Subscribe to every event addressed to one user
    pub fn subscribe_user(&self, user_id: impl Into<String>) -> broadcast::Receiver<PushEvent> {
        let mut channels = self.user_channels.write().unwrap();
        channels
            .entry(user_id.into())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Drop the channel of a finished job
    pub fn release_job(&self, job_id: JobId) {
        self.job_channels.write().unwrap().remove(&job_id);
    }
}

impl Default for ChannelNotifier {
    fn default() -> Self {
        Self::new(64)
    }
}

impl Notifier for ChannelNotifier {
    fn publish(&self, event: &PushEvent) {
        if let Some(sender) = self.job_channels.read().unwrap().get(&event.job_id()) {
            // A send error only means there are no live receivers
            let _ = sender.send(event.clone());
        }
        if let Some(sender) = self.user_channels.read().unwrap().get(event.user_id()) {
            let _ = sender.send(event.clone());
        }
    }
}
