//! Job and task data model
//!
//! One `AnalysisJob` per user request, one `ModelTask` per (job, backend)
//! pair. Both move monotonically through their status sets and never leave
//! a terminal status.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use backend_sdk::BackendIdentity;

/// Generated identifier of one analysis job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Overall status of an analysis job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Started,
    Processing,
    Completed,
    CompletedWithErrors,
    /// Terminal for both explicit cancellation and total failure
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::CompletedWithErrors | JobStatus::Cancelled
        )
    }
}

/// Status of one (job, backend) task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Error,
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Error | TaskStatus::Cancelled
        )
    }
}

/// Progress and status of one backend's work within a job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelTask {
    pub backend: BackendIdentity,

    /// Progress percentage, 0..=100
    pub progress: u8,

    pub status: TaskStatus,

    /// Failure message when the task ended in `Error`
    pub error: Option<String>,

    pub last_updated: DateTime<Utc>,

    /// Derived from the backend's declared duration hint at seed time
    pub estimated_completion: Option<DateTime<Utc>>,
}

/// Consolidated output built from all backends that succeeded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedResult {
    /// Natural-language roll-up of the analysis
    pub summary: String,

    /// De-duplicated findings shared across backends, at most 5
    pub common_findings: Vec<String>,

    /// Unweighted mean of per-backend confidence scores
    pub confidence: f64,

    /// Detected disagreements between backends; empty when they agree
    pub conflicts: Vec<String>,

    /// Generic next steps plus one entry per low-confidence backend
    pub recommended_actions: Vec<String>,

    /// Backends that contributed to this result
    pub sources: Vec<BackendIdentity>,
}

/// One user-initiated analysis across a chosen set of backends
///
/// Held in memory by the progress tracker for the job's lifetime; snapshots
/// are cheap clones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisJob {
    pub id: JobId,
    pub user_id: String,
    pub content_ref: String,
    pub backends: Vec<BackendIdentity>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub status: JobStatus,

    /// Rounded mean of all task progress values
    pub overall_progress: u8,

    /// Attached once the job completes with at least one success
    pub result: Option<ConsolidatedResult>,

    /// Per-backend tasks, keyed by identity
    pub tasks: BTreeMap<BackendIdentity, ModelTask>,
}

impl AnalysisJob {
    /// Build a new job with one pending task per requested backend
    pub fn new(
        user_id: impl Into<String>,
        content_ref: impl Into<String>,
        backends: Vec<BackendIdentity>,
        estimates: &BTreeMap<BackendIdentity, chrono::Duration>,
    ) -> Self {
        let now = Utc::now();
        let tasks = backends
            .iter()
            .map(|backend| {
                (
                    *backend,
                    ModelTask {
                        backend: *backend,
                        progress: 0,
                        status: TaskStatus::Pending,
                        error: None,
                        last_updated: now,
                        estimated_completion: estimates.get(backend).map(|hint| now + *hint),
                    },
                )
            })
            .collect();

        Self {
            id: JobId::new(),
            user_id: user_id.into(),
            content_ref: content_ref.into(),
            backends,
            created_at: now,
            completed_at: None,
            status: JobStatus::Started,
            overall_progress: 0,
            result: None,
            tasks,
        }
    }

    /// Rounded mean of the current task progress values
    pub fn mean_progress(&self) -> u8 {
        if self.tasks.is_empty() {
            return 0;
        }
        let sum: u32 = self.tasks.values().map(|t| t.progress as u32).sum();
        (sum as f64 / self.tasks.len() as f64).round() as u8
    }

    /// True when every task has reached a terminal status
    pub fn all_tasks_terminal(&self) -> bool {
        self.tasks.values().all(|t| t.status.is_terminal())
    }
}
