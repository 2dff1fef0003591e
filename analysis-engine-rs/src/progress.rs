//! In-memory progress registry
//!
//! Keyed by job id, mutated only by the orchestrator. The tracker is an
//! injected, explicitly-owned store so tests can build isolated instances.
//! Every applied mutation emits a push event while the registry lock is
//! held, which keeps per-(job, backend) event order aligned with the
//! underlying status transitions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::{debug, warn};

use backend_sdk::BackendIdentity;

use crate::job::{AnalysisJob, ConsolidatedResult, JobId, JobStatus, TaskStatus};
use crate::notify::{Notifier, PushEvent};

/// Registry of live jobs and their per-backend tasks
pub struct ProgressTracker {
    jobs: Mutex<HashMap<JobId, AnalysisJob>>,
    notifier: Arc<dyn Notifier>,
}

impl ProgressTracker {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
            notifier,
        }
    }

    /// Register a freshly created job and announce its pending tasks
    pub fn seed(&self, job: AnalysisJob) {
        let mut jobs = self.jobs.lock().unwrap();
        for task in job.tasks.values() {
            self.notifier.publish(&PushEvent::ModelProgress {
                job_id: job.id,
                user_id: job.user_id.clone(),
                backend: task.backend,
                progress: task.progress,
                status: task.status,
                overall_progress: job.overall_progress,
            });
        }
        jobs.insert(job.id, job);
    }

    /// Snapshot of a job, tasks included
    pub fn snapshot(&self, job_id: JobId) -> Option<AnalysisJob> {
        self.jobs.lock().unwrap().get(&job_id).cloned()
    }

    /// Whether the job has reached a terminal status
    pub fn is_terminal(&self, job_id: JobId) -> Option<bool> {
        self.jobs
            .lock()
            .unwrap()
            .get(&job_id)
            .map(|job| job.status.is_terminal())
    }

    /// Apply one task transition and recompute the job's overall progress
    ///
    /// Returns false (and changes nothing) when the job is unknown or the
    /// task already reached a terminal status: late completions of
    /// cancelled work are ignored here.
    pub fn update(
        &self,
        job_id: JobId,
        backend: BackendIdentity,
        progress: u8,
        status: TaskStatus,
        error: Option<String>,
    ) -> bool {
        let mut jobs = self.jobs.lock().unwrap();
        let Some(job) = jobs.get_mut(&job_id) else {
            warn!(%job_id, "Progress update for unknown job");
            return false;
        };
        let Some(task) = job.tasks.get_mut(&backend) else {
            warn!(%job_id, backend = %backend, "Progress update for unknown task");
            return false;
        };
        if task.status.is_terminal() {
            debug!(
                %job_id,
                backend = %backend,
                status = ?task.status,
                "Ignoring update for settled task"
            );
            return false;
        }

        let applied_progress = progress.min(100);
        task.progress = applied_progress;
        task.status = status;
        task.error = error;
        task.last_updated = Utc::now();

        if job.status == JobStatus::Started && status != TaskStatus::Pending {
            job.status = JobStatus::Processing;
        }
        job.overall_progress = job.mean_progress();

        self.notifier.publish(&PushEvent::ModelProgress {
            job_id,
            user_id: job.user_id.clone(),
            backend,
            progress: applied_progress,
            status,
            overall_progress: job.overall_progress,
        });
        true
    }

    /// The consolidated result, once a terminal status attached one
    pub fn result(&self, job_id: JobId) -> Option<ConsolidatedResult> {
        self.jobs
            .lock()
            .unwrap()
            .get(&job_id)
            .and_then(|job| job.result.clone())
    }

    /// Record the job's terminal status and attach the consolidated result
    ///
    /// No-op when the job is unknown or already terminal. Emits the final
    /// completion event.
    pub fn mark_terminal(
        &self,
        job_id: JobId,
        status: JobStatus,
        result: Option<ConsolidatedResult>,
    ) -> bool {
        let mut jobs = self.jobs.lock().unwrap();
        let Some(job) = jobs.get_mut(&job_id) else {
            return false;
        };
        if job.status.is_terminal() {
            return false;
        }
        debug_assert!(job.all_tasks_terminal());

        job.status = status;
        job.completed_at = Some(Utc::now());
        job.result = result;
        // A settled job with at least one delivered result reads as done,
        // whatever the failed tasks' last progress values were.
        if status != JobStatus::Cancelled {
            job.overall_progress = 100;
        }

        self.notifier.publish(&PushEvent::AnalysisComplete {
            job_id,
            user_id: job.user_id.clone(),
            status,
            result: job.result.clone(),
        });
        true
    }

    /// Cancel every still-pending or processing task, then the job itself
    ///
    /// Idempotent: returns false without emitting anything when the job is
    /// already terminal. Unknown jobs also return false.
    pub fn cancel(&self, job_id: JobId) -> bool {
        let mut jobs = self.jobs.lock().unwrap();
        let Some(job) = jobs.get_mut(&job_id) else {
            return false;
        };
        if job.status.is_terminal() {
            return false;
        }

        let now = Utc::now();
        for task in job.tasks.values_mut() {
            if task.status.is_terminal() {
                continue;
            }
            task.status = TaskStatus::Cancelled;
            task.last_updated = now;
            self.notifier.publish(&PushEvent::ModelProgress {
                job_id,
                user_id: job.user_id.clone(),
                backend: task.backend,
                progress: task.progress,
                status: task.status,
                overall_progress: job.overall_progress,
            });
        }

        job.status = JobStatus::Cancelled;
        job.completed_at = Some(now);
        self.notifier.publish(&PushEvent::AnalysisComplete {
            job_id,
            user_id: job.user_id.clone(),
            status: job.status,
            result: None,
        });
        true
    }

    /// Whether the tracker knows this job at all
    pub fn contains(&self, job_id: JobId) -> bool {
        self.jobs.lock().unwrap().contains_key(&job_id)
    }
}
