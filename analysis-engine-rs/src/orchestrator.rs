//! Job orchestration
//!
//! `AnalysisService` is the engine's request surface: it validates and
//! starts jobs, fans one concurrent task out per requested backend, collects
//! every outcome without letting one failure abort siblings, classifies the
//! terminal status and attaches the consolidated result.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use tracing::{error, info, warn};

use backend_sdk::{AnalysisContent, BackendAnalysis, BackendIdentity, GuardedBackend};

use crate::aggregate::consolidate;
use crate::error::{EngineError, Result};
use crate::job::{AnalysisJob, ConsolidatedResult, JobId, JobStatus, TaskStatus};
use crate::notify::{Notifier, PushEvent};
use crate::progress::ProgressTracker;
use crate::registry::BackendRegistry;

/// Response to a successfully submitted analysis request
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct StartedAnalysis {
    pub job_id: JobId,
    /// Upper bound derived from the slowest requested backend's hint;
    /// the tasks run concurrently
    pub estimated_duration_ms: u64,
}

/// The multi-backend analysis orchestration engine
pub struct AnalysisService {
    registry: Arc<BackendRegistry>,
    tracker: Arc<ProgressTracker>,
    notifier: Arc<dyn Notifier>,
}

impl AnalysisService {
    pub fn new(registry: Arc<BackendRegistry>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            registry,
            tracker: Arc::new(ProgressTracker::new(Arc::clone(&notifier))),
            notifier,
        }
    }

    /// The progress registry, shared with any read-only collaborator
    pub fn tracker(&self) -> Arc<ProgressTracker> {
        Arc::clone(&self.tracker)
    }

    /// Submit an analysis job across the requested backends
    ///
    /// Validation happens synchronously; the job itself runs on spawned
    /// tasks and completion is announced through the notifier.
    pub fn start_analysis(
        &self,
        user_id: impl Into<String>,
        content: AnalysisContent,
        mut backends: Vec<BackendIdentity>,
    ) -> Result<StartedAnalysis> {
        // A backend named more than once still gets exactly one task
        let mut seen = HashSet::new();
        backends.retain(|backend| seen.insert(*backend));
        let guards = self.registry.resolve(&backends)?;

        let estimates: BTreeMap<BackendIdentity, chrono::Duration> = guards
            .iter()
            .map(|guard| {
                let hint = chrono::Duration::from_std(guard.estimated_duration())
                    .unwrap_or_else(|_| chrono::Duration::seconds(60));
                (guard.identity(), hint)
            })
            .collect();
        let estimated_duration_ms = guards
            .iter()
            .map(|guard| guard.estimated_duration().as_millis() as u64)
            .max()
            .unwrap_or(0);

        let job = AnalysisJob::new(user_id, content.content_ref.clone(), backends.clone(), &estimates);
        let job_id = job.id;
        let user = job.user_id.clone();
        info!(%job_id, user_id = %user, backends = ?backends, "Starting analysis job");
        self.tracker.seed(job);

        // For a single-backend request the fallback chain supplies
        // alternates; multi-backend requests already carry their own
        // redundancy, so each entry is invoked directly.
        let plan: Vec<(BackendIdentity, Vec<Arc<GuardedBackend>>)> = if guards.len() == 1 {
            let primary = guards[0].identity();
            vec![(primary, self.registry.candidates(primary))]
        } else {
            guards
                .into_iter()
                .map(|guard| (guard.identity(), vec![guard]))
                .collect()
        };

        let tracker = Arc::clone(&self.tracker);
        let notifier = Arc::clone(&self.notifier);
        let content = Arc::new(content);
        tokio::spawn(async move {
            drive_job(tracker, notifier, job_id, user, content, plan).await;
        });

        Ok(StartedAnalysis {
            job_id,
            estimated_duration_ms,
        })
    }

    /// Snapshot of a job's progress, per-backend statuses included
    pub fn get_progress(&self, job_id: JobId) -> Result<AnalysisJob> {
        self.tracker
            .snapshot(job_id)
            .ok_or(EngineError::JobNotFound(job_id))
    }

    /// The consolidated result of a finished job
    pub fn get_result(&self, job_id: JobId) -> Result<ConsolidatedResult> {
        if !self.tracker.contains(job_id) {
            return Err(EngineError::JobNotFound(job_id));
        }
        self.tracker
            .result(job_id)
            .ok_or(EngineError::ResultNotReady(job_id))
    }

    /// Cancel a job cooperatively
    ///
    /// Idempotent: cancelling a terminal job is a no-op. In-flight backend
    /// calls are not aborted; their late completions are ignored.
    pub fn cancel(&self, job_id: JobId) -> Result<()> {
        if !self.tracker.contains(job_id) {
            return Err(EngineError::JobNotFound(job_id));
        }
        if self.tracker.cancel(job_id) {
            info!(%job_id, "Analysis job cancelled");
        }
        Ok(())
    }
}

/// Run one job to completion: fan out, collect, classify, consolidate
async fn drive_job(
    tracker: Arc<ProgressTracker>,
    notifier: Arc<dyn Notifier>,
    job_id: JobId,
    user_id: String,
    content: Arc<AnalysisContent>,
    plan: Vec<(BackendIdentity, Vec<Arc<GuardedBackend>>)>,
) {
    let mut handles = Vec::with_capacity(plan.len());
    for (identity, candidates) in plan {
        let tracker = Arc::clone(&tracker);
        let content = Arc::clone(&content);
        handles.push(tokio::spawn(async move {
            run_task(&tracker, job_id, identity, candidates, &content).await
        }));
    }

    let mut successes: Vec<(BackendIdentity, BackendAnalysis)> = Vec::new();
    let mut failures = 0usize;
    for handle in handles {
        match handle.await {
            Ok(Some(outcome)) => successes.push(outcome),
            Ok(None) => failures += 1,
            Err(join_err) => {
                error!(%job_id, error = %join_err, "Backend task panicked");
                failures += 1;
            }
        }
    }

    // A cancellation that landed while tasks were in flight already settled
    // the job and emitted its final event.
    if tracker.is_terminal(job_id) == Some(true) {
        return;
    }

    let status = if successes.is_empty() {
        // Total failure is terminal as `cancelled`, distinct from a
        // user-initiated cancel only in the error event below.
        JobStatus::Cancelled
    } else if failures == 0 {
        JobStatus::Completed
    } else {
        JobStatus::CompletedWithErrors
    };

    let result = if successes.is_empty() {
        warn!(%job_id, "Every backend failed, no consolidated result");
        notifier.publish(&PushEvent::AnalysisError {
            job_id,
            user_id: user_id.clone(),
            message: "All requested backends failed".to_string(),
        });
        None
    } else {
        Some(consolidate(&successes))
    };

    info!(%job_id, ?status, successes = successes.len(), failures, "Analysis job settled");
    tracker.mark_terminal(job_id, status, result);
}

/// Run one backend's task, walking the candidate chain until a success
///
/// Returns the raw result on success, None on failure. Failures stay inside
/// this task; nothing here can abort a sibling.
async fn run_task(
    tracker: &ProgressTracker,
    job_id: JobId,
    identity: BackendIdentity,
    candidates: Vec<Arc<GuardedBackend>>,
    content: &AnalysisContent,
) -> Option<(BackendIdentity, BackendAnalysis)> {
    tracker.update(job_id, identity, 10, TaskStatus::Processing, None);

    let mut last_error: Option<String> = None;
    for guard in candidates {
        match guard.analyze(content).await {
            Ok(analysis) => {
                if guard.identity() != identity {
                    info!(
                        %job_id,
                        requested = %identity,
                        served_by = %guard.identity(),
                        "Fallback backend served the request"
                    );
                }
                if tracker.update(job_id, identity, 100, TaskStatus::Completed, None) {
                    return Some((identity, analysis));
                }
                // The task went terminal underneath us (cancelled); drop
                // the late result.
                return None;
            }
            Err(err) => {
                warn!(%job_id, backend = %guard.identity(), error = %err, "Backend invocation failed");
                last_error = Some(err.to_string());
            }
        }
    }

    let message = last_error.unwrap_or_else(|| "No backend available".to_string());
    tracker.update(job_id, identity, 0, TaskStatus::Error, Some(message));
    None
}
