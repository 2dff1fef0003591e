//! Error surface of the orchestration engine
//!
//! Backend failures stay inside their ModelTask; only request-level
//! problems surface here.

use thiserror::Error;

use backend_sdk::BackendIdentity;

use crate::job::JobId;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors returned by the engine's request surface
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A job was requested with an empty backend list
    #[error("No backends selected for analysis")]
    NoBackendsSelected,

    /// A requested backend is not configured or not enabled
    #[error("Backend {0} is not configured or enabled")]
    NoSuchBackend(BackendIdentity),

    /// The job id is unknown
    #[error("Job {0} not found")]
    JobNotFound(JobId),

    /// No backend has completed yet, so there is nothing to consolidate
    #[error("Consolidated result for job {0} is not ready")]
    ResultNotReady(JobId),
}
