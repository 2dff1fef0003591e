//! # Analysis Engine
//!
//! Multi-backend AI content-analysis orchestration.
//!
//! A caller submits a piece of content and a set of backends; the engine
//! fans one concurrent task out per backend through that backend's shared
//! resilience guard, tracks per-task progress, pushes live events to
//! subscribers, and consolidates the surviving raw analyses into a single
//! result. One backend failing never takes the job down with it.
//!
//! ## Components
//!
//! - [`BackendRegistry`] — configured backends and the fallback chain
//! - [`AnalysisService`] — job submission, progress, results, cancellation
//! - [`ProgressTracker`] — authoritative per-job state with monotonic
//!   task transitions
//! - [`Notifier`] / [`ChannelNotifier`] — fire-and-forget push events
//! - [`consolidate`] — merges raw backend analyses, surfacing conflicts

pub mod aggregate;
pub mod error;
pub mod job;
pub mod notify;
pub mod orchestrator;
pub mod progress;
pub mod registry;

pub use aggregate::consolidate;
pub use error::{EngineError, Result};
pub use job::{AnalysisJob, ConsolidatedResult, JobId, JobStatus, ModelTask, TaskStatus};
pub use notify::{ChannelNotifier, NoopNotifier, Notifier, PushEvent};
pub use orchestrator::{AnalysisService, StartedAnalysis};
pub use progress::ProgressTracker;
pub use registry::BackendRegistry;

#[cfg(test)]
mod tests;
