//! Types for the job orchestrator.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::importer::ImportError;
use crate::job::JobStatus;
use crate::scheduler::SchedulerError;
use crate::tracking::TrackingError;

/// Errors that can occur while evaluating a job.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// A dataset directory or container image is missing.
    #[error("{artifact} not found: {}", path.display())]
    ArtifactMissing {
        artifact: &'static str,
        path: PathBuf,
    },

    /// A submitted job has no recorded scheduler ids.
    #[error("job {job_id} is {status} but has no scheduler ids recorded")]
    MissingSchedulerId { job_id: String, status: JobStatus },

    /// Working directory I/O failed.
    #[error("working directory error at {}: {source}", path.display())]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Result import failed.
    #[error("import error: {0}")]
    Import(#[from] ImportError),

    /// Scheduler interaction failed.
    #[error("scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    /// Tracking service interaction failed.
    #[error("tracking service error: {0}")]
    Tracking(#[from] TrackingError),
}

impl OrchestratorError {
    /// Whether the job should be marked FAILED.
    ///
    /// Tracking errors are retried on the next sweep because the compute
    /// results are still on disk. Missing input artifacts leave a PENDING
    /// job untouched until they appear.
    pub fn marks_failed(&self) -> bool {
        !matches!(self, Self::Tracking(_) | Self::ArtifactMissing { .. })
    }

    /// Short label used in metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ArtifactMissing { .. } => "artifact_missing",
            Self::MissingSchedulerId { .. } => "missing_scheduler_id",
            Self::Workspace { .. } => "workspace",
            Self::Import(ImportError::MissingFile { .. }) => "result_missing",
            Self::Import(_) => "parse_failure",
            Self::Scheduler(e) => e.kind(),
            Self::Tracking(_) => "tracking",
        }
    }
}

/// A status change applied to a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub job_id: String,
    pub from: JobStatus,
    pub to: JobStatus,
}

impl Transition {
    pub fn new(job_id: impl Into<String>, from: JobStatus, to: JobStatus) -> Self {
        Self {
            job_id: job_id.into(),
            from,
            to,
        }
    }
}

/// A job whose evaluation failed during a sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobFailure {
    pub job_id: String,
    pub error: String,
    /// The job was marked FAILED as a result.
    pub marked_failed: bool,
}

/// Outcome of one sweep over all jobs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweepReport {
    /// Jobs returned by the tracking service.
    pub jobs_seen: usize,
    /// Jobs skipped because they are already terminal.
    pub skipped_terminal: usize,
    pub transitions: Vec<Transition>,
    pub failures: Vec<JobFailure>,
}

impl SweepReport {
    /// Transitions into `status`.
    pub fn count_to(&self, status: JobStatus) -> usize {
        self.transitions.iter().filter(|t| t.to == status).count()
    }
}

/// Current status of the orchestrator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrchestratorStatus {
    /// Whether the watch loop is running.
    pub running: bool,
    pub sweeps_completed: u64,
    pub last_sweep_at: Option<DateTime<Utc>>,
    pub last_sweep: Option<SweepReport>,
}
