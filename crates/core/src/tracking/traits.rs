//! Trait definitions for the tracking client.

use async_trait::async_trait;

use super::error::TrackingError;
use crate::job::{Job, JobStatus, Metrics, Prediction};

/// Operations the orchestrator needs from the tracking service.
///
/// Implementations must bound every call with a timeout and report non-2xx
/// answers as errors.
#[async_trait]
pub trait TrackingClient: Send + Sync {
    /// Fetches every job known to the service.
    async fn list_jobs(&self) -> Result<Vec<Job>, TrackingError>;

    /// Sets the status of a job, optionally recording the scheduler ids of
    /// its two stages.
    async fn update_job(
        &self,
        job_id: &str,
        status: JobStatus,
        filtering_scheduler_id: Option<u64>,
        matching_scheduler_id: Option<u64>,
    ) -> Result<(), TrackingError>;

    /// Pushes a (possibly partial) result set together with a status.
    async fn push_results(
        &self,
        job_id: &str,
        status: JobStatus,
        metrics: &Metrics,
    ) -> Result<(), TrackingError>;

    /// Replaces the prediction set of a job.
    async fn push_predictions(
        &self,
        job_id: &str,
        predictions: &[Prediction],
    ) -> Result<(), TrackingError>;
}
