//! Mock tracking client for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::job::{Job, JobStatus, Metrics, Prediction};
use crate::tracking::{TrackingClient, TrackingError};

/// A recorded status update for test assertions.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedUpdate {
    pub job_id: String,
    pub status: JobStatus,
    pub filtering_scheduler_id: Option<u64>,
    pub matching_scheduler_id: Option<u64>,
}

/// A recorded result push for test assertions.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedResults {
    pub job_id: String,
    pub status: JobStatus,
    pub metrics: Metrics,
}

#[derive(Debug, Default)]
struct Failures {
    list: bool,
    updates: bool,
    pushes: bool,
}

/// Mock implementation of the TrackingClient trait.
///
/// Holds an in-memory job list and applies every successful update to it,
/// so consecutive sweeps observe the state the previous sweep left behind.
#[derive(Debug, Default)]
pub struct MockTrackingClient {
    jobs: Arc<RwLock<Vec<Job>>>,
    updates: Arc<RwLock<Vec<RecordedUpdate>>>,
    results: Arc<RwLock<Vec<RecordedResults>>>,
    predictions: Arc<RwLock<Vec<(String, Vec<Prediction>)>>>,
    failures: Arc<RwLock<Failures>>,
}

impl MockTrackingClient {
    /// Create a new mock tracking client with no jobs.
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_job(&self, job: Job) {
        self.jobs.write().await.push(job);
    }

    /// Current state of a job.
    pub async fn job(&self, job_id: &str) -> Option<Job> {
        self.jobs
            .read()
            .await
            .iter()
            .find(|j| j.id == job_id)
            .cloned()
    }

    pub async fn updates(&self) -> Vec<RecordedUpdate> {
        self.updates.read().await.clone()
    }

    pub async fn results(&self) -> Vec<RecordedResults> {
        self.results.read().await.clone()
    }

    pub async fn predictions(&self) -> Vec<(String, Vec<Prediction>)> {
        self.predictions.read().await.clone()
    }

    /// Make `list_jobs` fail.
    pub async fn fail_list(&self, fail: bool) {
        self.failures.write().await.list = fail;
    }

    /// Make `update_job` fail.
    pub async fn fail_updates(&self, fail: bool) {
        self.failures.write().await.updates = fail;
    }

    /// Make `push_results` and `push_predictions` fail.
    pub async fn fail_pushes(&self, fail: bool) {
        self.failures.write().await.pushes = fail;
    }

    async fn set_status(&self, job_id: &str, status: JobStatus) {
        if let Some(job) = self.jobs.write().await.iter_mut().find(|j| j.id == job_id) {
            job.status = status;
        }
    }
}

fn unavailable() -> TrackingError {
    TrackingError::Http {
        status: 503,
        body: "mock tracking service unavailable".to_string(),
    }
}

#[async_trait]
impl TrackingClient for MockTrackingClient {
    async fn list_jobs(&self) -> Result<Vec<Job>, TrackingError> {
        if self.failures.read().await.list {
            return Err(unavailable());
        }
        Ok(self.jobs.read().await.clone())
    }

    async fn update_job(
        &self,
        job_id: &str,
        status: JobStatus,
        filtering_scheduler_id: Option<u64>,
        matching_scheduler_id: Option<u64>,
    ) -> Result<(), TrackingError> {
        if self.failures.read().await.updates {
            return Err(unavailable());
        }

        self.updates.write().await.push(RecordedUpdate {
            job_id: job_id.to_string(),
            status,
            filtering_scheduler_id,
            matching_scheduler_id,
        });

        if let Some(job) = self.jobs.write().await.iter_mut().find(|j| j.id == job_id) {
            job.status = status;
            if filtering_scheduler_id.is_some() {
                job.filtering_scheduler_id = filtering_scheduler_id;
            }
            if matching_scheduler_id.is_some() {
                job.matching_scheduler_id = matching_scheduler_id;
            }
        }
        Ok(())
    }

    async fn push_results(
        &self,
        job_id: &str,
        status: JobStatus,
        metrics: &Metrics,
    ) -> Result<(), TrackingError> {
        if self.failures.read().await.pushes {
            return Err(unavailable());
        }

        self.results.write().await.push(RecordedResults {
            job_id: job_id.to_string(),
            status,
            metrics: metrics.clone(),
        });
        self.set_status(job_id, status).await;
        Ok(())
    }

    async fn push_predictions(
        &self,
        job_id: &str,
        predictions: &[Prediction],
    ) -> Result<(), TrackingError> {
        if self.failures.read().await.pushes {
            return Err(unavailable());
        }

        self.predictions
            .write()
            .await
            .push((job_id.to_string(), predictions.to_vec()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    #[tokio::test]
    async fn test_updates_apply_to_stored_jobs() {
        let client = MockTrackingClient::new();
        client.add_job(fixtures::pending_job("1")).await;

        client
            .update_job("1", JobStatus::Queued, Some(5), Some(6))
            .await
            .unwrap();
        let job = client.job("1").await.unwrap();
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.scheduler_ids(), Some((5, 6)));

        client
            .update_job("1", JobStatus::Filtering, None, None)
            .await
            .unwrap();
        let job = client.job("1").await.unwrap();
        assert_eq!(job.status, JobStatus::Filtering);
        assert_eq!(job.scheduler_ids(), Some((5, 6)));
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let client = MockTrackingClient::new();
        client.fail_pushes(true).await;
        let err = client
            .push_predictions("1", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, TrackingError::Http { status: 503, .. }));
        assert!(client.predictions().await.is_empty());
    }
}
