//! Mock scheduler gateway for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::scheduler::{SchedulerError, SchedulerGateway, SchedulerState, SubmitRequest};

/// A recorded submission for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedSubmission {
    pub request: SubmitRequest,
    /// Id handed back to the caller.
    pub job_id: u64,
}

/// Mock implementation of the SchedulerGateway trait.
///
/// Provides controllable behavior for testing:
/// - Track submissions, queries and cancellations
/// - Control the state reported per scheduler job id
/// - Simulate failures
///
/// Ids are handed out sequentially from 1000. Jobs without an explicit
/// state report PENDING.
#[derive(Debug)]
pub struct MockScheduler {
    submissions: Arc<RwLock<Vec<RecordedSubmission>>>,
    queries: Arc<RwLock<Vec<u64>>>,
    cancelled: Arc<RwLock<Vec<u64>>>,
    states: Arc<RwLock<HashMap<u64, SchedulerState>>>,
    reports: Arc<RwLock<HashMap<u64, String>>>,
    failing_queries: Arc<RwLock<HashSet<u64>>>,
    /// Submissions beyond this count fail.
    submit_limit: Arc<RwLock<Option<usize>>>,
    next_id: Arc<RwLock<u64>>,
}

impl Default for MockScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl MockScheduler {
    /// Create a new mock scheduler.
    pub fn new() -> Self {
        Self {
            submissions: Arc::new(RwLock::new(Vec::new())),
            queries: Arc::new(RwLock::new(Vec::new())),
            cancelled: Arc::new(RwLock::new(Vec::new())),
            states: Arc::new(RwLock::new(HashMap::new())),
            reports: Arc::new(RwLock::new(HashMap::new())),
            failing_queries: Arc::new(RwLock::new(HashSet::new())),
            submit_limit: Arc::new(RwLock::new(None)),
            next_id: Arc::new(RwLock::new(1000)),
        }
    }

    pub async fn submissions(&self) -> Vec<RecordedSubmission> {
        self.submissions.read().await.clone()
    }

    /// Scheduler ids whose state was queried, in order.
    pub async fn queries(&self) -> Vec<u64> {
        self.queries.read().await.clone()
    }

    pub async fn cancelled(&self) -> Vec<u64> {
        self.cancelled.read().await.clone()
    }

    pub async fn set_state(&self, job_id: u64, state: SchedulerState) {
        self.states.write().await.insert(job_id, state);
    }

    pub async fn set_accounting_report(&self, job_id: u64, report: impl Into<String>) {
        self.reports.write().await.insert(job_id, report.into());
    }

    /// Let the first `count` submissions succeed and fail every later one.
    pub async fn fail_submissions_after(&self, count: usize) {
        *self.submit_limit.write().await = Some(count);
    }

    /// Make state queries for `job_id` fail.
    pub async fn fail_query(&self, job_id: u64) {
        self.failing_queries.write().await.insert(job_id);
    }
}

#[async_trait]
impl SchedulerGateway for MockScheduler {
    fn name(&self) -> &str {
        "mock"
    }

    async fn submit(&self, request: &SubmitRequest) -> Result<u64, SchedulerError> {
        let mut submissions = self.submissions.write().await;
        if let Some(limit) = *self.submit_limit.read().await {
            if submissions.len() >= limit {
                return Err(SchedulerError::submission_failed(
                    "mock submission rejected",
                    Some("sbatch: error: Batch job submission failed".to_string()),
                ));
            }
        }

        let mut next_id = self.next_id.write().await;
        let job_id = *next_id;
        *next_id += 1;

        submissions.push(RecordedSubmission {
            request: request.clone(),
            job_id,
        });
        Ok(job_id)
    }

    async fn query_state(&self, job_id: u64) -> Result<SchedulerState, SchedulerError> {
        self.queries.write().await.push(job_id);
        if self.failing_queries.read().await.contains(&job_id) {
            return Err(SchedulerError::QueryFailed {
                job_id,
                reason: "mock query failure".to_string(),
            });
        }
        Ok(self
            .states
            .read()
            .await
            .get(&job_id)
            .cloned()
            .unwrap_or(SchedulerState::Pending))
    }

    async fn cancel(&self, job_id: u64) -> Result<(), SchedulerError> {
        self.cancelled.write().await.push(job_id);
        Ok(())
    }

    async fn fetch_accounting_report(&self, job_id: u64) -> Result<String, SchedulerError> {
        self.reports
            .read()
            .await
            .get(&job_id)
            .cloned()
            .ok_or_else(|| SchedulerError::AccountingFailed {
                job_id,
                reason: "no accounting data".to_string(),
            })
    }
}
