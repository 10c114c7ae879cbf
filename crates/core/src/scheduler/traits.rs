//! Trait definitions for the scheduler module.

use async_trait::async_trait;

use super::error::SchedulerError;
use super::types::{SchedulerState, SubmitRequest};

/// Gateway to an external batch scheduler.
///
/// Every call must return within a bounded time.
#[async_trait]
pub trait SchedulerGateway: Send + Sync {
    /// Returns the name of this gateway implementation.
    fn name(&self) -> &str;

    /// Submits a container job and returns its scheduler-assigned id.
    async fn submit(&self, request: &SubmitRequest) -> Result<u64, SchedulerError>;

    /// Returns the current state of a job. When several records exist for
    /// the id, the first one reported wins.
    async fn query_state(&self, job_id: u64) -> Result<SchedulerState, SchedulerError>;

    /// Requests cancellation of a job. Best effort.
    async fn cancel(&self, job_id: u64) -> Result<(), SchedulerError>;

    /// Returns the raw accounting report for a job.
    async fn fetch_accounting_report(&self, job_id: u64) -> Result<String, SchedulerError>;
}
