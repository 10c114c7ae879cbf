//! Error types for the scheduler module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while talking to the batch scheduler.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Scheduler command binary not found.
    #[error("Scheduler command not found: {path}")]
    CommandNotFound { path: PathBuf },

    /// Job submission was rejected or returned an unusable id.
    #[error("Job submission failed: {reason}")]
    SubmissionFailed {
        reason: String,
        stderr: Option<String>,
    },

    /// State query failed.
    #[error("Failed to query state of scheduler job {job_id}: {reason}")]
    QueryFailed { job_id: u64, reason: String },

    /// Cancellation request failed.
    #[error("Failed to cancel scheduler job {job_id}: {reason}")]
    CancelFailed { job_id: u64, reason: String },

    /// Accounting report could not be retrieved.
    #[error("Failed to fetch accounting report for scheduler job {job_id}: {reason}")]
    AccountingFailed { job_id: u64, reason: String },

    /// Command did not finish in time.
    #[error("{command} timed out after {timeout_secs} seconds")]
    Timeout { command: String, timeout_secs: u64 },

    /// I/O error while running a command.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SchedulerError {
    /// Creates a new submission failed error with stderr output.
    pub fn submission_failed(reason: impl Into<String>, stderr: Option<String>) -> Self {
        Self::SubmissionFailed {
            reason: reason.into(),
            stderr,
        }
    }

    /// Short label used in metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CommandNotFound { .. } => "command_not_found",
            Self::SubmissionFailed { .. } => "submission_failed",
            Self::QueryFailed { .. } => "query_failed",
            Self::CancelFailed { .. } => "cancel_failed",
            Self::AccountingFailed { .. } => "accounting_failed",
            Self::Timeout { .. } => "timeout",
            Self::Io(_) => "io",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SchedulerError::QueryFailed {
            job_id: 77,
            reason: "sacct exited with 1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to query state of scheduler job 77: sacct exited with 1"
        );

        let err = SchedulerError::Timeout {
            command: "sbatch".to_string(),
            timeout_secs: 60,
        };
        assert_eq!(err.to_string(), "sbatch timed out after 60 seconds");
        assert_eq!(err.kind(), "timeout");
    }
}
