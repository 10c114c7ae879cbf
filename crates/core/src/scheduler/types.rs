//! Types for the scheduler gateway.

use std::fmt;
use std::path::PathBuf;

use crate::job::ArgMap;

/// Run state of a scheduler job as reported by accounting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerState {
    Pending,
    Running,
    Completing,
    Completed,
    /// Failed, timed out, cancelled, or lost its node.
    Failed,
    /// Anything else, verbatim.
    Other(String),
}

impl SchedulerState {
    /// Parses one accounting state field such as `RUNNING`, `CANCELLED by 42`
    /// or `CANCELLED+`.
    pub fn parse(raw: &str) -> Self {
        let word = raw
            .split_whitespace()
            .next()
            .unwrap_or("")
            .trim_end_matches('+')
            .to_ascii_uppercase();

        match word.as_str() {
            "PENDING" | "REQUEUED" | "RESIZING" | "SUSPENDED" => Self::Pending,
            "RUNNING" => Self::Running,
            "COMPLETING" => Self::Completing,
            "COMPLETED" => Self::Completed,
            "FAILED" | "TIMEOUT" | "OUT_OF_MEMORY" | "OUT_OF_ME" | "NODE_FAIL" | "BOOT_FAIL"
            | "DEADLINE" | "PREEMPTED" | "CANCELLED" => Self::Failed,
            "" => Self::Other("UNKNOWN".to_string()),
            _ => Self::Other(word),
        }
    }

    /// Running or completing.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Running | Self::Completing)
    }
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("PENDING"),
            Self::Running => f.write_str("RUNNING"),
            Self::Completing => f.write_str("COMPLETING"),
            Self::Completed => f.write_str("COMPLETED"),
            Self::Failed => f.write_str("FAILED"),
            Self::Other(s) => f.write_str(s),
        }
    }
}

/// A container job to submit.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitRequest {
    /// Scheduler job name.
    pub name: String,
    /// Container image to run.
    pub container_image: PathBuf,
    /// Arguments passed to the container, already rendered and shell-safe.
    pub args: Vec<String>,
    /// File receiving the job's stdout.
    pub output_path: PathBuf,
    /// File receiving the job's stderr.
    pub error_path: PathBuf,
    /// Scheduler-level submission options.
    pub resources: ArgMap,
    /// Only start after this scheduler job completed successfully.
    pub depends_on: Option<u64>,
}

impl SubmitRequest {
    /// Returns the request with a run-after-success dependency on `job_id`.
    pub fn after(mut self, job_id: u64) -> Self {
        self.depends_on = Some(job_id);
        self
    }
}
