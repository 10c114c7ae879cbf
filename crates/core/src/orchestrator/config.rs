//! Orchestrator configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the job orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Seconds between sweeps in watch mode.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Merge the scheduler's accounting report into the final results.
    #[serde(default = "default_true")]
    pub collect_accounting: bool,

    /// Remove a job's working directory after its final results are stored.
    #[serde(default = "default_true")]
    pub cleanup_work_dirs: bool,
}

fn default_poll_interval() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            collect_accounting: true,
            cleanup_work_dirs: true,
        }
    }
}
