//! Configuration for the scheduler gateway.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::job::{ArgMap, ArgValue};

/// Configuration for the Slurm CLI backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Path to the `sbatch` binary.
    #[serde(default = "default_sbatch_path")]
    pub sbatch_path: PathBuf,

    /// Path to the `sacct` binary.
    #[serde(default = "default_sacct_path")]
    pub sacct_path: PathBuf,

    /// Path to the `scancel` binary.
    #[serde(default = "default_scancel_path")]
    pub scancel_path: PathBuf,

    /// Container runtime invoked inside the batch job.
    #[serde(default = "default_container_runtime")]
    pub container_runtime: String,

    /// Timeout for a single scheduler command in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Scheduler-level submission options, e.g. `partition = "ampere"`.
    #[serde(default = "default_resources")]
    pub resources: ArgMap,
}

fn default_sbatch_path() -> PathBuf {
    PathBuf::from("sbatch")
}

fn default_sacct_path() -> PathBuf {
    PathBuf::from("sacct")
}

fn default_scancel_path() -> PathBuf {
    PathBuf::from("scancel")
}

fn default_container_runtime() -> String {
    "apptainer".to_string()
}

fn default_timeout() -> u64 {
    60
}

fn default_resources() -> ArgMap {
    ArgMap::from([
        (
            "partition".to_string(),
            Some(ArgValue::Text("ampere".to_string())),
        ),
        ("gpus".to_string(), Some(ArgValue::Integer(1))),
    ])
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            sbatch_path: default_sbatch_path(),
            sacct_path: default_sacct_path(),
            scancel_path: default_scancel_path(),
            container_runtime: default_container_runtime(),
            timeout_secs: default_timeout(),
            resources: default_resources(),
        }
    }
}

impl SchedulerConfig {
    /// Points all three scheduler commands into `bin_dir`.
    pub fn with_bin_dir(mut self, bin_dir: impl Into<PathBuf>) -> Self {
        let bin_dir = bin_dir.into();
        self.sbatch_path = bin_dir.join("sbatch");
        self.sacct_path = bin_dir.join("sacct");
        self.scancel_path = bin_dir.join("scancel");
        self
    }

    /// Sets the command timeout in seconds.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}
