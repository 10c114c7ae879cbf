//! Filesystem layout: dataset directories, container images and per-job
//! working directories.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::job::{AlgorithmRef, DatasetRef};

use super::types::OrchestratorError;

/// Directory roots used to resolve job inputs and outputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// One sub-directory per dataset, named by dataset code.
    #[serde(default = "default_datasets_dir")]
    pub datasets_dir: PathBuf,
    /// One `<code>.sif` image per algorithm.
    #[serde(default = "default_containers_dir")]
    pub containers_dir: PathBuf,
    /// Parent of the per-job working directories.
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,
}

fn default_datasets_dir() -> PathBuf {
    PathBuf::from("../datasets")
}

fn default_containers_dir() -> PathBuf {
    PathBuf::from("../apptainer")
}

fn default_work_dir() -> PathBuf {
    PathBuf::from("../running_jobs")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            datasets_dir: default_datasets_dir(),
            containers_dir: default_containers_dir(),
            work_dir: default_work_dir(),
        }
    }
}

impl PathsConfig {
    /// Puts all three roots under `root` (`datasets/`, `containers/`, `jobs/`).
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            datasets_dir: root.join("datasets"),
            containers_dir: root.join("containers"),
            work_dir: root.join("jobs"),
        }
    }

    pub fn dataset_dir(&self, dataset: &DatasetRef) -> PathBuf {
        self.datasets_dir.join(&dataset.code)
    }

    pub fn container_image(&self, algorithm: &AlgorithmRef) -> PathBuf {
        self.containers_dir.join(format!("{}.sif", algorithm.code))
    }

    /// Working directory owned by one job.
    ///
    /// Path separators in the id are replaced so every job maps to a direct
    /// child of `work_dir`.
    pub fn job_dir(&self, job_id: &str) -> PathBuf {
        let safe: String = job_id
            .chars()
            .map(|c| if c == '/' || c == '\\' { '_' } else { c })
            .collect();
        self.work_dir.join(format!("erbench_job_{}", safe))
    }
}

/// Fails with `ArtifactMissing` unless `path` exists.
pub(crate) async fn require_artifact(
    artifact: &'static str,
    path: PathBuf,
) -> Result<PathBuf, OrchestratorError> {
    match tokio::fs::try_exists(&path).await {
        Ok(true) => Ok(path),
        Ok(false) => Err(OrchestratorError::ArtifactMissing { artifact, path }),
        Err(source) => Err(OrchestratorError::Workspace { path, source }),
    }
}

pub(crate) async fn create_job_dir(path: &Path) -> Result<(), OrchestratorError> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|source| OrchestratorError::Workspace {
            path: path.to_path_buf(),
            source,
        })?;
    debug!(path = %path.display(), "Created working directory");
    Ok(())
}

/// Removes a working directory. Failures are logged only.
pub(crate) async fn remove_job_dir(path: &Path) {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => info!(path = %path.display(), "Removed working directory"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "Working directory already gone");
        }
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove working directory"),
    }
}
