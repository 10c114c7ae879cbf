//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of every external collaborator
//! of the orchestrator, allowing full sweep scenarios without a cluster,
//! tracking service or mail server.
//!
//! # Example
//!
//! ```rust,ignore
//! use erbench_core::testing::{fixtures, MockScheduler, MockTrackingClient};
//!
//! let tracking = Arc::new(MockTrackingClient::new());
//! let scheduler = Arc::new(MockScheduler::new());
//!
//! tracking.add_job(fixtures::submitted_job("1", JobStatus::Queued, 10, 11)).await;
//! scheduler.set_state(10, SchedulerState::Running).await;
//!
//! let report = orchestrator.run_sweep().await?;
//! ```

mod mock_notifier;
mod mock_scheduler;
mod mock_tracking;

pub use mock_notifier::MockNotifier;
pub use mock_scheduler::{MockScheduler, RecordedSubmission};
pub use mock_tracking::{MockTrackingClient, RecordedResults, RecordedUpdate};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::Path;

    use serde_json::json;

    use crate::job::{AlgorithmRef, ArgMap, ArgValue, DatasetRef, Job, JobStatus};
    use crate::orchestrator::PathsConfig;

    /// A PENDING job on `abt_buy` with `sparkly` filtering and `ditto` matching.
    pub fn pending_job(id: &str) -> Job {
        Job {
            id: id.to_string(),
            status: JobStatus::Pending,
            dataset: DatasetRef {
                code: "abt_buy".to_string(),
                name: Some("Abt-Buy".to_string()),
            },
            filtering_algo: AlgorithmRef {
                code: "sparkly".to_string(),
                name: Some("Sparkly".to_string()),
            },
            filtering_params: ArgMap::from([
                ("k".to_string(), Some(ArgValue::Integer(50))),
                ("use_gpu".to_string(), Some(ArgValue::Flag(true))),
            ]),
            matching_algo: AlgorithmRef {
                code: "ditto".to_string(),
                name: Some("Ditto".to_string()),
            },
            matching_params: ArgMap::from([
                ("epochs".to_string(), Some(ArgValue::Integer(10))),
                ("lr".to_string(), Some(ArgValue::Float(0.0003))),
                ("seed".to_string(), None),
            ]),
            filtering_scheduler_id: None,
            matching_scheduler_id: None,
            notify_email: None,
        }
    }

    /// A job whose stages were submitted as `filtering_id` and `matching_id`.
    pub fn submitted_job(id: &str, status: JobStatus, filtering_id: u64, matching_id: u64) -> Job {
        Job {
            status,
            filtering_scheduler_id: Some(filtering_id),
            matching_scheduler_id: Some(matching_id),
            ..pending_job(id)
        }
    }

    /// Creates the dataset directory and one container image per algorithm.
    pub fn install_inputs(paths: &PathsConfig, dataset: &str, algorithms: &[&str]) {
        std::fs::create_dir_all(paths.datasets_dir.join(dataset)).unwrap();
        std::fs::create_dir_all(&paths.containers_dir).unwrap();
        std::fs::create_dir_all(&paths.work_dir).unwrap();
        for code in algorithms {
            touch(&paths.containers_dir.join(format!("{}.sif", code)));
        }
    }

    fn touch(path: &Path) {
        std::fs::write(path, b"").unwrap();
    }

    /// A minimal `sacct --json` document for one job with one step per
    /// GPU memory value (bytes).
    pub fn accounting_report(elapsed_secs: i64, gpu_mem_bytes: &[i64]) -> String {
        let steps: Vec<_> = gpu_mem_bytes
            .iter()
            .map(|bytes| {
                json!({
                    "time": { "total": { "seconds": 60, "microseconds": 0 } },
                    "tres": { "requested": { "total": [
                        { "type": "gres", "name": "gpumem", "count": bytes },
                        { "type": "energy", "name": "", "count": 100 }
                    ]}}
                })
            })
            .collect();

        json!({
            "jobs": [{
                "time": { "elapsed": elapsed_secs },
                "tres": { "allocated": [
                    { "type": "cpu", "name": "", "count": 8 },
                    { "type": "gres", "name": "gpu", "count": 1 }
                ]},
                "steps": steps
            }]
        })
        .to_string()
    }
}
