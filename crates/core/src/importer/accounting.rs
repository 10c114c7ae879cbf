//! Scheduler accounting report import.
//!
//! The report is the JSON job-accounting document of the batch scheduler
//! (`sacct --json`). Only the fields used for utilization metrics are read.

use serde::{Deserialize, Deserializer};
use tracing::debug;

use crate::job::Metrics;

use super::error::ImportError;

const ARTIFACT: &str = "scheduler accounting report";
const BYTES_PER_MEGABYTE: i64 = 1024 * 1024;

#[derive(Debug, Deserialize)]
struct AccountingReport {
    #[serde(default)]
    jobs: Vec<AccountingJob>,
}

#[derive(Debug, Default, Deserialize)]
struct AccountingJob {
    #[serde(default)]
    time: JobTime,
    #[serde(default)]
    tres: JobTres,
    #[serde(default)]
    steps: Vec<AccountingStep>,
}

#[derive(Debug, Default, Deserialize)]
struct JobTime {
    #[serde(default, deserialize_with = "slurm_number")]
    elapsed: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct JobTres {
    #[serde(default)]
    allocated: Vec<TresEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct AccountingStep {
    #[serde(default)]
    time: StepTime,
    #[serde(default)]
    tres: StepTres,
}

#[derive(Debug, Default, Deserialize)]
struct StepTime {
    #[serde(default)]
    total: Option<Duration>,
}

#[derive(Debug, Default, Deserialize)]
struct Duration {
    #[serde(default, deserialize_with = "slurm_number")]
    seconds: Option<i64>,
    #[serde(default, deserialize_with = "slurm_number")]
    microseconds: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct StepTres {
    #[serde(default)]
    requested: TresRequested,
}

#[derive(Debug, Default, Deserialize)]
struct TresRequested {
    #[serde(default)]
    total: Vec<TresEntry>,
}

#[derive(Debug, Deserialize)]
struct TresEntry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default, deserialize_with = "slurm_number")]
    count: Option<i64>,
}

impl TresEntry {
    /// `cpu`, `mem`, `energy`, or `gres:<name>` for generic resources.
    fn key(&self) -> String {
        let kind = self.kind.replace('/', ":");
        match self.name.as_deref().filter(|n| !n.is_empty()) {
            Some(name) if !kind.contains(':') => format!("{}:{}", kind, name),
            _ => kind,
        }
    }
}

/// Running sum that stays `None` until the first value is seen.
#[derive(Debug, Default, Clone, Copy)]
struct Sum(Option<i64>);

impl Sum {
    fn add(&mut self, value: Option<i64>) {
        if let Some(v) = value {
            self.0 = Some(self.0.unwrap_or(0).saturating_add(v));
        }
    }
}

/// Merges utilization counters from a raw accounting report into `metrics`.
///
/// Allocation fields and total runtime come from the first job record.
/// Per-step usage (CPU time, memory, GPU utilization, GPU memory, energy) is
/// summed across every step. GPU memory is reported in bytes and stored in
/// whole megabytes. Fields absent from the report are left untouched.
pub fn import_scheduler_metrics(raw: &str, mut metrics: Metrics) -> Result<Metrics, ImportError> {
    let report: AccountingReport = serde_json::from_str(raw)
        .map_err(|e| ImportError::parse_failure(ARTIFACT, e.to_string()))?;

    let job = report
        .jobs
        .into_iter()
        .next()
        .ok_or(ImportError::NoJobsReported)?;

    let mut usage = Metrics {
        total_runtime: job.time.elapsed,
        ..Default::default()
    };
    for entry in &job.tres.allocated {
        match entry.key().as_str() {
            "cpu" => usage.cpu_allocated = entry.count,
            "gres:gpu" => usage.gpu_allocated = entry.count,
            _ => {}
        }
    }

    let mut cpu_seconds = Sum::default();
    let mut mem = Sum::default();
    let mut energy = Sum::default();
    let mut gpu_util = Sum::default();
    let mut gpu_mem_bytes = Sum::default();

    for step in &job.steps {
        if let Some(total) = &step.time.total {
            let micros = total.microseconds.unwrap_or(0);
            cpu_seconds.add(Some(total.seconds.unwrap_or(0) + micros / 1_000_000));
        }
        for entry in &step.tres.requested.total {
            match entry.key().as_str() {
                "mem" => mem.add(entry.count),
                "energy" => energy.add(entry.count),
                "gres:gpuutil" => gpu_util.add(entry.count),
                "gres:gpumem" => gpu_mem_bytes.add(entry.count),
                _ => {}
            }
        }
    }

    usage.cpu_utilized = cpu_seconds.0;
    usage.mem_utilized = mem.0;
    usage.energy_consumed = energy.0;
    usage.gpu_utilized = gpu_util.0;
    usage.gpu_mem_utilized = gpu_mem_bytes
        .0
        .map(|bytes| bytes.div_euclid(BYTES_PER_MEGABYTE));

    if usage.is_empty() {
        debug!("Accounting report carried no usage fields");
    }
    metrics.merge(&usage);

    debug!(steps = job.steps.len(), "Merged scheduler accounting metrics");
    Ok(metrics)
}

/// Slurm emits numbers either bare or wrapped as `{"set": .., "number": ..}`.
fn slurm_number<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Float(f64),
        Wrapped {
            #[serde(default = "default_set")]
            set: bool,
            #[serde(default)]
            infinite: bool,
            #[serde(default)]
            number: Option<i64>,
        },
    }

    fn default_set() -> bool {
        true
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        None => None,
        Some(Raw::Int(n)) => Some(n),
        Some(Raw::Float(x)) => Some(x as i64),
        Some(Raw::Wrapped {
            set,
            infinite,
            number,
        }) => number.filter(|_| set && !infinite),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn report() -> serde_json::Value {
        json!({
            "jobs": [{
                "job_id": 4242,
                "time": { "elapsed": 3600 },
                "tres": {
                    "allocated": [
                        { "type": "cpu", "name": "", "id": 1, "count": 8 },
                        { "type": "mem", "name": "", "id": 2, "count": 32768 },
                        { "type": "gres", "name": "gpu", "id": 1001, "count": 1 }
                    ]
                },
                "steps": [
                    {
                        "time": { "total": { "seconds": 100, "microseconds": 2_500_000 } },
                        "tres": { "requested": { "total": [
                            { "type": "energy", "name": "", "count": 500 },
                            { "type": "mem", "name": "", "count": 1000 },
                            { "type": "gres", "name": "gpuutil", "count": 40 },
                            { "type": "gres", "name": "gpumem", "count": 2097152 }
                        ]}}
                    },
                    {
                        "time": { "total": { "seconds": 50, "microseconds": 0 } },
                        "tres": { "requested": { "total": [
                            { "type": "energy", "name": "", "count": 250 },
                            { "type": "mem", "name": "", "count": 3000 },
                            { "type": "gres", "name": "gpuutil", "count": 20 },
                            { "type": "gres", "name": "gpumem", "count": 1048576 }
                        ]}}
                    }
                ]
            }]
        })
    }

    #[test]
    fn test_merge_allocation_and_step_sums() {
        let metrics = import_scheduler_metrics(&report().to_string(), Metrics::default()).unwrap();

        assert_eq!(metrics.cpu_allocated, Some(8));
        assert_eq!(metrics.gpu_allocated, Some(1));
        assert_eq!(metrics.total_runtime, Some(3600));
        assert_eq!(metrics.cpu_utilized, Some(152));
        assert_eq!(metrics.mem_utilized, Some(4000));
        assert_eq!(metrics.energy_consumed, Some(750));
        assert_eq!(metrics.gpu_utilized, Some(60));
        assert_eq!(metrics.gpu_mem_utilized, Some(3));
    }

    #[test]
    fn test_merge_preserves_existing_fields() {
        let existing = Metrics {
            f1: Some(0.9),
            train_time: Some(1000),
            ..Default::default()
        };
        let metrics = import_scheduler_metrics(&report().to_string(), existing).unwrap();
        assert_eq!(metrics.f1, Some(0.9));
        assert_eq!(metrics.train_time, Some(1000));
        assert_eq!(metrics.gpu_mem_utilized, Some(3));
    }

    #[test]
    fn test_gpu_memory_is_floored() {
        let raw = json!({
            "jobs": [{
                "steps": [{
                    "tres": { "requested": { "total": [
                        { "type": "gres", "name": "gpumem", "count": 1048575 }
                    ]}}
                }]
            }]
        });
        let metrics = import_scheduler_metrics(&raw.to_string(), Metrics::default()).unwrap();
        assert_eq!(metrics.gpu_mem_utilized, Some(0));
        assert!(metrics.energy_consumed.is_none());
        assert!(metrics.cpu_allocated.is_none());
    }

    #[test]
    fn test_wrapped_numbers() {
        let raw = json!({
            "jobs": [{
                "time": { "elapsed": { "set": true, "infinite": false, "number": 90 } },
                "tres": { "allocated": [
                    { "type": "cpu", "count": { "set": true, "number": 4 } },
                    { "type": "gres/gpu", "count": 2 }
                ]}
            }]
        });
        let metrics = import_scheduler_metrics(&raw.to_string(), Metrics::default()).unwrap();
        assert_eq!(metrics.total_runtime, Some(90));
        assert_eq!(metrics.cpu_allocated, Some(4));
        assert_eq!(metrics.gpu_allocated, Some(2));
    }

    #[test]
    fn test_no_jobs_reported() {
        let err = import_scheduler_metrics(r#"{"jobs": []}"#, Metrics::default()).unwrap_err();
        assert!(matches!(err, ImportError::NoJobsReported));
    }

    #[test]
    fn test_malformed_report() {
        let err = import_scheduler_metrics("sacct: error", Metrics::default()).unwrap_err();
        assert!(matches!(err, ImportError::ParseFailure { .. }));
    }

    #[test]
    fn test_only_first_job_is_used() {
        let raw = json!({
            "jobs": [
                { "time": { "elapsed": 10 } },
                { "time": { "elapsed": 99 } }
            ]
        });
        let metrics = import_scheduler_metrics(&raw.to_string(), Metrics::default()).unwrap();
        assert_eq!(metrics.total_runtime, Some(10));
    }
}
