//! Slurm CLI-based scheduler gateway.

use async_trait::async_trait;
use std::path::Path;
use std::process::{Output, Stdio};
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

use super::args::{render_args, shell_word, Quoting};
use super::config::SchedulerConfig;
use super::error::SchedulerError;
use super::traits::SchedulerGateway;
use super::types::{SchedulerState, SubmitRequest};
use crate::metrics::SCHEDULER_COMMANDS;

/// Gateway that drives Slurm through `sbatch`, `sacct` and `scancel`.
pub struct SlurmGateway {
    config: SchedulerConfig,
}

impl SlurmGateway {
    /// Creates a new gateway with the given configuration.
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    /// Creates a gateway with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(SchedulerConfig::default())
    }

    /// Builds `sbatch` arguments for a submission.
    fn build_submit_args(&self, request: &SubmitRequest) -> Vec<String> {
        let mut args = vec![
            "--parsable".to_string(),
            format!("--job-name={}", request.name),
            format!("--output={}", request.output_path.display()),
            format!("--error={}", request.error_path.display()),
        ];

        args.extend(render_args(&request.resources, Quoting::Argv));

        if let Some(after) = request.depends_on {
            args.push(format!("--dependency=afterok:{}", after));
        }

        args.push(format!("--wrap={}", self.wrap_command(request)));
        args
    }

    /// The shell command line executed inside the allocation.
    fn wrap_command(&self, request: &SubmitRequest) -> String {
        let mut parts = vec![
            self.config.container_runtime.clone(),
            "run".to_string(),
            shell_word(&request.container_image.to_string_lossy()),
        ];
        parts.extend(request.args.iter().cloned());
        parts.join(" ")
    }

    /// Parses `sbatch --parsable` output: `<id>` or `<id>;<cluster>`.
    fn parse_submit_output(stdout: &str) -> Result<u64, SchedulerError> {
        let line = stdout.lines().map(str::trim).find(|l| !l.is_empty());
        let Some(line) = line else {
            return Err(SchedulerError::submission_failed(
                "sbatch printed no job id",
                None,
            ));
        };

        let id = line.split(';').next().unwrap_or(line).trim();
        id.parse::<u64>().map_err(|_| {
            SchedulerError::submission_failed(format!("unexpected sbatch output: {:?}", line), None)
        })
    }

    /// Parses `sacct --format=State --noheader --parsable2` output.
    ///
    /// Only the first record counts; it describes the allocation itself, the
    /// rest describe its steps.
    fn parse_state_output(stdout: &str) -> SchedulerState {
        let line = stdout
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or("");
        SchedulerState::parse(line)
    }

    /// Runs a scheduler command with the configured timeout.
    ///
    /// The child is killed if the timeout elapses.
    async fn run(
        &self,
        command: &'static str,
        program: &Path,
        args: &[String],
    ) -> Result<Output, SchedulerError> {
        debug!(command = %program.display(), ?args, "Running scheduler command");

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let result = match timeout(Duration::from_secs(self.config.timeout_secs), child).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(SchedulerError::CommandNotFound {
                    path: program.to_path_buf(),
                })
            }
            Ok(Err(e)) => Err(SchedulerError::Io(e)),
            Err(_) => Err(SchedulerError::Timeout {
                command: program.display().to_string(),
                timeout_secs: self.config.timeout_secs,
            }),
        };

        let ok = matches!(&result, Ok(output) if output.status.success());
        SCHEDULER_COMMANDS
            .with_label_values(&[command, if ok { "success" } else { "error" }])
            .inc();

        result
    }
}

fn stderr_text(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if stderr.is_empty() {
        format!("exited with {}", output.status)
    } else {
        stderr
    }
}

#[async_trait]
impl SchedulerGateway for SlurmGateway {
    fn name(&self) -> &str {
        "slurm"
    }

    async fn submit(&self, request: &SubmitRequest) -> Result<u64, SchedulerError> {
        let args = self.build_submit_args(request);
        let output = self.run("submit", &self.config.sbatch_path, &args).await?;

        if !output.status.success() {
            let stderr = stderr_text(&output);
            return Err(SchedulerError::submission_failed(
                format!("sbatch {}", output.status),
                Some(stderr),
            ));
        }

        let job_id = Self::parse_submit_output(&String::from_utf8_lossy(&output.stdout))?;
        info!(
            name = %request.name,
            scheduler_job_id = job_id,
            depends_on = ?request.depends_on,
            "Submitted scheduler job"
        );
        Ok(job_id)
    }

    async fn query_state(&self, job_id: u64) -> Result<SchedulerState, SchedulerError> {
        let args = vec![
            "-j".to_string(),
            job_id.to_string(),
            "--format=State".to_string(),
            "--noheader".to_string(),
            "--parsable2".to_string(),
        ];
        let output = self
            .run("query", &self.config.sacct_path, &args)
            .await
            .map_err(|e| match e {
                SchedulerError::Io(io) => SchedulerError::QueryFailed {
                    job_id,
                    reason: io.to_string(),
                },
                other => other,
            })?;

        if !output.status.success() {
            return Err(SchedulerError::QueryFailed {
                job_id,
                reason: stderr_text(&output),
            });
        }

        let state = Self::parse_state_output(&String::from_utf8_lossy(&output.stdout));
        debug!(scheduler_job_id = job_id, %state, "Queried scheduler job state");
        Ok(state)
    }

    async fn cancel(&self, job_id: u64) -> Result<(), SchedulerError> {
        let args = vec![job_id.to_string()];
        let output = self.run("cancel", &self.config.scancel_path, &args).await?;

        if !output.status.success() {
            let reason = stderr_text(&output);
            warn!(scheduler_job_id = job_id, %reason, "scancel failed");
            return Err(SchedulerError::CancelFailed { job_id, reason });
        }

        info!(scheduler_job_id = job_id, "Cancelled scheduler job");
        Ok(())
    }

    async fn fetch_accounting_report(&self, job_id: u64) -> Result<String, SchedulerError> {
        let args = vec!["-j".to_string(), job_id.to_string(), "--json".to_string()];
        let output = self
            .run("accounting", &self.config.sacct_path, &args)
            .await?;

        if !output.status.success() {
            return Err(SchedulerError::AccountingFailed {
                job_id,
                reason: stderr_text(&output),
            });
        }

        let report = String::from_utf8_lossy(&output.stdout).to_string();
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{ArgMap, ArgValue};
    use std::path::PathBuf;

    fn request() -> SubmitRequest {
        SubmitRequest {
            name: "erbench_filtering_42".to_string(),
            container_image: PathBuf::from("/containers/sparkly.sif"),
            args: vec![
                "/data/abt_buy".to_string(),
                "--k=50".to_string(),
                "--blocker='minhash lsh'".to_string(),
            ],
            output_path: PathBuf::from("/work/erbench_job_42/filtering.out"),
            error_path: PathBuf::from("/work/erbench_job_42/filtering.err"),
            resources: ArgMap::from([
                (
                    "partition".to_string(),
                    Some(ArgValue::Text("ampere".to_string())),
                ),
                ("gpus".to_string(), Some(ArgValue::Integer(1))),
                ("exclusive".to_string(), Some(ArgValue::Flag(false))),
            ]),
            depends_on: None,
        }
    }

    #[test]
    fn test_build_submit_args() {
        let gateway = SlurmGateway::with_defaults();
        let args = gateway.build_submit_args(&request());

        assert_eq!(args[0], "--parsable");
        assert!(args.contains(&"--job-name=erbench_filtering_42".to_string()));
        assert!(args.contains(&"--output=/work/erbench_job_42/filtering.out".to_string()));
        assert!(args.contains(&"--error=/work/erbench_job_42/filtering.err".to_string()));
        assert!(args.contains(&"--gpus=1".to_string()));
        assert!(args.contains(&"--partition=ampere".to_string()));
        assert!(!args.iter().any(|a| a.starts_with("--exclusive")));
        assert!(!args.iter().any(|a| a.starts_with("--dependency")));
        assert_eq!(
            args.last().unwrap(),
            "--wrap=apptainer run /containers/sparkly.sif /data/abt_buy --k=50 --blocker='minhash lsh'"
        );
    }

    #[test]
    fn test_build_submit_args_with_dependency() {
        let gateway = SlurmGateway::with_defaults();
        let args = gateway.build_submit_args(&request().after(1001));
        assert!(args.contains(&"--dependency=afterok:1001".to_string()));
    }

    #[test]
    fn test_parse_submit_output() {
        assert_eq!(SlurmGateway::parse_submit_output("12345\n").unwrap(), 12345);
        assert_eq!(
            SlurmGateway::parse_submit_output("12345;cluster\n").unwrap(),
            12345
        );
        assert!(SlurmGateway::parse_submit_output("").is_err());
        assert!(SlurmGateway::parse_submit_output("Submitted batch job 1").is_err());
    }

    #[test]
    fn test_parse_state_output_uses_first_record() {
        assert_eq!(
            SlurmGateway::parse_state_output("RUNNING\nRUNNING\nCOMPLETED\n"),
            SchedulerState::Running
        );
        assert_eq!(
            SlurmGateway::parse_state_output("\nCANCELLED by 1000\n"),
            SchedulerState::Failed
        );
        assert_eq!(
            SlurmGateway::parse_state_output(""),
            SchedulerState::Other("UNKNOWN".to_string())
        );
    }

    #[cfg(unix)]
    mod commands {
        use super::*;
        use std::os::unix::fs::PermissionsExt;
        use tempfile::TempDir;

        fn script(dir: &TempDir, name: &str, body: &str) {
            let path = dir.path().join(name);
            std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        }

        fn gateway(dir: &TempDir) -> SlurmGateway {
            SlurmGateway::new(
                SchedulerConfig::default()
                    .with_bin_dir(dir.path())
                    .with_timeout(5),
            )
        }

        #[tokio::test]
        async fn test_submit_parses_id() {
            let dir = TempDir::new().unwrap();
            script(&dir, "sbatch", "echo '4711;cluster'");
            let id = gateway(&dir).submit(&request()).await.unwrap();
            assert_eq!(id, 4711);
        }

        #[tokio::test]
        async fn test_submit_failure_carries_stderr() {
            let dir = TempDir::new().unwrap();
            script(&dir, "sbatch", "echo 'invalid partition' >&2; exit 1");
            let err = gateway(&dir).submit(&request()).await.unwrap_err();
            match err {
                SchedulerError::SubmissionFailed { stderr, .. } => {
                    assert_eq!(stderr.as_deref(), Some("invalid partition"));
                }
                other => panic!("unexpected error: {other}"),
            }
        }

        #[tokio::test]
        async fn test_query_state() {
            let dir = TempDir::new().unwrap();
            script(&dir, "sacct", "printf 'COMPLETED\\nCOMPLETED\\n'");
            let state = gateway(&dir).query_state(7).await.unwrap();
            assert_eq!(state, SchedulerState::Completed);
        }

        #[tokio::test]
        async fn test_query_failure() {
            let dir = TempDir::new().unwrap();
            script(&dir, "sacct", "echo 'slurmdbd down' >&2; exit 1");
            let err = gateway(&dir).query_state(7).await.unwrap_err();
            assert!(matches!(err, SchedulerError::QueryFailed { job_id: 7, .. }));
        }

        #[tokio::test]
        async fn test_command_timeout() {
            let dir = TempDir::new().unwrap();
            script(&dir, "scancel", "sleep 5");
            let gateway = SlurmGateway::new(
                SchedulerConfig::default()
                    .with_bin_dir(dir.path())
                    .with_timeout(1),
            );
            let err = gateway.cancel(7).await.unwrap_err();
            assert!(matches!(err, SchedulerError::Timeout { .. }));
        }

        #[tokio::test]
        async fn test_missing_binary() {
            let dir = TempDir::new().unwrap();
            let err = gateway(&dir).cancel(7).await.unwrap_err();
            assert!(matches!(err, SchedulerError::CommandNotFound { .. }));
        }

        #[tokio::test]
        async fn test_fetch_accounting_report() {
            let dir = TempDir::new().unwrap();
            script(&dir, "sacct", "echo '{\"jobs\": []}'");
            let report = gateway(&dir).fetch_accounting_report(7).await.unwrap();
            assert_eq!(report.trim(), "{\"jobs\": []}");
        }
    }
}
