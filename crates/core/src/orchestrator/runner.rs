//! Job orchestrator implementation.
//!
//! One sweep fetches the job list once and evaluates every non-terminal job
//! sequentially. Each job is isolated: an error while evaluating one job is
//! logged, may mark that job FAILED, and never aborts the sweep.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::importer::{
    import_filtering_results, import_predictions, import_results, import_scheduler_metrics,
};
use crate::job::{ArgMap, Job, JobStatus, Metrics};
use crate::metrics::{
    result_label, JOB_ERRORS, JOB_TRANSITIONS, NOTIFICATIONS, SWEEPS_TOTAL, SWEEP_DURATION,
};
use crate::notifier::Notifier;
use crate::scheduler::{
    render_args, shell_word, Quoting, SchedulerGateway, SchedulerState, SubmitRequest,
};
use crate::tracking::TrackingClient;

use super::config::OrchestratorConfig;
use super::types::{JobFailure, OrchestratorError, OrchestratorStatus, SweepReport, Transition};
use super::workspace::{create_job_dir, remove_job_dir, require_artifact, PathsConfig};

/// Drives jobs from PENDING to COMPLETED or FAILED.
pub struct JobOrchestrator {
    config: OrchestratorConfig,
    paths: PathsConfig,
    resources: ArgMap,
    tracking: Arc<dyn TrackingClient>,
    scheduler: Arc<dyn SchedulerGateway>,
    notifier: Option<Arc<dyn Notifier>>,

    // Runtime state
    sweep_lock: Mutex<()>,
    running: AtomicBool,
    status: RwLock<OrchestratorStatus>,
    shutdown_tx: broadcast::Sender<()>,
}

impl JobOrchestrator {
    /// Create a new orchestrator.
    pub fn new(
        config: OrchestratorConfig,
        paths: PathsConfig,
        tracking: Arc<dyn TrackingClient>,
        scheduler: Arc<dyn SchedulerGateway>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            paths,
            resources: ArgMap::new(),
            tracking,
            scheduler,
            notifier: None,
            sweep_lock: Mutex::new(()),
            running: AtomicBool::new(false),
            status: RwLock::new(OrchestratorStatus::default()),
            shutdown_tx,
        }
    }

    /// Scheduler-level options sent with every submission.
    pub fn with_resources(mut self, resources: ArgMap) -> Self {
        self.resources = resources;
        self
    }

    /// Sends completion notices through `notifier`.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Get current orchestrator status.
    pub async fn status(&self) -> OrchestratorStatus {
        let mut status = self.status.read().await.clone();
        status.running = self.running.load(Ordering::Relaxed);
        status
    }

    /// Runs one sweep over all jobs.
    ///
    /// Only a failure to fetch the job list is returned as an error; per-job
    /// errors are collected in the report.
    pub async fn run_sweep(&self) -> Result<SweepReport, OrchestratorError> {
        let _guard = self.sweep_lock.lock().await;
        let started = Instant::now();
        SWEEPS_TOTAL.inc();

        let jobs = self.tracking.list_jobs().await?;
        let mut report = SweepReport {
            jobs_seen: jobs.len(),
            ..Default::default()
        };
        debug!(jobs = jobs.len(), "Starting sweep");

        for job in &jobs {
            if job.status.is_terminal() {
                report.skipped_terminal += 1;
                continue;
            }

            match self.evaluate_job(job).await {
                Ok(Some(transition)) => report.transitions.push(transition),
                Ok(None) => {}
                Err(e) => {
                    let failure = self.handle_job_error(job, e).await;
                    if failure.marked_failed {
                        report
                            .transitions
                            .push(Transition::new(&job.id, job.status, JobStatus::Failed));
                    }
                    report.failures.push(failure);
                }
            }
        }

        SWEEP_DURATION.observe(started.elapsed().as_secs_f64());

        info!(
            jobs = report.jobs_seen,
            skipped = report.skipped_terminal,
            transitions = report.transitions.len(),
            failures = report.failures.len(),
            "Sweep finished"
        );

        let mut status = self.status.write().await;
        status.sweeps_completed += 1;
        status.last_sweep_at = Some(Utc::now());
        status.last_sweep = Some(report.clone());

        Ok(report)
    }

    /// Catch-all for a job whose evaluation failed.
    async fn handle_job_error(&self, job: &Job, e: OrchestratorError) -> JobFailure {
        JOB_ERRORS.with_label_values(&[e.kind()]).inc();

        let mut marked_failed = false;
        if e.marks_failed() {
            error!(job_id = %job.id, status = %job.status, error = %e, "Job failed");
            match self
                .tracking
                .update_job(&job.id, JobStatus::Failed, None, None)
                .await
            {
                Ok(()) => {
                    JOB_TRANSITIONS
                        .with_label_values(&[JobStatus::Failed.as_str()])
                        .inc();
                    marked_failed = true;
                }
                Err(update_err) => {
                    error!(
                        job_id = %job.id,
                        error = %update_err,
                        "Failed to mark job as failed"
                    );
                }
            }
        } else {
            warn!(
                job_id = %job.id,
                status = %job.status,
                error = %e,
                "Job evaluation deferred to next sweep"
            );
        }

        JobFailure {
            job_id: job.id.clone(),
            error: e.to_string(),
            marked_failed,
        }
    }

    /// Decides and performs the next step for one job.
    pub async fn evaluate_job(&self, job: &Job) -> Result<Option<Transition>, OrchestratorError> {
        let transition = match job.status {
            JobStatus::Pending => self.start_job(job).await?,
            JobStatus::Queued | JobStatus::Filtering => self.check_filtering(job).await?,
            JobStatus::Matching => self.check_matching(job).await?,
            JobStatus::Completed | JobStatus::Failed => None,
            JobStatus::Unknown => {
                warn!(job_id = %job.id, "Job has an unrecognized status, skipping");
                None
            }
        };

        if let Some(t) = &transition {
            JOB_TRANSITIONS.with_label_values(&[t.to.as_str()]).inc();
            info!(job_id = %t.job_id, from = %t.from, to = %t.to, "Job transitioned");
        }
        Ok(transition)
    }

    /// PENDING: verify inputs, submit both stages, record their ids.
    async fn start_job(&self, job: &Job) -> Result<Option<Transition>, OrchestratorError> {
        let dataset_dir = require_artifact("dataset", self.paths.dataset_dir(&job.dataset)).await?;
        let filtering_image = require_artifact(
            "filtering container",
            self.paths.container_image(&job.filtering_algo),
        )
        .await?;
        let matching_image = require_artifact(
            "matching container",
            self.paths.container_image(&job.matching_algo),
        )
        .await?;

        let job_dir = self.paths.job_dir(&job.id);
        create_job_dir(&job_dir).await?;

        let filtering = self.stage_request(
            job,
            "filtering",
            filtering_image,
            &[dataset_dir.as_path(), job_dir.as_path()],
            &job.filtering_params,
            &job_dir,
        );
        let filtering_id = self.scheduler.submit(&filtering).await?;

        let matching = self
            .stage_request(
                job,
                "matching",
                matching_image,
                &[job_dir.as_path()],
                &job.matching_params,
                &job_dir,
            )
            .after(filtering_id);
        let matching_id = match self.scheduler.submit(&matching).await {
            Ok(id) => id,
            Err(e) => {
                self.cancel_quietly(&job.id, filtering_id).await;
                return Err(e.into());
            }
        };

        if let Err(e) = self
            .tracking
            .update_job(
                &job.id,
                JobStatus::Queued,
                Some(filtering_id),
                Some(matching_id),
            )
            .await
        {
            self.cancel_quietly(&job.id, matching_id).await;
            self.cancel_quietly(&job.id, filtering_id).await;
            return Err(e.into());
        }

        info!(
            job_id = %job.id,
            scheduler = self.scheduler.name(),
            filtering_id,
            matching_id,
            "Submitted filtering and matching stages"
        );
        Ok(Some(Transition::new(
            &job.id,
            JobStatus::Pending,
            JobStatus::Queued,
        )))
    }

    fn stage_request(
        &self,
        job: &Job,
        stage: &str,
        image: PathBuf,
        positional: &[&Path],
        params: &ArgMap,
        job_dir: &Path,
    ) -> SubmitRequest {
        let mut args: Vec<String> = positional
            .iter()
            .map(|p| shell_word(&p.to_string_lossy()))
            .collect();
        args.extend(render_args(params, Quoting::Shell));

        SubmitRequest {
            name: format!("erbench_{}_{}", stage, job.id),
            container_image: image,
            args,
            output_path: job_dir.join(format!("{}.out", stage)),
            error_path: job_dir.join(format!("{}.err", stage)),
            resources: self.resources.clone(),
            depends_on: None,
        }
    }

    /// QUEUED / FILTERING: follow the filtering stage.
    async fn check_filtering(&self, job: &Job) -> Result<Option<Transition>, OrchestratorError> {
        let (filtering_id, matching_id) = scheduler_ids(job)?;
        let state = self.scheduler.query_state(filtering_id).await?;
        debug!(job_id = %job.id, filtering_id, %state, "Filtering stage state");

        match state {
            state if state.is_active() => {
                if job.status == JobStatus::Filtering {
                    return Ok(None);
                }
                self.tracking
                    .update_job(&job.id, JobStatus::Filtering, None, None)
                    .await?;
                Ok(Some(Transition::new(
                    &job.id,
                    job.status,
                    JobStatus::Filtering,
                )))
            }
            SchedulerState::Completed => {
                let metrics = import_filtering_results(&self.paths.job_dir(&job.id)).await?;
                self.tracking
                    .push_results(&job.id, JobStatus::Matching, &metrics)
                    .await?;
                Ok(Some(Transition::new(
                    &job.id,
                    job.status,
                    JobStatus::Matching,
                )))
            }
            SchedulerState::Failed => {
                warn!(job_id = %job.id, filtering_id, "Filtering stage failed");
                self.cancel_quietly(&job.id, matching_id).await;
                self.tracking
                    .update_job(&job.id, JobStatus::Failed, None, None)
                    .await?;
                Ok(Some(Transition::new(&job.id, job.status, JobStatus::Failed)))
            }
            _ => Ok(None),
        }
    }

    /// MATCHING: follow the matching stage and import the final results.
    async fn check_matching(&self, job: &Job) -> Result<Option<Transition>, OrchestratorError> {
        let (_, matching_id) = scheduler_ids(job)?;
        let state = self.scheduler.query_state(matching_id).await?;
        debug!(job_id = %job.id, matching_id, %state, "Matching stage state");

        match state {
            SchedulerState::Completed => self.complete_job(job, matching_id).await.map(Some),
            SchedulerState::Failed => {
                warn!(job_id = %job.id, matching_id, "Matching stage failed");
                self.tracking
                    .update_job(&job.id, JobStatus::Failed, None, None)
                    .await?;
                Ok(Some(Transition::new(&job.id, job.status, JobStatus::Failed)))
            }
            _ => Ok(None),
        }
    }

    async fn complete_job(
        &self,
        job: &Job,
        matching_id: u64,
    ) -> Result<Transition, OrchestratorError> {
        let job_dir = self.paths.job_dir(&job.id);
        let accounting_id = self.config.collect_accounting.then_some(matching_id);
        let metrics = self.store_final_results(&job.id, &job_dir, accounting_id).await?;

        if let Some(recipient) = job.notification_target() {
            self.notify(recipient, job, &metrics).await;
        }
        if self.config.cleanup_work_dirs {
            remove_job_dir(&job_dir).await;
        }

        Ok(Transition::new(
            &job.id,
            job.status,
            JobStatus::Completed,
        ))
    }

    /// Imports final metrics, accounting and predictions from `dir`, then
    /// pushes predictions followed by the COMPLETED results.
    ///
    /// Nothing is pushed unless every import succeeded.
    async fn store_final_results(
        &self,
        job_id: &str,
        dir: &Path,
        scheduler_id: Option<u64>,
    ) -> Result<Metrics, OrchestratorError> {
        let mut metrics = import_results(dir).await?;

        if let Some(id) = scheduler_id {
            match self.scheduler.fetch_accounting_report(id).await {
                Ok(raw) => metrics = import_scheduler_metrics(&raw, metrics)?,
                Err(e) => warn!(
                    job_id,
                    scheduler_id = id,
                    error = %e,
                    "Accounting report unavailable, storing results without it"
                ),
            }
        }

        let predictions = import_predictions(dir).await?;

        self.tracking.push_predictions(job_id, &predictions).await?;
        self.tracking
            .push_results(job_id, JobStatus::Completed, &metrics)
            .await?;

        info!(
            job_id,
            predictions = predictions.len(),
            "Stored final results"
        );
        Ok(metrics)
    }

    /// Imports and stores the final results of a job from an arbitrary
    /// directory, without notification or cleanup.
    pub async fn import_completed(
        &self,
        job_id: &str,
        dir: &Path,
        scheduler_id: Option<u64>,
    ) -> Result<Metrics, OrchestratorError> {
        info!(job_id, dir = %dir.display(), ?scheduler_id, "Importing results");
        self.store_final_results(job_id, dir, scheduler_id).await
    }

    async fn notify(&self, recipient: &str, job: &Job, metrics: &Metrics) {
        let Some(notifier) = &self.notifier else {
            debug!(job_id = %job.id, "No notifier configured, skipping notification");
            return;
        };

        let result = notifier.notify_completed(recipient, job, metrics).await;
        NOTIFICATIONS
            .with_label_values(&[result_label(&result)])
            .inc();
        if let Err(e) = result {
            warn!(job_id = %job.id, error = %e, "Failed to send completion notification");
        }
    }

    async fn cancel_quietly(&self, job_id: &str, scheduler_id: u64) {
        if let Err(e) = self.scheduler.cancel(scheduler_id).await {
            warn!(job_id, scheduler_id, error = %e, "Failed to cancel scheduler job");
        }
    }

    /// Start the watch loop: a sweep now, then one every poll interval.
    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Orchestrator already running");
            return;
        }

        let orchestrator = Arc::clone(self);
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let interval = Duration::from_secs(self.config.poll_interval_secs);

        tokio::spawn(async move {
            info!(
                interval_secs = interval.as_secs(),
                scheduler = orchestrator.scheduler.name(),
                "Watch loop started"
            );
            loop {
                if let Err(e) = orchestrator.run_sweep().await {
                    error!(error = %e, "Sweep failed");
                }

                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Watch loop received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {
                        if !orchestrator.running.load(Ordering::Relaxed) {
                            break;
                        }
                    }
                }
            }
            info!("Watch loop stopped");
        });
    }

    /// Stop the watch loop. A sweep in progress finishes first.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Orchestrator not running");
            return;
        }

        info!("Stopping job orchestrator");
        let _ = self.shutdown_tx.send(());

        // Wait for an in-flight sweep.
        let _guard = self.sweep_lock.lock().await;
        info!("Job orchestrator stopped");
    }
}

fn scheduler_ids(job: &Job) -> Result<(u64, u64), OrchestratorError> {
    job.scheduler_ids()
        .ok_or_else(|| OrchestratorError::MissingSchedulerId {
            job_id: job.id.clone(),
            status: job.status,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::{FILTERING_METRICS_FILE, METRICS_FILE, PREDICTIONS_FILE};
    use crate::job::ArgValue;
    use crate::testing::fixtures;
    use crate::testing::{MockNotifier, MockScheduler, MockTrackingClient};
    use tempfile::TempDir;

    struct Harness {
        _root: TempDir,
        paths: PathsConfig,
        tracking: Arc<MockTrackingClient>,
        scheduler: Arc<MockScheduler>,
        notifier: Arc<MockNotifier>,
        orchestrator: JobOrchestrator,
    }

    fn harness() -> Harness {
        harness_with(OrchestratorConfig::default())
    }

    fn harness_with(config: OrchestratorConfig) -> Harness {
        let root = TempDir::new().unwrap();
        let paths = PathsConfig::under(root.path());
        fixtures::install_inputs(&paths, "abt_buy", &["sparkly", "ditto"]);

        let tracking = Arc::new(MockTrackingClient::new());
        let scheduler = Arc::new(MockScheduler::new());
        let notifier = Arc::new(MockNotifier::new());
        let orchestrator = JobOrchestrator::new(
            config,
            paths.clone(),
            tracking.clone(),
            scheduler.clone(),
        )
        .with_resources(ArgMap::from([(
            "partition".to_string(),
            Some(ArgValue::Text("ampere".to_string())),
        )]))
        .with_notifier(notifier.clone());

        Harness {
            _root: root,
            paths,
            tracking,
            scheduler,
            notifier,
            orchestrator,
        }
    }

    fn write_final_artifacts(dir: &Path) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(
            dir.join(METRICS_FILE),
            "f1,precision,recall,train_time,eval_time\n0.9,0.95,0.85,10.5,1.25\n",
        )
        .unwrap();
        std::fs::write(
            dir.join(PREDICTIONS_FILE),
            "tableA_id,tableB_id,label,prob_class1\n1,2,1,0.93\n3,4,0,0.12\n",
        )
        .unwrap();
    }

    #[tokio::test]
    async fn test_pending_job_is_submitted_and_queued() {
        let h = harness();
        let mut job = fixtures::pending_job("1");
        job.filtering_params
            .insert("blocker".to_string(), Some(ArgValue::Text("minhash lsh".to_string())));
        h.tracking.add_job(job).await;

        let report = h.orchestrator.run_sweep().await.unwrap();
        assert_eq!(report.count_to(JobStatus::Queued), 1);

        let submissions = h.scheduler.submissions().await;
        assert_eq!(submissions.len(), 2);
        let filtering = &submissions[0].request;
        let matching = &submissions[1].request;
        assert!(filtering.depends_on.is_none());
        assert_eq!(matching.depends_on, Some(submissions[0].job_id));
        assert!(filtering.args.contains(&"--blocker='minhash lsh'".to_string()));
        assert_eq!(
            filtering.args[0],
            h.paths.datasets_dir.join("abt_buy").to_string_lossy()
        );
        assert_eq!(filtering.output_path, h.paths.job_dir("1").join("filtering.out"));
        assert!(filtering.resources.contains_key("partition"));
        assert!(h.paths.job_dir("1").is_dir());

        let job = h.tracking.job("1").await.unwrap();
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.filtering_scheduler_id, Some(submissions[0].job_id));
        assert_eq!(job.matching_scheduler_id, Some(submissions[1].job_id));
    }

    #[tokio::test]
    async fn test_pending_job_with_missing_container_is_untouched() {
        let h = harness();
        let mut job = fixtures::pending_job("1");
        job.matching_algo.code = "unknown_matcher".to_string();
        h.tracking.add_job(job).await;

        let report = h.orchestrator.run_sweep().await.unwrap();
        assert!(report.transitions.is_empty());
        assert_eq!(report.failures.len(), 1);
        assert!(!report.failures[0].marked_failed);
        assert!(h.scheduler.submissions().await.is_empty());
        assert!(h.tracking.updates().await.is_empty());
        assert_eq!(h.tracking.job("1").await.unwrap().status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn test_matching_submit_failure_cancels_filtering() {
        let h = harness();
        h.tracking.add_job(fixtures::pending_job("1")).await;
        h.scheduler.fail_submissions_after(1).await;

        let report = h.orchestrator.run_sweep().await.unwrap();
        assert_eq!(report.count_to(JobStatus::Failed), 1);

        let submissions = h.scheduler.submissions().await;
        assert_eq!(submissions.len(), 1);
        assert_eq!(h.scheduler.cancelled().await, vec![submissions[0].job_id]);
    }

    #[tokio::test]
    async fn test_queued_update_failure_cancels_both_and_stays_pending() {
        let h = harness();
        h.tracking.add_job(fixtures::pending_job("1")).await;
        h.tracking.fail_updates(true).await;

        let report = h.orchestrator.run_sweep().await.unwrap();
        assert!(report.transitions.is_empty());
        assert!(!report.failures[0].marked_failed);
        assert_eq!(h.scheduler.cancelled().await.len(), 2);
        assert_eq!(h.tracking.job("1").await.unwrap().status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn test_running_filtering_moves_queued_to_filtering_once() {
        let h = harness();
        h.tracking
            .add_job(fixtures::submitted_job("1", JobStatus::Queued, 10, 11))
            .await;
        h.scheduler.set_state(10, SchedulerState::Running).await;

        let report = h.orchestrator.run_sweep().await.unwrap();
        assert_eq!(report.count_to(JobStatus::Filtering), 1);
        assert_eq!(h.tracking.updates().await.len(), 1);

        // Still running: no further calls.
        let report = h.orchestrator.run_sweep().await.unwrap();
        assert!(report.transitions.is_empty());
        assert_eq!(h.tracking.updates().await.len(), 1);
    }

    #[tokio::test]
    async fn test_completed_filtering_pushes_partial_results() {
        let h = harness();
        h.tracking
            .add_job(fixtures::submitted_job("1", JobStatus::Filtering, 10, 11))
            .await;
        h.scheduler.set_state(10, SchedulerState::Completed).await;
        h.scheduler.set_state(11, SchedulerState::Running).await;

        let dir = h.paths.job_dir("1");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join(FILTERING_METRICS_FILE),
            "f1,precision,recall,filtering_time,num_candidates,entries_tableA,entries_tableB,entries_matches\n\
             0.8,0.9,0.75,2.5,100,10,10,5\n",
        )
        .unwrap();

        let report = h.orchestrator.run_sweep().await.unwrap();
        assert_eq!(report.count_to(JobStatus::Matching), 1);

        let results = h.tracking.results().await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, JobStatus::Matching);
        assert_eq!(results[0].metrics.filtering_f1, Some(0.8));
        assert_eq!(results[0].metrics.filtering_time, Some(2500));
        assert!(dir.exists());
    }

    #[tokio::test]
    async fn test_failed_filtering_cancels_matching() {
        let h = harness();
        h.tracking
            .add_job(fixtures::submitted_job("1", JobStatus::Queued, 10, 11))
            .await;
        h.scheduler.set_state(10, SchedulerState::Failed).await;

        let report = h.orchestrator.run_sweep().await.unwrap();
        assert_eq!(report.count_to(JobStatus::Failed), 1);
        assert_eq!(h.scheduler.cancelled().await, vec![11]);
        assert!(h.tracking.results().await.is_empty());
        assert_eq!(h.tracking.job("1").await.unwrap().status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn test_completed_matching_stores_everything_and_cleans_up() {
        let h = harness();
        let mut job = fixtures::submitted_job("1", JobStatus::Matching, 10, 11);
        job.notify_email = Some("alice@example.org".to_string());
        h.tracking.add_job(job).await;
        h.scheduler.set_state(11, SchedulerState::Completed).await;
        h.scheduler
            .set_accounting_report(11, fixtures::accounting_report(3600, &[2_097_152, 1_048_576]))
            .await;

        let dir = h.paths.job_dir("1");
        write_final_artifacts(&dir);

        let report = h.orchestrator.run_sweep().await.unwrap();
        assert_eq!(report.count_to(JobStatus::Completed), 1);

        let predictions = h.tracking.predictions().await;
        assert_eq!(predictions.len(), 1);
        assert_eq!(predictions[0].1.len(), 2);

        let results = h.tracking.results().await;
        assert_eq!(results[0].status, JobStatus::Completed);
        assert_eq!(results[0].metrics.f1, Some(0.9));
        assert_eq!(results[0].metrics.train_time, Some(10500));
        assert_eq!(results[0].metrics.total_runtime, Some(3600));
        assert_eq!(results[0].metrics.gpu_mem_utilized, Some(3));

        assert_eq!(
            h.notifier.sent().await,
            vec![("alice@example.org".to_string(), "1".to_string())]
        );
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn test_missing_predictions_fail_job_without_push() {
        let h = harness();
        h.tracking
            .add_job(fixtures::submitted_job("1", JobStatus::Matching, 10, 11))
            .await;
        h.scheduler.set_state(11, SchedulerState::Completed).await;

        let dir = h.paths.job_dir("1");
        write_final_artifacts(&dir);
        std::fs::remove_file(dir.join(PREDICTIONS_FILE)).unwrap();

        let report = h.orchestrator.run_sweep().await.unwrap();
        assert_eq!(report.count_to(JobStatus::Failed), 1);
        assert!(h.tracking.predictions().await.is_empty());
        assert!(h.tracking.results().await.is_empty());
        assert!(dir.exists());
    }

    #[tokio::test]
    async fn test_predictions_push_failure_is_retried() {
        let h = harness();
        h.tracking
            .add_job(fixtures::submitted_job("1", JobStatus::Matching, 10, 11))
            .await;
        h.scheduler.set_state(11, SchedulerState::Completed).await;
        write_final_artifacts(&h.paths.job_dir("1"));
        h.tracking.fail_pushes(true).await;

        let report = h.orchestrator.run_sweep().await.unwrap();
        assert!(report.transitions.is_empty());
        assert!(!report.failures[0].marked_failed);
        assert_eq!(h.tracking.job("1").await.unwrap().status, JobStatus::Matching);
        assert!(h.paths.job_dir("1").exists());
        assert!(h.notifier.sent().await.is_empty());

        h.tracking.fail_pushes(false).await;
        let report = h.orchestrator.run_sweep().await.unwrap();
        assert_eq!(report.count_to(JobStatus::Completed), 1);
    }

    #[tokio::test]
    async fn test_accounting_fetch_failure_still_completes() {
        let h = harness();
        h.tracking
            .add_job(fixtures::submitted_job("1", JobStatus::Matching, 10, 11))
            .await;
        h.scheduler.set_state(11, SchedulerState::Completed).await;
        write_final_artifacts(&h.paths.job_dir("1"));

        let report = h.orchestrator.run_sweep().await.unwrap();
        assert_eq!(report.count_to(JobStatus::Completed), 1);
        let results = h.tracking.results().await;
        assert!(results[0].metrics.total_runtime.is_none());
    }

    #[tokio::test]
    async fn test_notification_failure_keeps_completed() {
        let h = harness_with(OrchestratorConfig {
            cleanup_work_dirs: false,
            ..Default::default()
        });
        let mut job = fixtures::submitted_job("1", JobStatus::Matching, 10, 11);
        job.notify_email = Some("alice@example.org".to_string());
        h.tracking.add_job(job).await;
        h.scheduler.set_state(11, SchedulerState::Completed).await;
        write_final_artifacts(&h.paths.job_dir("1"));
        h.notifier.fail(true).await;

        let report = h.orchestrator.run_sweep().await.unwrap();
        assert_eq!(report.count_to(JobStatus::Completed), 1);
        assert!(report.failures.is_empty());
        assert!(h.paths.job_dir("1").exists());
    }

    #[tokio::test]
    async fn test_failed_matching_marks_failed() {
        let h = harness();
        h.tracking
            .add_job(fixtures::submitted_job("1", JobStatus::Matching, 10, 11))
            .await;
        h.scheduler.set_state(11, SchedulerState::Failed).await;

        let report = h.orchestrator.run_sweep().await.unwrap();
        assert_eq!(report.count_to(JobStatus::Failed), 1);
        assert!(h.tracking.results().await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_scheduler_ids_marks_failed() {
        let h = harness();
        let mut job = fixtures::submitted_job("1", JobStatus::Matching, 10, 11);
        job.filtering_scheduler_id = None;
        job.matching_scheduler_id = None;
        h.tracking.add_job(job).await;

        let report = h.orchestrator.run_sweep().await.unwrap();
        assert_eq!(report.count_to(JobStatus::Failed), 1);
        assert!(h.scheduler.queries().await.is_empty());
    }

    #[tokio::test]
    async fn test_query_failure_is_isolated_per_job() {
        let h = harness();
        h.tracking
            .add_job(fixtures::submitted_job("1", JobStatus::Filtering, 10, 11))
            .await;
        h.tracking
            .add_job(fixtures::submitted_job("2", JobStatus::Queued, 20, 21))
            .await;
        h.scheduler.fail_query(10).await;
        h.scheduler.set_state(20, SchedulerState::Running).await;

        let report = h.orchestrator.run_sweep().await.unwrap();
        assert_eq!(report.failures.len(), 1);
        assert_eq!(h.tracking.job("1").await.unwrap().status, JobStatus::Failed);
        assert_eq!(h.tracking.job("2").await.unwrap().status, JobStatus::Filtering);
    }

    #[tokio::test]
    async fn test_terminal_jobs_are_never_touched() {
        let h = harness();
        h.tracking
            .add_job(fixtures::submitted_job("1", JobStatus::Failed, 10, 11))
            .await;
        h.tracking
            .add_job(fixtures::submitted_job("2", JobStatus::Completed, 20, 21))
            .await;

        for _ in 0..3 {
            let report = h.orchestrator.run_sweep().await.unwrap();
            assert_eq!(report.skipped_terminal, 2);
        }
        assert!(h.scheduler.submissions().await.is_empty());
        assert!(h.scheduler.queries().await.is_empty());
        assert!(h.tracking.updates().await.is_empty());
    }

    #[tokio::test]
    async fn test_list_failure_aborts_sweep() {
        let h = harness();
        h.tracking.fail_list(true).await;
        let err = h.orchestrator.run_sweep().await.unwrap_err();
        assert!(matches!(err, OrchestratorError::Tracking(_)));
    }

    #[tokio::test]
    async fn test_import_completed_pushes_without_cleanup() {
        let h = harness();
        let dir = h.paths.work_dir.join("manual");
        write_final_artifacts(&dir);

        let metrics = h
            .orchestrator
            .import_completed("9", &dir, None)
            .await
            .unwrap();
        assert_eq!(metrics.recall, Some(0.85));
        assert_eq!(h.tracking.results().await[0].job_id, "9");
        assert_eq!(h.tracking.predictions().await[0].0, "9");
        assert!(dir.exists());
        assert!(h.notifier.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_status_tracks_sweeps() {
        let h = harness();
        assert_eq!(h.orchestrator.status().await.sweeps_completed, 0);
        h.orchestrator.run_sweep().await.unwrap();
        let status = h.orchestrator.status().await;
        assert_eq!(status.sweeps_completed, 1);
        assert!(status.last_sweep_at.is_some());
        assert!(!status.running);
    }
}
