mod metrics;
mod server;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use erbench_core::{
    config_path_from_env, load_config, validate_config, Config, EmailNotifier,
    HttpTrackingClient, JobOrchestrator, JobStatus, Notifier, SanitizedConfig, SlurmGateway,
    SweepReport,
};

/// Application version
pub(crate) const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Set to `json` for JSON log lines.
const LOG_FORMAT_ENV: &str = "ERBENCH_LOG_FORMAT";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    /// One sweep over all jobs, then exit.
    Sweep,
    /// Sweep every poll interval until interrupted.
    Watch,
    /// Import the final results of one job from a directory.
    Import {
        job_id: String,
        dir: PathBuf,
        scheduler_id: Option<u64>,
    },
}

impl Command {
    fn parse<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        let command = match args.next().as_deref() {
            None | Some("sweep") => Command::Sweep,
            Some("watch") => Command::Watch,
            Some("import") => {
                let (Some(job_id), Some(dir)) = (args.next(), args.next()) else {
                    bail!("usage: erbench import <job_id> <dir> [scheduler_job_id]");
                };
                let scheduler_id = args
                    .next()
                    .map(|raw| {
                        raw.parse::<u64>()
                            .with_context(|| format!("Invalid scheduler job id: {:?}", raw))
                    })
                    .transpose()?;
                Command::Import {
                    job_id,
                    dir: PathBuf::from(dir),
                    scheduler_id,
                }
            }
            Some(other) => bail!(
                "unknown command {:?} (expected sweep, watch or import)",
                other
            ),
        };

        if let Some(extra) = args.next() {
            bail!("unexpected argument {:?}", extra);
        }
        Ok(command)
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    init_logging();

    let command = Command::parse(std::env::args().skip(1))?;

    let config_path = config_path_from_env();
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;
    validate_config(&config).context("Configuration validation failed")?;

    let sanitized = SanitizedConfig::from(&config);
    info!(
        config = %serde_json::to_string(&sanitized).unwrap_or_default(),
        "Configuration loaded successfully"
    );

    let orchestrator = Arc::new(build_orchestrator(&config)?);

    match command {
        Command::Sweep => {
            let report = orchestrator.run_sweep().await.context("Sweep failed")?;
            log_report(&report);
        }
        Command::Watch => watch(&config, orchestrator).await?,
        Command::Import {
            job_id,
            dir,
            scheduler_id,
        } => {
            let metrics = orchestrator
                .import_completed(&job_id, &dir, scheduler_id)
                .await
                .with_context(|| format!("Failed to import results for job {}", job_id))?;
            info!(
                job_id = %job_id,
                f1 = ?metrics.f1,
                "Results imported"
            );
        }
    }

    Ok(())
}

fn init_logging() {
    let json = std::env::var(LOG_FORMAT_ENV).is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();
}

fn build_orchestrator(config: &Config) -> Result<JobOrchestrator> {
    let tracking = HttpTrackingClient::new(&config.tracking)
        .context("Failed to create tracking client")?;
    info!("Using tracking service at {}", config.tracking.base_url);

    let scheduler = SlurmGateway::new(config.scheduler.clone());

    let mut orchestrator = JobOrchestrator::new(
        config.orchestrator.clone(),
        config.paths.clone(),
        Arc::new(tracking),
        Arc::new(scheduler),
    )
    .with_resources(config.scheduler.resources.clone());

    match &config.notifier {
        Some(notifier_config) => {
            info!(
                "Completion emails via {}:{}",
                notifier_config.smtp_host, notifier_config.smtp_port
            );
            let notifier: Arc<dyn Notifier> = Arc::new(EmailNotifier::new(notifier_config.clone()));
            orchestrator = orchestrator.with_notifier(notifier);
        }
        None => info!("Notifier not configured, completion emails disabled"),
    }

    Ok(orchestrator)
}

async fn watch(config: &Config, orchestrator: Arc<JobOrchestrator>) -> Result<()> {
    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let server = config.metrics.as_ref().map(|metrics_config| {
        let addr = metrics_config.listen;
        let orchestrator = Arc::clone(&orchestrator);
        let shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(async move { server::serve(addr, orchestrator, shutdown_rx).await })
    });

    orchestrator.start();
    info!("Watching jobs, press Ctrl+C to stop");

    shutdown_signal().await;

    info!("Stopping orchestrator...");
    orchestrator.stop().await;
    let _ = shutdown_tx.send(());

    if let Some(handle) = server {
        match handle.await {
            Ok(result) => result?,
            Err(e) => warn!("Metrics server task ended abnormally: {}", e),
        }
    }

    info!(
        sweeps = orchestrator.status().await.sweeps_completed,
        "Shutdown complete"
    );
    Ok(())
}

fn log_report(report: &SweepReport) {
    let failed = report.count_to(JobStatus::Failed);
    if report.failures.is_empty() {
        info!(
            transitions = report.transitions.len(),
            failed,
            "Sweep command finished"
        );
    } else {
        let deferred = report.failures.iter().filter(|f| !f.marked_failed).count();
        warn!(
            transitions = report.transitions.len(),
            failed,
            deferred,
            "Sweep command finished with job errors"
        );
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
