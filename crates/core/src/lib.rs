pub mod config;
pub mod importer;
pub mod job;
pub mod metrics;
pub mod notifier;
pub mod orchestrator;
pub mod scheduler;
pub mod testing;
pub mod tracking;

pub use config::{
    config_path_from_env, load_config, load_config_from_str, validate_config, Config, ConfigError,
    MetricsConfig, SanitizedConfig,
};
pub use importer::{
    import_filtering_results, import_predictions, import_results, import_scheduler_metrics,
    ImportError,
};
pub use job::{AlgorithmRef, ArgMap, ArgValue, DatasetRef, Job, JobStatus, Metrics, Prediction};
pub use notifier::{EmailNotifier, Notifier, NotifierConfig, NotifyError};
pub use orchestrator::{
    JobOrchestrator, OrchestratorConfig, OrchestratorError, OrchestratorStatus, PathsConfig,
    SweepReport, Transition,
};
pub use scheduler::{
    SchedulerConfig, SchedulerError, SchedulerGateway, SchedulerState, SlurmGateway,
    SubmitRequest,
};
pub use tracking::{HttpTrackingClient, TrackingClient, TrackingConfig, TrackingError};
