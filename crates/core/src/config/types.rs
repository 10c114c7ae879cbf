use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::notifier::NotifierConfig;
use crate::orchestrator::{OrchestratorConfig, PathsConfig};
use crate::scheduler::SchedulerConfig;
use crate::tracking::TrackingConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    /// Completion emails; disabled when absent.
    #[serde(default)]
    pub notifier: Option<NotifierConfig>,
    #[serde(default)]
    pub metrics: Option<MetricsConfig>,
}

/// Metrics and health endpoint configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetricsConfig {
    /// Address the `/metrics` and `/health` endpoints listen on.
    pub listen: SocketAddr,
}

/// Sanitized config for logging (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub tracking: SanitizedTrackingConfig,
    pub paths: PathsConfig,
    pub scheduler: SchedulerConfig,
    pub orchestrator: OrchestratorConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notifier: Option<SanitizedNotifierConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricsConfig>,
}

/// Sanitized tracking config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedTrackingConfig {
    pub base_url: String,
    pub api_key_configured: bool,
    pub timeout_secs: u64,
}

/// Sanitized notifier config (credentials hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedNotifierConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub from_address: String,
    pub credentials_configured: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            tracking: SanitizedTrackingConfig {
                base_url: config.tracking.base_url.clone(),
                api_key_configured: config
                    .tracking
                    .api_key
                    .as_ref()
                    .is_some_and(|k| !k.is_empty()),
                timeout_secs: config.tracking.timeout_secs,
            },
            paths: config.paths.clone(),
            scheduler: config.scheduler.clone(),
            orchestrator: config.orchestrator.clone(),
            notifier: config.notifier.as_ref().map(|n| SanitizedNotifierConfig {
                smtp_host: n.smtp_host.clone(),
                smtp_port: n.smtp_port,
                from_address: n.from_address.clone(),
                credentials_configured: n.smtp_user.is_some() && n.smtp_password.is_some(),
            }),
            metrics: config.metrics.clone(),
        }
    }
}
