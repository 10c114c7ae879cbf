use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Tracking section exists (enforced by serde) and points at an http(s) URL
/// - Timeouts and poll interval are not 0
/// - Notifier host and sender are set when the section is present
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let base_url = config.tracking.base_url.trim();
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        return Err(ConfigError::ValidationError(format!(
            "tracking.base_url must be an http(s) URL, got {:?}",
            config.tracking.base_url
        )));
    }
    if config.tracking.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "tracking.timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.scheduler.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "scheduler.timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.orchestrator.poll_interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "orchestrator.poll_interval_secs cannot be 0".to_string(),
        ));
    }

    if let Some(notifier) = &config.notifier {
        if notifier.smtp_host.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "notifier.smtp_host cannot be empty".to_string(),
            ));
        }
        if notifier.from_address.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "notifier.from_address cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}
