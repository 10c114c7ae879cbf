use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::{Path, PathBuf};

use super::{types::Config, ConfigError};

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "ERBENCH_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Path of the configuration file: `$ERBENCH_CONFIG` or `config.toml`.
pub fn config_path_from_env() -> PathBuf {
    std::env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Load configuration from file with environment variable overrides.
///
/// Nested keys are separated by a double underscore, so
/// `ERBENCH_TRACKING__API_KEY` overrides `tracking.api_key`.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed("ERBENCH_").split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
[tracking]
base_url = "http://localhost:3000"

[orchestrator]
poll_interval_secs = 10
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.tracking.base_url, "http://localhost:3000");
        assert_eq!(config.orchestrator.poll_interval_secs, 10);
    }

    #[test]
    fn test_load_config_from_str_missing_tracking() {
        let toml = r#"
[paths]
work_dir = "/tmp/jobs"
"#;
        let result = load_config_from_str(toml);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[tracking]
base_url = "https://erbench.example.org"
api_key = "secret"

[paths]
datasets_dir = "/srv/datasets"

[scheduler.resources]
partition = "gpu"
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.tracking.api_key.as_deref(), Some("secret"));
        assert_eq!(config.paths.datasets_dir, PathBuf::from("/srv/datasets"));
        assert_eq!(config.paths.work_dir, PathBuf::from("../running_jobs"));
        assert_eq!(config.scheduler.resources.len(), 1);
    }
}
