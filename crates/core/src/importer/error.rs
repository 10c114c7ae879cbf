//! Error types for the importer module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while importing job artifacts.
#[derive(Debug, Error)]
pub enum ImportError {
    /// Expected artifact does not exist.
    #[error("Artifact not found: {path}")]
    MissingFile { path: PathBuf },

    /// Artifact exists but could not be interpreted.
    #[error("Failed to parse {artifact}: {reason}")]
    ParseFailure { artifact: String, reason: String },

    /// Accounting report contained no job records.
    #[error("Scheduler accounting report contains no jobs")]
    NoJobsReported,

    /// I/O error while reading an artifact.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ImportError {
    /// Creates a new parse failure error.
    pub fn parse_failure(artifact: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ParseFailure {
            artifact: artifact.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ImportError::MissingFile {
            path: PathBuf::from("/tmp/job/metrics.csv"),
        };
        assert_eq!(err.to_string(), "Artifact not found: /tmp/job/metrics.csv");

        let err = ImportError::parse_failure("predictions.csv", "row 3: bad tableA_id");
        assert_eq!(
            err.to_string(),
            "Failed to parse predictions.csv: row 3: bad tableA_id"
        );
    }
}
