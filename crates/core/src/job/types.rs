//! Core job data types.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

// ============================================================================
// Status
// ============================================================================

/// Lifecycle status of a job as stored by the tracking service.
///
/// `Pending` is initial, `Completed` and `Failed` are terminal. Transitions
/// are owned by the orchestrator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Queued,
    Filtering,
    Matching,
    Completed,
    Failed,
    /// Any status string this build does not know about.
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    /// Lower-case wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Queued => "queued",
            Self::Filtering => "filtering",
            Self::Matching => "matching",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
        }
    }

    /// Terminal statuses are never re-evaluated.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Arguments
// ============================================================================

/// A scalar algorithm or scheduler option value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ArgValue {
    Flag(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flag(b) => write!(f, "{}", b),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Option name to value. `None` means the option was sent as `null`.
pub type ArgMap = BTreeMap<String, Option<ArgValue>>;

// ============================================================================
// References
// ============================================================================

/// Dataset the job runs against. `code` names its directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatasetRef {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Filtering or matching algorithm. `code` names its container image.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AlgorithmRef {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

// ============================================================================
// Job
// ============================================================================

/// An entity-resolution experiment: a filtering stage followed by a
/// matching stage on one dataset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub status: JobStatus,
    pub dataset: DatasetRef,
    pub filtering_algo: AlgorithmRef,
    #[serde(default, deserialize_with = "null_as_default")]
    pub filtering_params: ArgMap,
    pub matching_algo: AlgorithmRef,
    #[serde(default, deserialize_with = "null_as_default")]
    pub matching_params: ArgMap,
    /// Scheduler id of the filtering stage, set once submitted.
    #[serde(
        default,
        rename = "filteringSlurmId",
        deserialize_with = "lenient_scheduler_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub filtering_scheduler_id: Option<u64>,
    /// Scheduler id of the matching stage, set once submitted.
    #[serde(
        default,
        rename = "matchingSlurmId",
        deserialize_with = "lenient_scheduler_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub matching_scheduler_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notify_email: Option<String>,
}

impl Job {
    /// Notification address, if one is set and non-blank.
    pub fn notification_target(&self) -> Option<&str> {
        self.notify_email
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Both scheduler ids, if both are recorded.
    pub fn scheduler_ids(&self) -> Option<(u64, u64)> {
        match (self.filtering_scheduler_id, self.matching_scheduler_id) {
            (Some(filtering), Some(matching)) => Some((filtering, matching)),
            _ => None,
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Scheduler ids have been stored both as numbers and as the raw text
/// printed by the submit command.
fn lenient_scheduler_id<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(u64),
        Text(String),
    }

    match Option::<RawId>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawId::Number(n)) => Ok(Some(n)),
        Some(RawId::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(RawId::Text(s)) => s
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid scheduler id: {:?}", s))),
    }
}
