//! Result records produced by the importer.

use serde::{Deserialize, Serialize};

/// Sparse result fields for a job.
///
/// Every field is optional; unset fields are omitted on the wire so the
/// tracking service keeps whatever it already stored for them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    // Filtering stage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filtering_f1: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filtering_precision: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filtering_recall: Option<f64>,
    /// Filtering duration in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filtering_time: Option<i64>,
    #[serde(
        rename = "filteringCandidates",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub num_candidates: Option<i64>,
    #[serde(
        rename = "filteringEntriesA",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub entries_table_a: Option<i64>,
    #[serde(
        rename = "filteringEntriesB",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub entries_table_b: Option<i64>,
    #[serde(
        rename = "filteringMatches",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub entries_matches: Option<i64>,

    // Matching stage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub f1: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recall: Option<f64>,
    /// Training duration in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub train_time: Option<i64>,
    /// Evaluation duration in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_time: Option<i64>,

    // Scheduler accounting
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_allocated: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_utilized: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mem_utilized: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu_allocated: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu_utilized: Option<i64>,
    /// GPU memory in megabytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu_mem_utilized: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy_consumed: Option<i64>,
    /// Wall-clock runtime in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_runtime: Option<i64>,
}

macro_rules! merge_fields {
    ($dst:expr, $src:expr, $($field:ident),+ $(,)?) => {
        $(
            if $src.$field.is_some() {
                $dst.$field = $src.$field;
            }
        )+
    };
}

impl Metrics {
    /// Copies every field set in `other` into `self`, leaving the rest alone.
    pub fn merge(&mut self, other: &Metrics) {
        merge_fields!(
            self,
            other,
            filtering_f1,
            filtering_precision,
            filtering_recall,
            filtering_time,
            num_candidates,
            entries_table_a,
            entries_table_b,
            entries_matches,
            f1,
            precision,
            recall,
            train_time,
            eval_time,
            cpu_allocated,
            cpu_utilized,
            mem_utilized,
            gpu_allocated,
            gpu_utilized,
            gpu_mem_utilized,
            energy_consumed,
            total_runtime,
        );
    }

    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        *self == Metrics::default()
    }
}

/// One scored entity pair from the test partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    #[serde(rename = "tableA_id")]
    pub left_id: i64,
    #[serde(rename = "tableB_id")]
    pub right_id: i64,
    pub label: i64,
    /// Model confidence of a positive match, in [0, 1].
    pub probability: f64,
}
