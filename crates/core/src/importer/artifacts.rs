//! Readers for the CSV artifacts written by the compute jobs.

use std::path::Path;

use tracing::debug;

use crate::job::{Metrics, Prediction};

use super::error::ImportError;
use super::table::{Row, Table};

/// Filtering-stage metrics, written by the filtering job.
pub const FILTERING_METRICS_FILE: &str = "filtering_metrics.csv";
/// Final metrics, written by the matching job.
pub const METRICS_FILE: &str = "metrics.csv";
/// Scored test pairs, written by the matching job.
pub const PREDICTIONS_FILE: &str = "predictions.csv";

/// Reads `filtering_metrics.csv` from `dir`.
///
/// Missing numeric columns default to 0. `filtering_time` is converted from
/// fractional seconds to whole milliseconds.
pub async fn import_filtering_results(dir: &Path) -> Result<Metrics, ImportError> {
    let table = Table::read(&dir.join(FILTERING_METRICS_FILE)).await?;
    let row = single_row(&table)?;

    let metrics = Metrics {
        filtering_f1: Some(row.float_or_zero("f1")?),
        filtering_precision: Some(row.float_or_zero("precision")?),
        filtering_recall: Some(row.float_or_zero("recall")?),
        filtering_time: Some(seconds_to_millis(row.float_or_zero("filtering_time")?)),
        num_candidates: Some(row.integer_or_zero("num_candidates")?),
        entries_table_a: Some(row.integer_or_zero("entries_tableA")?),
        entries_table_b: Some(row.integer_or_zero("entries_tableB")?),
        entries_matches: Some(row.integer_or_zero("entries_matches")?),
        ..Default::default()
    };

    debug!(dir = %dir.display(), "Imported filtering metrics");
    Ok(metrics)
}

/// Reads the final `metrics.csv` from `dir`.
///
/// `train_time` and `eval_time` are converted from fractional seconds to
/// whole milliseconds.
pub async fn import_results(dir: &Path) -> Result<Metrics, ImportError> {
    let table = Table::read(&dir.join(METRICS_FILE)).await?;
    let row = single_row(&table)?;

    let metrics = Metrics {
        f1: Some(row.float_or_zero("f1")?),
        precision: Some(row.float_or_zero("precision")?),
        recall: Some(row.float_or_zero("recall")?),
        train_time: Some(seconds_to_millis(row.float_or_zero("train_time")?)),
        eval_time: Some(seconds_to_millis(row.float_or_zero("eval_time")?)),
        ..Default::default()
    };

    debug!(dir = %dir.display(), "Imported final metrics");
    Ok(metrics)
}

/// Reads every row of `predictions.csv` from `dir`.
///
/// All-or-nothing: a missing file or any malformed row fails the whole
/// import. `label` defaults to 0 when absent.
pub async fn import_predictions(dir: &Path) -> Result<Vec<Prediction>, ImportError> {
    let table = Table::read(&dir.join(PREDICTIONS_FILE)).await?;

    let predictions = table
        .rows()
        .map(|row| parse_prediction(&row))
        .collect::<Result<Vec<_>, _>>()?;

    debug!(
        dir = %dir.display(),
        count = predictions.len(),
        "Imported predictions"
    );
    Ok(predictions)
}

fn parse_prediction(row: &Row<'_>) -> Result<Prediction, ImportError> {
    let probability = row.required_float("prob_class1")?;
    if !(0.0..=1.0).contains(&probability) {
        return Err(row.invalid(
            "prob_class1",
            format!("is outside [0, 1]: {}", probability),
        ));
    }

    Ok(Prediction {
        left_id: row.required_integer("tableA_id")?,
        right_id: row.required_integer("tableB_id")?,
        label: row.integer_or_zero("label")?,
        probability,
    })
}

fn single_row(table: &Table) -> Result<Row<'_>, ImportError> {
    table
        .row(0)
        .ok_or_else(|| ImportError::parse_failure(table.name(), "no value row"))
}

fn seconds_to_millis(seconds: f64) -> i64 {
    (seconds * 1000.0).round() as i64
}
