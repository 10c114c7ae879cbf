//! Result importer.
//!
//! Turns the artifacts a finished compute job leaves in its working
//! directory into typed records:
//!
//! - `filtering_metrics.csv`: filtering-stage quality, timing and cardinalities
//! - `metrics.csv`: final matching-stage quality and timing
//! - `predictions.csv`: one scored entity pair per row
//!
//! It also folds the scheduler's own accounting report into an existing
//! [`Metrics`](crate::job::Metrics) value.
//!
//! # Example
//!
//! ```ignore
//! use erbench_core::importer;
//!
//! let mut metrics = importer::import_results(&work_dir).await?;
//! metrics = importer::import_scheduler_metrics(&raw_report, metrics)?;
//! let predictions = importer::import_predictions(&work_dir).await?;
//! ```

mod accounting;
mod artifacts;
mod error;
mod table;

pub use accounting::import_scheduler_metrics;
pub use artifacts::{
    import_filtering_results, import_predictions, import_results, FILTERING_METRICS_FILE,
    METRICS_FILE, PREDICTIONS_FILE,
};
pub use error::ImportError;
