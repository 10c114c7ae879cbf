//! Job, metrics and prediction records exchanged with the tracking service.

mod metrics;
mod types;

pub use metrics::{Metrics, Prediction};
pub use types::{AlgorithmRef, ArgMap, ArgValue, DatasetRef, Job, JobStatus};
