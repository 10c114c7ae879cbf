//! Client for the external job-tracking service.
//!
//! The tracking service holds the authoritative job records. The orchestrator
//! reads the job list from it and reports every status transition, result set
//! and prediction set back to it through the [`TrackingClient`] trait.

mod config;
mod error;
mod http;
mod traits;

pub use config::TrackingConfig;
pub use error::TrackingError;
pub use http::HttpTrackingClient;
pub use traits::TrackingClient;
