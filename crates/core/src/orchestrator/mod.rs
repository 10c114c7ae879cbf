//! Job orchestrator: the state machine driving every job through
//! PENDING → QUEUED → FILTERING → MATCHING → COMPLETED, or FAILED.
//!
//! - **Sweep**: fetch all jobs once, evaluate them sequentially
//! - **Watch**: repeat sweeps every poll interval until stopped
//! - **Import**: store the results of a finished job by hand

mod config;
mod runner;
mod types;
mod workspace;

pub use config::OrchestratorConfig;
pub use runner::JobOrchestrator;
pub use types::{JobFailure, OrchestratorError, OrchestratorStatus, SweepReport, Transition};
pub use workspace::PathsConfig;
