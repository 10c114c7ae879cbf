//! Scheduler gateway for the external batch scheduler.
//!
//! The orchestrator only talks to the [`SchedulerGateway`] trait, so the
//! CLI-invocation backend ([`SlurmGateway`]) can be swapped for a native API
//! client without touching the state machine.
//!
//! # Example
//!
//! ```ignore
//! use erbench_core::scheduler::{SchedulerGateway, SlurmGateway, SubmitRequest};
//!
//! let gateway = SlurmGateway::new(config.scheduler.clone());
//! let filtering_id = gateway.submit(&filtering_request).await?;
//! let matching_id = gateway
//!     .submit(&matching_request.after(filtering_id))
//!     .await?;
//! let state = gateway.query_state(filtering_id).await?;
//! ```

mod args;
mod config;
mod error;
mod slurm;
mod traits;
mod types;

pub use args::{render_args, shell_word, Quoting};
pub use config::SchedulerConfig;
pub use error::SchedulerError;
pub use slurm::SlurmGateway;
pub use traits::SchedulerGateway;
pub use types::{SchedulerState, SubmitRequest};
