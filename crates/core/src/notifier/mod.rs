//! Completion notifications.
//!
//! Sending is best effort: the orchestrator logs a failed notification and
//! keeps the job COMPLETED.

mod config;
mod email;

pub use config::NotifierConfig;
pub use email::EmailNotifier;

use async_trait::async_trait;
use thiserror::Error;

use crate::job::{Job, Metrics};

/// Errors that can occur while sending a notification.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),
}

/// Delivers a notice that a job finished.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Tells `recipient` that `job` completed with the given results.
    async fn notify_completed(
        &self,
        recipient: &str,
        job: &Job,
        metrics: &Metrics,
    ) -> Result<(), NotifyError>;
}
