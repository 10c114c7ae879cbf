//! Mock notifier for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::job::{Job, Metrics};
use crate::notifier::{Notifier, NotifyError};

/// Mock implementation of the Notifier trait. Records `(recipient, job id)`.
#[derive(Debug, Default)]
pub struct MockNotifier {
    sent: Arc<RwLock<Vec<(String, String)>>>,
    fail: Arc<RwLock<bool>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<(String, String)> {
        self.sent.read().await.clone()
    }

    /// Make every notification fail.
    pub async fn fail(&self, fail: bool) {
        *self.fail.write().await = fail;
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn notify_completed(
        &self,
        recipient: &str,
        job: &Job,
        _metrics: &Metrics,
    ) -> Result<(), NotifyError> {
        if *self.fail.read().await {
            return Err(NotifyError::Build("mock notifier failure".to_string()));
        }
        self.sent
            .write()
            .await
            .push((recipient.to_string(), job.id.clone()));
        Ok(())
    }
}
