//! Completion notices via SMTP.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

use super::config::NotifierConfig;
use super::{Notifier, NotifyError};
use crate::job::{Job, Metrics};

/// Sends plain-text completion emails.
pub struct EmailNotifier {
    config: NotifierConfig,
}

impl EmailNotifier {
    pub fn new(config: NotifierConfig) -> Self {
        Self { config }
    }

    fn subject(job: &Job) -> String {
        format!("[ERBench] Job {} completed", job.id)
    }

    fn body(job: &Job, metrics: &Metrics) -> String {
        let name = |code: &str, name: Option<&str>| match name {
            Some(name) => format!("{} ({})", name, code),
            None => code.to_string(),
        };
        let score = |value: Option<f64>| match value {
            Some(v) => format!("{:.4}", v),
            None => "n/a".to_string(),
        };

        let mut body = format!(
            "Your entity resolution job {} has completed.\n\n\
             Dataset:   {}\n\
             Filtering: {}\n\
             Matching:  {}\n\n\
             F1:        {}\n\
             Precision: {}\n\
             Recall:    {}\n",
            job.id,
            name(&job.dataset.code, job.dataset.name.as_deref()),
            name(&job.filtering_algo.code, job.filtering_algo.name.as_deref()),
            name(&job.matching_algo.code, job.matching_algo.name.as_deref()),
            score(metrics.f1),
            score(metrics.precision),
            score(metrics.recall),
        );
        if let Some(runtime) = metrics.total_runtime {
            body.push_str(&format!("Runtime:   {} s\n", runtime));
        }
        body
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn notify_completed(
        &self,
        recipient: &str,
        job: &Job,
        metrics: &Metrics,
    ) -> Result<(), NotifyError> {
        let email = Message::builder()
            .from(self.config.from_address.parse()?)
            .to(recipient.parse()?)
            .subject(Self::subject(job))
            .header(ContentType::TEXT_PLAIN)
            .body(Self::body(job, metrics))
            .map_err(|e| NotifyError::Build(e.to_string()))?;

        let mut transport_builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_host)?
                .port(self.config.smtp_port);

        if let (Some(user), Some(pass)) = (&self.config.smtp_user, &self.config.smtp_password) {
            transport_builder =
                transport_builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        let mailer = transport_builder.build();
        mailer.send(email).await?;

        info!(to = recipient, job_id = %job.id, "Completion email sent");
        Ok(())
    }
}
