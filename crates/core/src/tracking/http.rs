//! HTTP implementation of the tracking client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use tracing::debug;

use super::config::TrackingConfig;
use super::error::TrackingError;
use super::traits::TrackingClient;
use crate::job::{Job, JobStatus, Metrics, Prediction};
use crate::metrics::{result_label, TRACKING_REQUESTS};

/// Body of a status update.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusUpdate {
    status: JobStatus,
    #[serde(rename = "filteringSlurmId", skip_serializing_if = "Option::is_none")]
    filtering_scheduler_id: Option<u64>,
    #[serde(rename = "matchingSlurmId", skip_serializing_if = "Option::is_none")]
    matching_scheduler_id: Option<u64>,
}

/// Body of a result push: the status next to the flattened metric fields.
#[derive(Debug, Serialize)]
struct ResultsUpdate<'a> {
    status: JobStatus,
    #[serde(flatten)]
    metrics: &'a Metrics,
}

/// Tracking client speaking the service's JSON API.
pub struct HttpTrackingClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpTrackingClient {
    /// Creates a new client.
    pub fn new(config: &TrackingConfig) -> Result<Self, TrackingError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
        })
    }

    fn jobs_url(&self) -> String {
        format!("{}/api/jobs", self.base_url)
    }

    fn job_url(&self, job_id: &str, suffix: &str) -> String {
        format!(
            "{}/api/jobs/{}{}",
            self.base_url,
            urlencoding::encode(job_id),
            suffix
        )
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    /// Sends a request and turns non-2xx answers into errors.
    async fn send(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<Response, TrackingError> {
        let result = self.send_inner(request).await;
        TRACKING_REQUESTS
            .with_label_values(&[operation, result_label(&result)])
            .inc();
        result
    }

    async fn send_inner(&self, request: RequestBuilder) -> Result<Response, TrackingError> {
        let response = self.authorize(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TrackingError::Http {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl TrackingClient for HttpTrackingClient {
    async fn list_jobs(&self) -> Result<Vec<Job>, TrackingError> {
        let url = self.jobs_url();
        debug!(%url, "Listing jobs");

        let response = self.send("list_jobs", self.client.get(&url)).await?;
        let jobs: Vec<Job> = response
            .json()
            .await
            .map_err(|e| TrackingError::Decode(format!("job list: {}", e)))?;

        debug!(count = jobs.len(), "Fetched jobs");
        Ok(jobs)
    }

    async fn update_job(
        &self,
        job_id: &str,
        status: JobStatus,
        filtering_scheduler_id: Option<u64>,
        matching_scheduler_id: Option<u64>,
    ) -> Result<(), TrackingError> {
        let body = StatusUpdate {
            status,
            filtering_scheduler_id,
            matching_scheduler_id,
        };
        debug!(job_id, %status, "Updating job status");

        self.send(
            "update_job",
            self.client.put(self.job_url(job_id, "")).json(&body),
        )
        .await?;
        Ok(())
    }

    async fn push_results(
        &self,
        job_id: &str,
        status: JobStatus,
        metrics: &Metrics,
    ) -> Result<(), TrackingError> {
        let body = ResultsUpdate { status, metrics };
        debug!(job_id, %status, "Pushing results");

        self.send(
            "push_results",
            self.client
                .put(self.job_url(job_id, "/results"))
                .json(&body),
        )
        .await?;
        Ok(())
    }

    async fn push_predictions(
        &self,
        job_id: &str,
        predictions: &[Prediction],
    ) -> Result<(), TrackingError> {
        debug!(job_id, count = predictions.len(), "Pushing predictions");

        self.send(
            "push_predictions",
            self.client
                .put(self.job_url(job_id, "/predictions"))
                .json(predictions),
        )
        .await?;
        Ok(())
    }
}
