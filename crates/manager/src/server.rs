//! `/health` and `/metrics` endpoints served while watching.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::info;

use erbench_core::{JobOrchestrator, OrchestratorStatus};

use crate::metrics::{collect_dynamic_metrics, encode_metrics};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub orchestrator: OrchestratorStatus,
}

pub fn create_router(orchestrator: Arc<JobOrchestrator>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .with_state(orchestrator)
}

async fn health(State(orchestrator): State<Arc<JobOrchestrator>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
        orchestrator: orchestrator.status().await,
    })
}

async fn metrics(State(orchestrator): State<Arc<JobOrchestrator>>) -> impl IntoResponse {
    collect_dynamic_metrics(&orchestrator.status().await);
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        encode_metrics(),
    )
}

/// Serve the endpoints on `addr` until a message arrives on `shutdown`.
pub async fn serve(
    addr: SocketAddr,
    orchestrator: Arc<JobOrchestrator>,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Serving metrics and health on {}", addr);

    axum::serve(listener, create_router(orchestrator))
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await
        .context("Metrics server error")
}
