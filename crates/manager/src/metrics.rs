//! Prometheus registry for the manager process.
//!
//! Registers every core metric once and renders them in the text
//! exposition format for the `/metrics` endpoint.

use once_cell::sync::Lazy;
use prometheus::{Encoder, IntGauge, Registry, TextEncoder};

use erbench_core::OrchestratorStatus;

/// 1 while the watch loop is running.
pub static ORCHESTRATOR_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "erbench_orchestrator_running",
        "Whether the watch loop is running",
    )
    .unwrap()
});

/// Jobs seen by the most recent sweep.
pub static LAST_SWEEP_JOBS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "erbench_last_sweep_jobs",
        "Jobs listed by the most recent sweep",
    )
    .unwrap()
});

/// Global registry for all manager metrics.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(ORCHESTRATOR_RUNNING.clone()))
        .unwrap();
    registry
        .register(Box::new(LAST_SWEEP_JOBS.clone()))
        .unwrap();

    for metric in erbench_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics in Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Update gauges from the current orchestrator status.
pub fn collect_dynamic_metrics(status: &OrchestratorStatus) {
    ORCHESTRATOR_RUNNING.set(i64::from(status.running));
    if let Some(report) = &status.last_sweep {
        LAST_SWEEP_JOBS.set(report.jobs_seen as i64);
    }
}
