//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Orchestrator sweeps and job transitions
//! - Scheduler commands
//! - Tracking service requests and notifications

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Orchestrator
// =============================================================================

/// Sweeps performed.
pub static SWEEPS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("erbench_sweeps_total", "Total orchestrator sweeps").unwrap()
});

/// Sweep duration in seconds.
pub static SWEEP_DURATION: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "erbench_sweep_duration_seconds",
            "Duration of one orchestrator sweep",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 300.0]),
    )
    .unwrap()
});

/// Job status transitions by target status.
pub static JOB_TRANSITIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "erbench_job_transitions_total",
            "Job status transitions performed",
        ),
        &["to"], // "queued", "filtering", "matching", "completed", "failed"
    )
    .unwrap()
});

/// Job evaluation errors by kind.
pub static JOB_ERRORS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("erbench_job_errors_total", "Errors while evaluating jobs"),
        &["kind"],
    )
    .unwrap()
});

// =============================================================================
// External services
// =============================================================================

/// Scheduler command invocations.
pub static SCHEDULER_COMMANDS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "erbench_scheduler_commands_total",
            "Scheduler commands executed",
        ),
        &["command", "result"], // command: "submit", "query", "cancel", "accounting"
    )
    .unwrap()
});

/// Tracking service requests.
pub static TRACKING_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "erbench_tracking_requests_total",
            "Requests made to the job tracking service",
        ),
        &["operation", "result"],
    )
    .unwrap()
});

/// Completion notifications.
pub static NOTIFICATIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("erbench_notifications_total", "Completion notifications sent"),
        &["result"],
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Label value for a result.
pub fn result_label<T, E>(result: &Result<T, E>) -> &'static str {
    if result.is_ok() {
        "success"
    } else {
        "error"
    }
}

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Orchestrator
        Box::new(SWEEPS_TOTAL.clone()),
        Box::new(SWEEP_DURATION.clone()),
        Box::new(JOB_TRANSITIONS.clone()),
        Box::new(JOB_ERRORS.clone()),
        // External services
        Box::new(SCHEDULER_COMMANDS.clone()),
        Box::new(TRACKING_REQUESTS.clone()),
        Box::new(NOTIFICATIONS.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_metrics_register_once() {
        let registry = prometheus::Registry::new();
        for metric in all_metrics() {
            registry.register(metric).unwrap();
        }
    }

    #[test]
    fn test_result_label() {
        let ok: Result<(), ()> = Ok(());
        let err: Result<(), ()> = Err(());
        assert_eq!(result_label(&ok), "success");
        assert_eq!(result_label(&err), "error");
    }
}
