/// Prometheus metrics for the social-state synchronizer
use once_cell::sync::Lazy;
use prometheus::{register_int_counter_vec, IntCounterVec};

static REMOTE_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "social_sync_remote_failures_total",
        "Total number of failed remote calls by store operation",
        &["operation"]
    )
    .expect("Failed to register remote failures metric")
});

static ROLLBACKS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "social_sync_rollbacks_total",
        "Total number of compensating relation writes by result",
        &["operation", "result"]
    )
    .expect("Failed to register rollbacks metric")
});

static INFLIGHT_REJECTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "social_sync_inflight_rejections_total",
        "Total number of interactions rejected while an identical one was in flight",
        &["operation"]
    )
    .expect("Failed to register in-flight rejections metric")
});

pub fn record_remote_failure(operation: &str) {
    REMOTE_FAILURES.with_label_values(&[operation]).inc();
}

pub fn record_rollback(operation: &str, succeeded: bool) {
    let result = if succeeded { "success" } else { "failure" };
    ROLLBACKS.with_label_values(&[operation, result]).inc();
}

pub fn record_inflight_rejection(operation: &str) {
    INFLIGHT_REJECTIONS.with_label_values(&[operation]).inc();
}
