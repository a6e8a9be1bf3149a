//! Prometheus metrics for the order-submission pipeline.
//!
//! Exposed at `/metrics` on the health server port.

use std::sync::OnceLock;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Installs the Prometheus recorder and registers metric descriptions.
/// Safe to call more than once; later calls are no-ops.
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder");
            register_metrics();
            handle
        })
        .clone()
}

/// Returns the installed Prometheus handle, if metrics were initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

fn register_metrics() {
    describe_counter!(
        "order_core_orders_submitted_total",
        "Orders accepted by the submit-order use case"
    );
    describe_counter!(
        "order_core_orders_rejected_total",
        "Orders rejected during validation"
    );
    describe_counter!(
        "order_core_orders_executed_total",
        "Orders that reached the EXECUTED terminal state"
    );
    describe_counter!(
        "order_core_orders_failed_total",
        "Orders that reached the FAILED terminal state"
    );
    describe_gauge!(
        "order_core_worker_pool_size",
        "Current number of active workers in the process-order pool"
    );
    describe_counter!(
        "order_core_idempotency_conflicts_total",
        "Submit-order requests rejected as a duplicate of an in-flight request"
    );
}

/// Records an order accepted for processing.
pub fn record_order_submitted() {
    counter!("order_core_orders_submitted_total").increment(1);
}

/// Records an order rejected during validation.
pub fn record_order_rejected() {
    counter!("order_core_orders_rejected_total").increment(1);
}

/// Records an order reaching EXECUTED.
pub fn record_order_executed() {
    counter!("order_core_orders_executed_total").increment(1);
}

/// Records an order reaching FAILED.
pub fn record_order_failed() {
    counter!("order_core_orders_failed_total").increment(1);
}

/// Records an idempotency conflict.
pub fn record_idempotency_conflict() {
    counter!("order_core_idempotency_conflicts_total").increment(1);
}

/// Updates the worker-pool size gauge.
pub fn set_worker_pool_size(count: f64) {
    gauge!("order_core_worker_pool_size").set(count);
}
