//! Prometheus Metrics Module
//!
//! Exposes application metrics via Prometheus format for monitoring.
//!
//! # Metrics Categories
//!
//! - **Connections**: active pool connections, upgrade outcomes
//! - **Quotes**: oscillator ticks, patch operations sent
//! - **Health**: current health status gauge
//! - **Scaling**: autoscaling decisions applied
//! - **Reconnection**: reconnection attempts and outcomes
//!
//! # Integration
//!
//! Metrics are exposed at `/metrics` on the health server port.

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::domain::autoscale::ScalingDecision;
use crate::domain::health::HealthStatus;

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// # Panics
///
/// Panics if called more than once or if the recorder cannot be installed.
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let builder = PrometheusBuilder::new();
            let handle = builder
                .install_recorder()
                .expect("failed to install Prometheus recorder");

            register_metrics();
            handle
        })
        .clone()
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    describe_gauge!(
        "quote_fanout_active_connections",
        "Number of connections currently tracked by the pool"
    );
    describe_gauge!(
        "quote_fanout_pool_capacity",
        "Current soft connection ceiling"
    );
    describe_counter!(
        "quote_fanout_upgrades_rejected_total",
        "Total WebSocket upgrade attempts rejected before completion"
    );

    describe_counter!(
        "quote_fanout_oscillator_ticks_total",
        "Total oscillator perturbation ticks"
    );
    describe_counter!(
        "quote_fanout_patch_ops_sent_total",
        "Total JSON-Patch operations sent to subscribers"
    );
    describe_counter!(
        "quote_fanout_send_failures_total",
        "Total failed sends to a pooled connection"
    );

    describe_gauge!(
        "quote_fanout_health_status",
        "Current health status (0=healthy, 1=degraded, 2=unhealthy, 3=unknown)"
    );

    describe_counter!(
        "quote_fanout_scaling_decisions_total",
        "Total autoscaling decisions applied, by kind"
    );

    describe_counter!(
        "quote_fanout_reconnect_attempts_total",
        "Total reconnection attempts, by outcome"
    );
    describe_histogram!(
        "quote_fanout_reconnect_duration_seconds",
        "Time spent per reconnection attempt"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Reasons a WebSocket upgrade attempt can be rejected before completion.
#[derive(Debug, Clone, Copy)]
pub enum RejectReason {
    /// No bearer token presented.
    MissingToken,
    /// Token verification failed.
    InvalidToken,
    /// Pool was at capacity.
    PoolFull,
}

impl RejectReason {
    const fn as_str(self) -> &'static str {
        match self {
            Self::MissingToken => "missing_token",
            Self::InvalidToken => "invalid_token",
            Self::PoolFull => "pool_full",
        }
    }
}

/// Update the active-connections and capacity gauges.
pub fn set_pool_state(active_connections: u32, capacity: u32) {
    gauge!("quote_fanout_active_connections").set(f64::from(active_connections));
    gauge!("quote_fanout_pool_capacity").set(f64::from(capacity));
}

/// Record a rejected upgrade attempt.
pub fn record_upgrade_rejected(reason: RejectReason) {
    counter!(
        "quote_fanout_upgrades_rejected_total",
        "reason" => reason.as_str()
    )
    .increment(1);
}

/// Record an oscillator tick.
pub fn record_oscillator_tick() {
    counter!("quote_fanout_oscillator_ticks_total").increment(1);
}

/// Record patch operations sent to subscribers.
pub fn record_patch_ops_sent(count: u64) {
    counter!("quote_fanout_patch_ops_sent_total").increment(count);
}

/// Record a failed send to a pooled connection.
pub fn record_send_failure() {
    counter!("quote_fanout_send_failures_total").increment(1);
}

/// Update the health status gauge.
pub fn set_health_status(status: HealthStatus) {
    let value = match status {
        HealthStatus::Healthy => 0.0,
        HealthStatus::Degraded => 1.0,
        HealthStatus::Unhealthy => 2.0,
        HealthStatus::Unknown => 3.0,
    };
    gauge!("quote_fanout_health_status").set(value);
}

/// Record an autoscaling decision.
pub fn record_scaling_decision(decision: ScalingDecision) {
    let label = match decision {
        ScalingDecision::ScaleUp => "scale_up",
        ScalingDecision::ScaleDown => "scale_down",
        ScalingDecision::Hold => "hold",
    };
    counter!("quote_fanout_scaling_decisions_total", "decision" => label).increment(1);
}

/// Record a reconnection attempt outcome.
pub fn record_reconnect_attempt(succeeded: bool, elapsed: Duration) {
    let outcome = if succeeded { "success" } else { "failure" };
    counter!("quote_fanout_reconnect_attempts_total", "outcome" => outcome).increment(1);
    histogram!("quote_fanout_reconnect_duration_seconds").record(elapsed.as_secs_f64());
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reject_reason_as_str() {
        assert_eq!(RejectReason::MissingToken.as_str(), "missing_token");
        assert_eq!(RejectReason::InvalidToken.as_str(), "invalid_token");
        assert_eq!(RejectReason::PoolFull.as_str(), "pool_full");
    }
}
