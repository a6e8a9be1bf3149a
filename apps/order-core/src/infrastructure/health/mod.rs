//! Health Check and Metrics Endpoint
//!
//! HTTP endpoint for liveness/readiness probes and Prometheus metrics.
//! Used by container orchestrators and monitoring systems.
//!
//! # Endpoints
//!
//! - `GET /health` - Returns JSON health status
//! - `GET /healthz` - Kubernetes liveness probe (simple OK)
//! - `GET /readyz` - Kubernetes readiness probe (checks bus connectivity and worker pool)
//! - `GET /metrics` - Prometheus metrics in text format

mod metrics;

pub use metrics::{
    get_metrics_handle, init_metrics, record_idempotency_conflict, record_order_executed,
    record_order_failed, record_order_rejected, record_order_submitted, set_worker_pool_size,
};

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::application::workers::WorkerPoolManager;
use crate::infrastructure::messaging::LapinMessageBus;

// =============================================================================
// Health Response Types
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Overall status: "healthy", "degraded", or "unhealthy".
    pub status: HealthStatus,
    /// Binary version.
    pub version: String,
    /// Server uptime in seconds.
    pub uptime_secs: u64,
    /// Current time.
    pub current_time: DateTime<Utc>,
    /// Message bus connection status.
    pub bus_connected: bool,
    /// Active worker-pool size.
    pub worker_count: usize,
}

/// Overall health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Bus connected and at least one worker running.
    Healthy,
    /// Bus connected but the worker pool has scaled to zero.
    Degraded,
    /// Bus disconnected.
    Unhealthy,
}

// =============================================================================
// Health Server State
// =============================================================================

/// Shared state for the health server.
pub struct HealthServerState {
    version: String,
    started_at: Instant,
    bus: Arc<LapinMessageBus>,
    workers: Arc<WorkerPoolManager<LapinMessageBus>>,
}

impl HealthServerState {
    /// Creates new health server state.
    #[must_use]
    pub fn new(
        version: String,
        bus: Arc<LapinMessageBus>,
        workers: Arc<WorkerPoolManager<LapinMessageBus>>,
    ) -> Self {
        Self {
            version,
            started_at: Instant::now(),
            bus,
            workers,
        }
    }
}

// =============================================================================
// Health Server
// =============================================================================

/// Health check HTTP server.
pub struct HealthServer {
    port: u16,
    state: Arc<HealthServerState>,
    cancel: CancellationToken,
}

impl HealthServer {
    /// Creates a new health server.
    #[must_use]
    pub const fn new(port: u16, state: Arc<HealthServerState>, cancel: CancellationToken) -> Self {
        Self {
            port,
            state,
            cancel,
        }
    }

    /// Runs the health server until cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`HealthServerError`] if binding fails or the HTTP server
    /// encounters a fatal error while running.
    pub async fn run(self) -> Result<(), HealthServerError> {
        let app = Router::new()
            .route("/health", get(health_handler))
            .route("/healthz", get(liveness_handler))
            .route("/readyz", get(readiness_handler))
            .route("/metrics", get(metrics_handler))
            .with_state(self.state);

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| HealthServerError::BindFailed(self.port, e.to_string()))?;

        tracing::info!(port = self.port, "Health server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(self.cancel.cancelled_owned())
            .await
            .map_err(|e| HealthServerError::ServerFailed(e.to_string()))?;

        tracing::info!("Health server stopped");
        Ok(())
    }
}

// =============================================================================
// HTTP Handlers
// =============================================================================

async fn health_handler(State(state): State<Arc<HealthServerState>>) -> impl IntoResponse {
    let response = build_health_response(&state).await;
    let status_code = match response.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status_code, Json(response))
}

async fn liveness_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn readiness_handler(State(state): State<Arc<HealthServerState>>) -> impl IntoResponse {
    let response = build_health_response(&state).await;

    if response.bus_connected {
        (StatusCode::OK, "READY")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
    }
}

async fn metrics_handler() -> impl IntoResponse {
    get_metrics_handle().map_or_else(
        || {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                [("content-type", "text/plain")],
                "Metrics not initialized".to_string(),
            )
        },
        |handle| {
            let body = handle.render();
            (
                StatusCode::OK,
                [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
                body,
            )
        },
    )
}

async fn build_health_response(state: &HealthServerState) -> HealthResponse {
    let bus_connected = state.bus.is_connected();
    let worker_count = state.workers.worker_count().await;

    set_worker_pool_size(worker_count as f64);

    let status = determine_health_status(bus_connected, worker_count);

    HealthResponse {
        status,
        version: state.version.clone(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        current_time: Utc::now(),
        bus_connected,
        worker_count,
    }
}

fn determine_health_status(bus_connected: bool, worker_count: usize) -> HealthStatus {
    if !bus_connected {
        return HealthStatus::Unhealthy;
    }
    if worker_count == 0 {
        return HealthStatus::Degraded;
    }
    HealthStatus::Healthy
}

// =============================================================================
// Errors
// =============================================================================

/// Health server errors.
#[derive(Debug, thiserror::Error)]
pub enum HealthServerError {
    /// Failed to bind to the configured port.
    #[error("failed to bind to port {0}: {1}")]
    BindFailed(u16, String),

    /// The server loop returned a fatal error.
    #[error("server error: {0}")]
    ServerFailed(String),
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_status_serialization() {
        assert_eq!(
            serde_json::to_string(&HealthStatus::Healthy).unwrap(),
            "\"healthy\""
        );
        assert_eq!(
            serde_json::to_string(&HealthStatus::Degraded).unwrap(),
            "\"degraded\""
        );
        assert_eq!(
            serde_json::to_string(&HealthStatus::Unhealthy).unwrap(),
            "\"unhealthy\""
        );
    }

    #[test]
    fn determine_status_bus_down_is_unhealthy() {
        assert_eq!(determine_health_status(false, 3), HealthStatus::Unhealthy);
    }

    #[test]
    fn determine_status_no_workers_is_degraded() {
        assert_eq!(determine_health_status(true, 0), HealthStatus::Degraded);
    }

    #[test]
    fn determine_status_bus_up_with_workers_is_healthy() {
        assert_eq!(determine_health_status(true, 2), HealthStatus::Healthy);
    }
}
