//! Health Check and Metrics Endpoint
//!
//! HTTP endpoint for health checks, pool status reporting, and Prometheus
//! metrics. Used by container orchestrators, load balancers, and
//! monitoring systems.
//!
//! # Endpoints
//!
//! - `GET /health` - Returns JSON health status
//! - `GET /healthz` - Kubernetes liveness probe (simple OK)
//! - `GET /readyz` - Kubernetes readiness probe (checks pool capacity)
//! - `GET /metrics` - Prometheus metrics in text format

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::domain::health::HealthStatus;
use crate::infrastructure::catalog::{Oscillator, QuoteCatalog};
use crate::infrastructure::metrics::get_metrics_handle;
use crate::infrastructure::pool::ConnectionPool;

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Overall status, as classified by the background health monitor.
    pub status: &'static str,
    /// Service version.
    pub version: String,
    /// Server uptime in seconds.
    pub uptime_secs: u64,
    /// Current time.
    pub current_time: DateTime<Utc>,
    /// Connection pool status.
    pub pool: PoolStatus,
    /// Quote catalog status.
    pub catalog: CatalogStatus,
}

/// Connection pool status.
#[derive(Debug, Clone, Serialize)]
pub struct PoolStatus {
    /// Connections currently tracked.
    pub active_connections: usize,
    /// Current soft connection ceiling.
    pub capacity: u32,
}

/// Quote catalog status.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogStatus {
    /// Symbols tracked.
    pub symbol_count: usize,
    /// Live oscillator subscribers (roughly, active WebSocket connections).
    pub subscriber_count: usize,
}

/// Shared, atomically-updated health status the background health monitor
/// publishes to and this HTTP server reads from. A bare `AtomicU8` keeps the
/// hot path (one store per monitor tick) lock-free; `HealthStatus` round-
/// trips through it as a small enum tag.
#[derive(Debug, Default)]
pub struct SharedHealthStatus(AtomicU8);

impl SharedHealthStatus {
    const fn tag(status: HealthStatus) -> u8 {
        match status {
            HealthStatus::Healthy => 0,
            HealthStatus::Degraded => 1,
            HealthStatus::Unhealthy => 2,
            HealthStatus::Unknown => 3,
        }
    }

    const fn from_tag(tag: u8) -> HealthStatus {
        match tag {
            0 => HealthStatus::Healthy,
            1 => HealthStatus::Degraded,
            2 => HealthStatus::Unhealthy,
            _ => HealthStatus::Unknown,
        }
    }

    /// Publish a new status. Called by the health monitor task.
    pub fn set(&self, status: HealthStatus) {
        self.0.store(Self::tag(status), Ordering::Relaxed);
    }

    /// Read the last-published status.
    #[must_use]
    pub fn get(&self) -> HealthStatus {
        Self::from_tag(self.0.load(Ordering::Relaxed))
    }
}

/// Shared state for the health server.
pub struct HealthServerState {
    version: String,
    started_at: Instant,
    pool: Arc<ConnectionPool>,
    catalog: Arc<QuoteCatalog>,
    oscillator: Arc<Oscillator>,
    status: Arc<SharedHealthStatus>,
}

impl HealthServerState {
    /// Create new health server state.
    #[must_use]
    pub fn new(
        version: String,
        pool: Arc<ConnectionPool>,
        catalog: Arc<QuoteCatalog>,
        oscillator: Arc<Oscillator>,
        status: Arc<SharedHealthStatus>,
    ) -> Self {
        Self {
            version,
            started_at: Instant::now(),
            pool,
            catalog,
            oscillator,
            status,
        }
    }
}

/// Health check HTTP server.
pub struct HealthServer {
    port: u16,
    state: Arc<HealthServerState>,
    cancel: CancellationToken,
}

impl HealthServer {
    /// Create a new health server.
    #[must_use]
    pub const fn new(port: u16, state: Arc<HealthServerState>, cancel: CancellationToken) -> Self {
        Self { port, state, cancel }
    }

    /// Run the health server until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `HealthServerError` if binding fails or the HTTP server
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

        tracing::info!(port = self.port, "health server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(self.cancel.cancelled_owned())
            .await
            .map_err(|e| HealthServerError::ServerFailed(e.to_string()))?;

        tracing::info!("health server stopped");
        Ok(())
    }
}

async fn health_handler(State(state): State<Arc<HealthServerState>>) -> impl IntoResponse {
    let response = build_health_response(&state);
    let status_code = match state.status.get() {
        HealthStatus::Healthy | HealthStatus::Degraded | HealthStatus::Unknown => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status_code, Json(response))
}

async fn liveness_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn readiness_handler(State(state): State<Arc<HealthServerState>>) -> impl IntoResponse {
    if state.pool.has_room() {
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

fn build_health_response(state: &HealthServerState) -> HealthResponse {
    HealthResponse {
        status: state.status.get().as_str(),
        version: state.version.clone(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        current_time: Utc::now(),
        pool: PoolStatus {
            active_connections: state.pool.len(),
            capacity: state.pool.capacity(),
        },
        catalog: CatalogStatus {
            symbol_count: state.catalog.len(),
            subscriber_count: state.oscillator.subscriber_count(),
        },
    }
}

/// Health server errors.
#[derive(Debug, thiserror::Error)]
pub enum HealthServerError {
    /// Failed to bind to port.
    #[error("failed to bind to port {0}: {1}")]
    BindFailed(u16, String),

    /// Server error.
    #[error("server error: {0}")]
    ServerFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_status_round_trips_through_atomic_tag() {
        let shared = SharedHealthStatus::default();
        assert_eq!(shared.get(), HealthStatus::Unknown);
        shared.set(HealthStatus::Degraded);
        assert_eq!(shared.get(), HealthStatus::Degraded);
        shared.set(HealthStatus::Healthy);
        assert_eq!(shared.get(), HealthStatus::Healthy);
    }

    #[test]
    fn health_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&HealthStatus::Healthy).unwrap(),
            "\"healthy\""
        );
        assert_eq!(
            serde_json::to_string(&HealthStatus::Unhealthy).unwrap(),
            "\"unhealthy\""
        );
    }

    #[test]
    fn build_health_response_reports_pool_and_catalog_counts() {
        let catalog = Arc::new(QuoteCatalog::with_default_symbols());
        let oscillator = Arc::new(Oscillator::new(
            catalog.clone(),
            crate::infrastructure::catalog::OscillatorConfig::default(),
        ));
        let pool = Arc::new(ConnectionPool::new(crate::infrastructure::pool::PoolConfig::default()));
        pool.insert(crate::domain::connection::ClientInfo::default());

        let state = HealthServerState::new(
            "0.1.0".to_string(),
            pool,
            catalog.clone(),
            oscillator,
            Arc::new(SharedHealthStatus::default()),
        );

        let response = build_health_response(&state);
        assert_eq!(response.pool.active_connections, 1);
        assert_eq!(response.catalog.symbol_count, catalog.len());
    }
}
