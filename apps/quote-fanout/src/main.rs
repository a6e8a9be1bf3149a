//! Quote Fan-out Binary
//!
//! Starts the realtime quote fan-out service.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin quote-fanout
//! ```
//!
//! # Environment Variables
//!
//! All tunables are read with the `QUOTE_FANOUT_` prefix (see
//! `infrastructure::config::settings` for the full list), e.g.:
//!
//! - `QUOTE_FANOUT_WEBSOCKET_PORT`: `/quotes` WebSocket port (default: 8090)
//! - `QUOTE_FANOUT_HEALTH_PORT`: health/metrics HTTP port (default: 8082)
//! - `QUOTE_FANOUT_AUTH_MODE`: `simulated` | `http` (default: simulated)
//! - `OTEL_ENABLED`: Enable OpenTelemetry (default: true)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: <http://localhost:4318>)
//! - `OTEL_SERVICE_NAME`: Service name (default: quote-fanout)
//! - `RUST_LOG`: Log level (default: info)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use quote_fanout::domain::reconnection::ReconnectionPriority;
use quote_fanout::infrastructure::auth;
use quote_fanout::infrastructure::catalog::{Oscillator, QuoteCatalog};
use quote_fanout::infrastructure::health::{HealthServer, HealthServerState, SharedHealthStatus};
use quote_fanout::infrastructure::pool::ConnectionPool;
use quote_fanout::infrastructure::websocket::{router as quotes_router, WebSocketState};
use quote_fanout::infrastructure::{config::AppConfig, metrics, telemetry};
use quote_fanout::application::ports::{PoolObserverPort, ScalingPort, VerifyTokenPort};
use quote_fanout::application::services::{autoscaler, health_monitor, reconnection_manager};
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Graceful shutdown timeout.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// How often the reconnection scheduler scans the pool for tripped breakers.
const RECONNECT_SCAN_INTERVAL: Duration = Duration::from_secs(5);

/// How often the reconnection manager drains its due queue.
const RECONNECT_DRAIN_INTERVAL: Duration = Duration::from_millis(500);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    load_dotenv();

    let _telemetry_guard = telemetry::init();

    tracing::info!("Starting quote fan-out service");

    let _metrics_handle = metrics::init_metrics();

    let config = AppConfig::from_env()?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();

    let catalog = Arc::new(QuoteCatalog::with_default_symbols());
    let oscillator = Arc::new(Oscillator::new(catalog.clone(), config.oscillator));
    let pool = Arc::new(ConnectionPool::new(config.pool));

    let verifier: Arc<dyn VerifyTokenPort> = match config.auth.mode {
        quote_fanout::AuthMode::Simulated => Arc::new(auth::SimulatedTokenVerifier::new()),
        quote_fanout::AuthMode::Http => {
            let verify_url = config
                .auth
                .verify_url
                .clone()
                .expect("from_env validates verify_url is set when auth_mode is http");
            Arc::new(auth::HttpTokenVerifier::new(verify_url, config.auth.timeout))
        }
    };

    let shared_status = Arc::new(SharedHealthStatus::default());
    let health_state = Arc::new(HealthServerState::new(
        env!("CARGO_PKG_VERSION").to_string(),
        pool.clone(),
        catalog.clone(),
        oscillator.clone(),
        shared_status.clone(),
    ));
    let health_server = HealthServer::new(
        config.server.health_port,
        health_state,
        shutdown_token.clone(),
    );

    let ws_state = WebSocketState {
        oscillator: oscillator.clone(),
        pool: pool.clone(),
        verifier,
    };
    let quotes_app = quotes_router(ws_state);

    // Oscillator tick loop.
    let oscillator_run = oscillator.clone();
    let oscillator_cancel = shutdown_token.clone();
    tokio::spawn(async move {
        oscillator_run.run(oscillator_cancel).await;
    });

    // Connection pool maintenance sweep.
    let pool_run = pool.clone();
    let pool_cancel = shutdown_token.clone();
    tokio::spawn(async move {
        pool_run.run_maintenance(pool_cancel).await;
    });

    // Health monitor: classifies pool health and republishes it to both the
    // HTTP health endpoint and the metrics gauge.
    let health_observer: Arc<dyn PoolObserverPort> = pool.clone();
    let health_status_sink = shared_status.clone();
    let health_monitor_cancel = shutdown_token.clone();
    tokio::spawn(async move {
        health_monitor::run(
            health_observer,
            health_monitor::HealthMonitorConfig {
                interval: config.health.interval,
                thresholds: config.health.thresholds,
            },
            move |status| {
                health_status_sink.set(status);
                metrics::set_health_status(status);
            },
            health_monitor_cancel,
        )
        .await;
    });

    // Autoscaler: adjusts the pool's soft connection ceiling.
    let autoscale_observer: Arc<dyn PoolObserverPort> = pool.clone();
    let autoscale_scaler: Arc<dyn ScalingPort> = pool.clone();
    let autoscaler_cancel = shutdown_token.clone();
    tokio::spawn(async move {
        autoscaler::run(
            autoscale_observer,
            autoscale_scaler,
            autoscaler::AutoscalerConfig {
                interval: Duration::from_secs(15),
                autoscale: config.autoscale,
            },
            autoscaler_cancel,
        )
        .await;
    });

    // Reconnection manager: the pool itself implements `ReconnectionPort` by
    // probing whether a tripped connection's circuit breaker has recovered.
    let reconnection_port: Arc<ConnectionPool> = pool.clone();
    let reconnection_manager = Arc::new(reconnection_manager::ReconnectionManager::new(
        reconnection_port,
        config.reconnection,
    ));

    let reconnect_run = reconnection_manager.clone();
    let reconnect_cancel = shutdown_token.clone();
    tokio::spawn(async move {
        reconnect_run.run(RECONNECT_DRAIN_INTERVAL, reconnect_cancel).await;
    });

    // Scheduler: periodically scans the pool for connections whose breaker
    // has tripped and hands them to the reconnection manager.
    let scan_pool = pool.clone();
    let scan_manager = reconnection_manager.clone();
    let scan_cancel = shutdown_token.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(RECONNECT_SCAN_INTERVAL);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                () = scan_cancel.cancelled() => break,
                _ = ticker.tick() => {
                    for connection_id in scan_pool.tripped_connections() {
                        scan_manager.schedule(connection_id, ReconnectionPriority::Normal);
                    }
                }
            }
        }
    });

    // Health + metrics HTTP server.
    tokio::spawn(async move {
        if let Err(e) = health_server.run().await {
            tracing::error!(error = %e, "health server error");
        }
    });

    // Quotes WebSocket server.
    let quotes_addr: SocketAddr = format!("0.0.0.0:{}", config.server.websocket_port).parse()?;
    let quotes_cancel = shutdown_token.clone();
    tokio::spawn(async move {
        tracing::info!(addr = %quotes_addr, "quotes server listening");
        match TcpListener::bind(quotes_addr).await {
            Ok(listener) => {
                if let Err(e) = axum::serve(listener, quotes_app)
                    .with_graceful_shutdown(quotes_cancel.cancelled_owned())
                    .await
                {
                    tracing::error!(error = %e, "quotes server error");
                }
            }
            Err(e) => tracing::error!(error = %e, "failed to bind quotes server"),
        }
        tracing::info!("quotes server stopped");
    });

    tracing::info!("quote fan-out service ready");

    await_shutdown(shutdown_token).await;

    tracing::info!("quote fan-out service stopped");
    Ok(())
}

/// Load .env file from current or ancestor directories.
fn load_dotenv() {
    if dotenvy::dotenv().is_err() {
        load_dotenv_from_ancestors();
    }
}

/// Log the parsed configuration.
fn log_config(config: &AppConfig) {
    tracing::info!(
        websocket_port = config.server.websocket_port,
        health_port = config.server.health_port,
        metrics_port = config.server.metrics_port,
        auth_mode = ?config.auth.mode,
        "configuration loaded"
    );
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv_from_ancestors() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();

    tracing::info!(
        timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
        "Graceful shutdown started"
    );
}
