//! Order Core Binary
//!
//! Starts the order submission/processing engine: an HTTP health/metrics
//! surface, the `orders.processing` worker pool, the outbox sweeper, and
//! a DLQ recovery consumer, all wired against the `lapin`-backed message
//! bus and either the in-memory or Turso-backed persistence adapters.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin order-core
//! ```
//!
//! # Environment Variables
//!
//! - `ORDER_CORE_CONFIG`: path to the YAML config file (default: `config.yaml`)
//! - `AMQP_URL`, `HTTP_PORT`, and the other `${VAR}` references `config.yaml`
//!   interpolates — see `infrastructure::config`.
//! - `RUST_LOG`: log level (default: info)

use std::sync::Arc;
use std::time::Duration;

use order_core::application::ports::{BusEventPublisher, MessageHandler};
use order_core::application::use_cases::{DlqRecoveryHandler, OutboxSweeperUseCase, SubmitOrderUseCase};
use order_core::application::workers::{OrderProcessingHandler, WorkerCircuitBreakers, WorkerPoolManager};
use order_core::domain::shared::WorkerId;
use order_core::domain::validation::ValidationLimits;
use order_core::infrastructure::config::{self, PersistenceBackend};
use order_core::infrastructure::external::{
    SimulatedMarketDataClient, SimulatedOrderExecutionClient, SimulatedPositionClient,
    SimulatedPricingDataClient, SimulatedRiskDataClient,
};
use order_core::infrastructure::health::{HealthServer, HealthServerState};
use order_core::infrastructure::messaging::LapinMessageBus;
use order_core::infrastructure::persistence::{
    InMemoryIdempotencyRepository, InMemoryOrderRepository, TursoIdempotencyRepository,
    TursoOrderRepository,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// How often the outbox sweeper scans for stuck PENDING orders.
const OUTBOX_SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// How long a PENDING order may sit before the outbox sweeper republishes it.
const OUTBOX_STALE_AFTER: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("order_core=info".parse().unwrap_or_default())
                .add_directive("tower_http=info".parse().unwrap_or_default()),
        )
        .init();

    tracing::info!("Starting order-core");

    let config_path = std::env::var("ORDER_CORE_CONFIG").ok();
    let cfg = config::load_config(config_path.as_deref()).unwrap_or_else(|err| {
        tracing::warn!(error = %err, "falling back to default configuration");
        config::Config::default()
    });

    tracing::info!(
        http_port = cfg.server.http_port,
        backend = ?cfg.persistence.backend,
        environment = %cfg.environment.mode,
        "configuration loaded"
    );

    let shutdown_token = CancellationToken::new();

    let bus = Arc::new(
        LapinMessageBus::connect(&cfg.messaging.amqp_url)
            .await
            .map_err(|e| format!("failed to connect to message bus: {e}"))?,
    );

    match cfg.persistence.backend {
        PersistenceBackend::InMemory => {
            run_with_persistence(
                Arc::new(InMemoryOrderRepository::new()),
                Arc::new(InMemoryIdempotencyRepository::new()),
                bus,
                cfg,
                shutdown_token,
            )
            .await
        }
        PersistenceBackend::Turso => {
            let orders = Arc::new(
                TursoOrderRepository::new_local(&cfg.persistence.turso_path)
                    .await
                    .map_err(|e| format!("failed to open turso order store: {e}"))?,
            );
            let idempotency = Arc::new(
                TursoIdempotencyRepository::new_local(&cfg.persistence.turso_path)
                    .await
                    .map_err(|e| format!("failed to open turso idempotency store: {e}"))?,
            );
            run_with_persistence(orders, idempotency, bus, cfg, shutdown_token).await
        }
    }
}

#[allow(clippy::too_many_lines)]
async fn run_with_persistence<O, I>(
    orders: Arc<O>,
    idempotency: Arc<I>,
    bus: Arc<LapinMessageBus>,
    cfg: config::Config,
    shutdown_token: CancellationToken,
) -> Result<(), Box<dyn std::error::Error>>
where
    O: order_core::domain::order::OrderRepository + 'static,
    I: order_core::domain::idempotency::IdempotencyRepository + 'static,
{
    let events = Arc::new(BusEventPublisher::new(bus.clone()));
    let market_data = Arc::new(SimulatedMarketDataClient::new());
    let positions = Arc::new(SimulatedPositionClient::new());
    let pricing_data = Arc::new(SimulatedPricingDataClient::new());
    let risk_data = Arc::new(SimulatedRiskDataClient::new());
    let execution = Arc::new(SimulatedOrderExecutionClient::new());

    let submit_order = Arc::new(SubmitOrderUseCase::new(
        orders.clone(),
        idempotency.clone(),
        bus.clone(),
        events.clone(),
        market_data.clone(),
        positions.clone(),
        pricing_data.clone(),
        risk_data.clone(),
        ValidationLimits::default(),
    ));

    // Worker pool: consumes `orders.processing`, executes, and publishes
    // OrderExecuted to `positions.updates`.
    let worker_circuit_breakers = Arc::new(WorkerCircuitBreakers::default());
    let handler_orders = orders.clone();
    let handler_market_data = market_data.clone();
    let handler_execution = execution.clone();
    let handler_events = events.clone();
    let handler_bus = bus.clone();
    let handler_breakers = worker_circuit_breakers.clone();
    let handler_factory = Arc::new(move |worker_id: WorkerId| {
        Arc::new(OrderProcessingHandler::new(
            worker_id,
            handler_orders.clone(),
            handler_market_data.clone(),
            handler_execution.clone(),
            handler_events.clone(),
            handler_bus.clone(),
            handler_breakers.clone(),
        )) as Arc<dyn MessageHandler>
    });

    let worker_pool_config = cfg.worker_pool.to_worker_pool_config();
    let shutdown_timeout = cfg.worker_pool.shutdown_timeout();
    let workers = Arc::new(
        WorkerPoolManager::start(
            worker_pool_config,
            cfg.messaging.processing_queue.clone(),
            bus.clone(),
            handler_factory,
        )
        .await,
    );

    // DLQ recovery: drains `orders.dlq`, cancelling each order it can
    // identify so downstream consumers see a terminal OrderCancelled
    // instead of an order stuck FAILED forever.
    let dlq_handler: Arc<dyn MessageHandler> =
        Arc::new(DlqRecoveryHandler::new(orders.clone(), events.clone()));
    if let Err(err) = bus.consume("orders.dlq", 1, dlq_handler).await {
        tracing::error!(error = %err, "failed to start DLQ recovery consumer");
    }

    // Outbox sweeper: republishes PENDING orders whose OrderSubmitted
    // publish never reached the bus after the persist committed.
    let sweeper = OutboxSweeperUseCase::new(orders.clone(), bus.clone(), OUTBOX_STALE_AFTER);
    let sweeper_cancel = shutdown_token.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(OUTBOX_SWEEP_INTERVAL);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                () = sweeper_cancel.cancelled() => break,
                _ = ticker.tick() => {
                    match sweeper.sweep().await {
                        Ok(0) => {}
                        Ok(n) => tracing::info!(republished = n, "outbox sweeper republished stuck orders"),
                        Err(err) => tracing::warn!(error = %err, "outbox sweep failed"),
                    }
                }
            }
        }
    });

    // Health/metrics HTTP surface.
    let health_state = Arc::new(HealthServerState::new(
        env!("CARGO_PKG_VERSION").to_string(),
        bus.clone(),
        workers.clone(),
    ));
    let health_server = HealthServer::new(cfg.server.http_port, health_state, shutdown_token.clone());
    let health_handle = tokio::spawn(async move {
        if let Err(e) = health_server.run().await {
            tracing::error!(error = %e, "health server error");
        }
    });

    // `submit_order` is the entry point the (out-of-scope) HTTP/gRPC
    // façade would call; retained here so startup fails fast if wiring it
    // is broken, matching the rest of the corpus's eager construction.
    drop(submit_order);

    tracing::info!("order-core ready");

    await_shutdown(shutdown_token.clone()).await;
    shutdown_token.cancel();

    workers.shutdown(shutdown_timeout).await;
    let _ = health_handle.await;

    tracing::info!("order-core stopped");
    Ok(())
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_err() {
        load_dotenv_from_ancestors();
    }
}

fn load_dotenv_from_ancestors() {
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
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
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
        () = shutdown_token.cancelled() => {}
    }
}
