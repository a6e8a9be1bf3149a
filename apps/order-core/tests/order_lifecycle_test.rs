//! End-to-end coverage of order submission through worker processing,
//! using the crate's public API and its in-memory/simulated adapters the
//! way the reference binary wires them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal_macros::dec;

use order_core::application::ports::{
    AckDecision, AssetDetails, BusError, BusMessage, IMarketDataClient, MarketDataError,
    MessageBusPort, MessageHandler, NoOpEventPublisher, PublishOptions, TradingHours,
};
use order_core::application::use_cases::{DlqRecoveryHandler, SubmitOrderRequest, SubmitOrderUseCase};
use order_core::application::workers::{OrderProcessingHandler, WorkerCircuitBreakers};
use order_core::domain::order::OrderStatus;
use order_core::domain::shared::{Money, Symbol, WorkerId};
use order_core::domain::validation::ValidationLimits;
use order_core::infrastructure::external::{
    SimulatedOrderExecutionClient, SimulatedPositionClient, SimulatedPricingDataClient,
    SimulatedRiskDataClient,
};
use order_core::infrastructure::persistence::{InMemoryIdempotencyRepository, InMemoryOrderRepository};

/// Market data double that is always open and always prices a symbol the
/// same way, so the lifecycle test is not at the mercy of wall-clock
/// trading hours the way `SimulatedMarketDataClient` is.
#[derive(Debug, Default)]
struct AlwaysOpenMarketDataClient;

#[async_trait]
impl IMarketDataClient for AlwaysOpenMarketDataClient {
    async fn validate_symbol(&self, symbol: &Symbol) -> Result<bool, MarketDataError> {
        Ok(!symbol.as_str().is_empty())
    }

    async fn current_price(&self, _symbol: &Symbol) -> Result<Money, MarketDataError> {
        Ok(Money::new(dec!(100.00)))
    }

    async fn is_market_open(&self) -> Result<bool, MarketDataError> {
        Ok(true)
    }

    async fn asset_details(&self, symbol: &Symbol) -> Result<AssetDetails, MarketDataError> {
        Ok(AssetDetails {
            symbol: symbol.clone(),
            tradeable: true,
            name: "Test Instrument".to_string(),
        })
    }

    async fn trading_hours(&self) -> Result<TradingHours, MarketDataError> {
        let now = chrono::Utc::now();
        Ok(TradingHours { open: now, close: now })
    }
}

/// Bus double that records every queue a message was published to instead
/// of talking to a broker, so tests can assert on routing decisions.
#[derive(Default)]
struct RecordingBus {
    published: Mutex<Vec<String>>,
}

impl RecordingBus {
    fn published_queues(&self) -> Vec<String> {
        self.published.lock().expect("lock poisoned").clone()
    }
}

#[async_trait]
impl MessageBusPort for RecordingBus {
    async fn publish(&self, queue: &str, _payload: Vec<u8>) -> Result<(), BusError> {
        self.published.lock().expect("lock poisoned").push(queue.to_string());
        Ok(())
    }

    async fn publish_with_options(
        &self,
        queue: &str,
        _payload: Vec<u8>,
        _options: PublishOptions,
    ) -> Result<(), BusError> {
        self.published.lock().expect("lock poisoned").push(queue.to_string());
        Ok(())
    }

    async fn consume(
        &self,
        _queue: &str,
        _prefetch: u16,
        _handler: Arc<dyn MessageHandler>,
    ) -> Result<(), BusError> {
        Ok(())
    }
}

fn submit_request() -> SubmitOrderRequest {
    SubmitOrderRequest {
        user_id: "user-1".to_string(),
        symbol: "AAPL".to_string(),
        side: order_core::domain::order::OrderSide::Buy,
        order_type: order_core::domain::order::OrderType::Market,
        quantity: "10".to_string(),
        price: None,
    }
}

fn processing_message(order_id: &str) -> BusMessage {
    BusMessage {
        payload: serde_json::json!({ "order_id": order_id }).to_string().into_bytes(),
        headers: HashMap::new(),
        redelivered: false,
    }
}

#[tokio::test]
async fn submitted_order_is_executed_by_the_worker_handler() {
    let orders = Arc::new(InMemoryOrderRepository::new());
    let idempotency = Arc::new(InMemoryIdempotencyRepository::new());
    let bus = Arc::new(RecordingBus::default());
    let events = Arc::new(NoOpEventPublisher);
    let market_data = Arc::new(AlwaysOpenMarketDataClient);
    let positions = Arc::new(SimulatedPositionClient::new());
    let pricing_data = Arc::new(SimulatedPricingDataClient::new());
    let risk_data = Arc::new(SimulatedRiskDataClient::new());
    let execution = Arc::new(SimulatedOrderExecutionClient::new());

    let submit_order = SubmitOrderUseCase::new(
        orders.clone(),
        idempotency.clone(),
        bus.clone(),
        events.clone(),
        market_data.clone(),
        positions.clone(),
        pricing_data.clone(),
        risk_data.clone(),
        ValidationLimits::default(),
    );

    let result = submit_order.execute(submit_request()).await.expect("submission succeeds");
    assert!(!result.resolved_from_prior_request);

    let stored = orders
        .find_by_id(&order_core::domain::shared::OrderId::new(result.order_id.clone()))
        .await
        .expect("lookup succeeds")
        .expect("order was persisted");
    assert_eq!(stored.status(), OrderStatus::Pending);

    let worker_id = WorkerId::new("worker-test-1");
    let breakers = Arc::new(WorkerCircuitBreakers::default());
    let handler = OrderProcessingHandler::new(
        worker_id,
        orders.clone(),
        market_data.clone(),
        execution.clone(),
        events.clone(),
        bus.clone(),
        breakers,
    );

    let decision = handler.handle(processing_message(&result.order_id)).await;
    assert_eq!(decision, AckDecision::Ack);

    let executed = orders
        .find_by_id(&order_core::domain::shared::OrderId::new(result.order_id))
        .await
        .expect("lookup succeeds")
        .expect("order still exists");
    assert_eq!(executed.status(), OrderStatus::Executed);
}

#[tokio::test]
async fn resubmitting_the_same_request_resolves_to_the_same_order_without_reprocessing() {
    let orders = Arc::new(InMemoryOrderRepository::new());
    let idempotency = Arc::new(InMemoryIdempotencyRepository::new());
    let bus = Arc::new(RecordingBus::default());
    let events = Arc::new(NoOpEventPublisher);
    let market_data = Arc::new(AlwaysOpenMarketDataClient);
    let positions = Arc::new(SimulatedPositionClient::new());
    let pricing_data = Arc::new(SimulatedPricingDataClient::new());
    let risk_data = Arc::new(SimulatedRiskDataClient::new());

    let submit_order = SubmitOrderUseCase::new(
        orders, idempotency, bus, events, market_data, positions, pricing_data, risk_data,
        ValidationLimits::default(),
    );

    let first = submit_order.execute(submit_request()).await.expect("first submission succeeds");
    let second = submit_order.execute(submit_request()).await.expect("second submission succeeds");

    assert_eq!(first.order_id, second.order_id);
    assert!(!first.resolved_from_prior_request);
    assert!(second.resolved_from_prior_request);
}

#[tokio::test]
async fn a_transient_execution_failure_routes_the_order_to_the_first_retry_tier() {
    let orders = Arc::new(InMemoryOrderRepository::new());
    let idempotency = Arc::new(InMemoryIdempotencyRepository::new());
    let bus = Arc::new(RecordingBus::default());
    let events = Arc::new(NoOpEventPublisher);
    let market_data = Arc::new(AlwaysOpenMarketDataClient);
    let positions = Arc::new(SimulatedPositionClient::new());
    let pricing_data = Arc::new(SimulatedPricingDataClient::new());
    let risk_data = Arc::new(SimulatedRiskDataClient::new());
    // Fails on the very first execution attempt.
    let execution = Arc::new(SimulatedOrderExecutionClient::with_transient_failure_every(1));

    let submit_order = SubmitOrderUseCase::new(
        orders.clone(),
        idempotency,
        bus.clone(),
        events.clone(),
        market_data.clone(),
        positions,
        pricing_data,
        risk_data,
        ValidationLimits::default(),
    );
    let result = submit_order.execute(submit_request()).await.expect("submission succeeds");

    let handler = OrderProcessingHandler::new(
        WorkerId::new("worker-test-1"),
        orders.clone(),
        market_data,
        execution,
        events,
        bus.clone(),
        Arc::new(WorkerCircuitBreakers::default()),
    );

    let decision = handler.handle(processing_message(&result.order_id)).await;
    assert_eq!(decision, AckDecision::Ack);
    assert!(bus.published_queues().iter().any(|q| q == "orders.retry.5m"));

    let order = orders
        .find_by_id(&order_core::domain::shared::OrderId::new(result.order_id))
        .await
        .expect("lookup succeeds")
        .expect("order still exists");
    assert_eq!(order.status(), OrderStatus::Processing);
}

#[tokio::test]
async fn dlq_recovery_cancels_the_order_and_publishes_the_cancellation() {
    let orders = Arc::new(InMemoryOrderRepository::new());
    let idempotency = Arc::new(InMemoryIdempotencyRepository::new());
    let bus = Arc::new(RecordingBus::default());
    let events = Arc::new(NoOpEventPublisher);
    let market_data = Arc::new(AlwaysOpenMarketDataClient);
    let positions = Arc::new(SimulatedPositionClient::new());
    let pricing_data = Arc::new(SimulatedPricingDataClient::new());
    let risk_data = Arc::new(SimulatedRiskDataClient::new());

    let submit_order = SubmitOrderUseCase::new(
        orders.clone(),
        idempotency,
        bus,
        events.clone(),
        market_data,
        positions,
        pricing_data,
        risk_data,
        ValidationLimits::default(),
    );
    let result = submit_order.execute(submit_request()).await.expect("submission succeeds");

    let dlq_handler = DlqRecoveryHandler::new(orders.clone(), events);
    let decision = dlq_handler
        .handle(processing_message(&result.order_id))
        .await;
    assert_eq!(decision, AckDecision::Ack);
    assert_eq!(dlq_handler.recovered_count(), 1);

    let order = orders
        .find_by_id(&order_core::domain::shared::OrderId::new(result.order_id))
        .await
        .expect("lookup succeeds")
        .expect("order still exists");
    assert_eq!(order.status(), OrderStatus::Cancelled);
}

#[tokio::test]
async fn unparseable_processing_messages_are_dropped_without_panicking() {
    let orders = Arc::new(InMemoryOrderRepository::new());
    let market_data = Arc::new(AlwaysOpenMarketDataClient);
    let execution = Arc::new(SimulatedOrderExecutionClient::new());
    let events = Arc::new(NoOpEventPublisher);
    let bus = Arc::new(RecordingBus::default());

    let handler = OrderProcessingHandler::new(
        WorkerId::new("worker-test-1"),
        orders,
        market_data,
        execution,
        events,
        bus,
        Arc::new(WorkerCircuitBreakers::default()),
    );

    let decision = handler
        .handle(BusMessage { payload: b"not json".to_vec(), headers: HashMap::new(), redelivered: false })
        .await;
    assert_eq!(decision, AckDecision::NackDrop);
}

/// Sanity check that `RecordingBus` and the simulated clients used above
/// behave the way the rest of this file assumes, independent of the
/// order lifecycle under test.
#[tokio::test]
async fn recording_bus_tracks_every_publish_call() {
    let bus = RecordingBus::default();
    bus.publish("orders.processing", vec![]).await.expect("publish succeeds");
    bus.publish("orders.processing", vec![]).await.expect("publish succeeds");
    assert_eq!(bus.published_queues(), vec!["orders.processing", "orders.processing"]);
}
