//! Per-delivery order processing logic for the worker pool (C7).

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::domain::order::OrderRepository;
use crate::domain::shared::{OrderId, WorkerId};

use crate::application::ports::{
    AckDecision, BusMessage, EventPublisherPort, IMarketDataClient, IOrderExecutionClient,
    MessageBusPort, MessageHandler, PublishOptions,
};

use super::circuit_registry::WorkerCircuitBreakers;
use super::retry::{retries_exhausted, retry_queue_for_attempt};

#[derive(Debug, Deserialize)]
struct SubmittedOrderPayload {
    order_id: String,
}

/// Processes deliveries from `orders.processing`: resolves market price,
/// executes the order, and persists the resulting transition. Implements
/// [`MessageHandler`] so it plugs directly into
/// [`MessageBusPort::consume`].
pub struct OrderProcessingHandler<O, M, X, E, B>
where
    O: OrderRepository,
    M: IMarketDataClient,
    X: IOrderExecutionClient,
    E: EventPublisherPort,
    B: MessageBusPort,
{
    worker_id: WorkerId,
    orders: Arc<O>,
    market_data: Arc<M>,
    execution: Arc<X>,
    events: Arc<E>,
    bus: Arc<B>,
    circuit_breakers: Arc<WorkerCircuitBreakers>,
}

impl<O, M, X, E, B> OrderProcessingHandler<O, M, X, E, B>
where
    O: OrderRepository,
    M: IMarketDataClient,
    X: IOrderExecutionClient,
    E: EventPublisherPort,
    B: MessageBusPort,
{
    /// Builds a handler for the given worker id.
    pub fn new(
        worker_id: WorkerId,
        orders: Arc<O>,
        market_data: Arc<M>,
        execution: Arc<X>,
        events: Arc<E>,
        bus: Arc<B>,
        circuit_breakers: Arc<WorkerCircuitBreakers>,
    ) -> Self {
        Self {
            worker_id,
            orders,
            market_data,
            execution,
            events,
            bus,
            circuit_breakers,
        }
    }

    async fn process(&self, order_id: &OrderId) -> AckDecision {
        let Ok(Some(mut order)) = self.orders.find_by_id(order_id).await else {
            warn!(order_id = %order_id.as_str(), "order not found for processing message, dropping");
            return AckDecision::Ack;
        };

        if order.status().is_terminal() {
            return AckDecision::Ack;
        }

        if let Err(err) = order.mark_processing(self.worker_id.clone()) {
            error!(order_id = %order_id.as_str(), error = %err, "cannot mark order processing");
            return AckDecision::NackDrop;
        }
        if self.orders.save(&order).await.is_err() {
            return AckDecision::NackRequeue;
        }
        self.publish_events(&mut order).await;

        let market_price = match self.market_data.current_price(order.symbol()).await {
            Ok(price) => price,
            Err(err) => {
                warn!(order_id = %order_id.as_str(), error = %err, "market data unavailable, retrying");
                return self.route_for_retry(&mut order).await;
            }
        };
        order.attach_market_snapshot(market_price, crate::domain::shared::Timestamp::now());
        if self.orders.save(&order).await.is_err() {
            return AckDecision::NackRequeue;
        }
        self.publish_events(&mut order).await;

        let breaker = self.circuit_breakers.get_or_create(self.worker_id.as_str());
        if !breaker.is_call_permitted() {
            warn!(order_id = %order_id.as_str(), worker = %self.worker_id.as_str(), "circuit open, routing to retry");
            return self.route_for_retry(&mut order).await;
        }

        match self.execution.execute(&order, market_price).await {
            Ok(execution_price) => {
                breaker.record_success();
                if order.mark_executed(execution_price).is_err() {
                    return AckDecision::NackDrop;
                }
                if self.orders.save(&order).await.is_err() {
                    return AckDecision::NackRequeue;
                }
                self.publish_events(&mut order).await;
                info!(order_id = %order_id.as_str(), "order executed");
                AckDecision::Ack
            }
            Err(err) => {
                breaker.record_failure();
                if err.is_transient() {
                    self.route_for_retry(&mut order).await
                } else {
                    self.route_to_dlq(&mut order, &err.to_string()).await
                }
            }
        }
    }

    async fn route_for_retry(&self, order: &mut crate::domain::order::Order) -> AckDecision {
        let retry_count = order.retry_count();
        if retries_exhausted(retry_count) {
            return self.route_to_dlq(order, "max retries exceeded").await;
        }

        order.increment_retry();
        let queue = retry_queue_for_attempt(retry_count);
        let _ = self.orders.save(order).await;

        let payload = serde_json::json!({ "order_id": order.id().as_str() });
        let Ok(bytes) = serde_json::to_vec(&payload) else {
            return AckDecision::NackDrop;
        };

        match self
            .bus
            .publish_with_options(queue, bytes, PublishOptions::standard(order.id().as_str()))
            .await
        {
            Ok(()) => AckDecision::Ack,
            Err(err) => {
                error!(order_id = %order.id().as_str(), error = %err, "failed to publish to retry tier");
                AckDecision::NackRequeue
            }
        }
    }

    async fn route_to_dlq(
        &self,
        order: &mut crate::domain::order::Order,
        reason: &str,
    ) -> AckDecision {
        if order.mark_failed(reason).is_err() {
            return AckDecision::NackDrop;
        }
        let _ = self.orders.save(order).await;
        self.publish_events(order).await;

        let payload = serde_json::json!({ "order_id": order.id().as_str(), "reason": reason });
        if let Ok(bytes) = serde_json::to_vec(&payload) {
            let _ = self
                .bus
                .publish_with_options("orders.dlq", bytes, PublishOptions::standard(order.id().as_str()))
                .await;
        }

        AckDecision::Ack
    }

    async fn publish_events(&self, order: &mut crate::domain::order::Order) {
        let events = order.drain_events();
        if events.is_empty() {
            return;
        }
        if let Err(err) = self.events.publish_order_events(events).await {
            warn!(error = %err, "failed to publish worker-produced domain events");
        }
    }
}

#[async_trait]
impl<O, M, X, E, B> MessageHandler for OrderProcessingHandler<O, M, X, E, B>
where
    O: OrderRepository,
    M: IMarketDataClient,
    X: IOrderExecutionClient,
    E: EventPublisherPort,
    B: MessageBusPort,
{
    async fn handle(&self, message: BusMessage) -> AckDecision {
        let Ok(payload) = serde_json::from_slice::<SubmittedOrderPayload>(&message.payload) else {
            error!("unparseable order-processing message, dropping");
            return AckDecision::NackDrop;
        };

        let order_id = OrderId::new(payload.order_id);
        self.process(&order_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{
        BusError, MockIMarketDataClient, MockIOrderExecutionClient, NoOpEventPublisher,
    };
    use crate::domain::order::{CreateOrderCommand, Order};
    use crate::domain::order::value_objects::{OrderSide, OrderType};
    use crate::domain::shared::{Money, Quantity, Symbol};
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use std::sync::RwLock as StdRwLock;
    use crate::domain::order::OrderError;

    #[derive(Default)]
    struct InMemoryOrders {
        orders: StdRwLock<HashMap<String, Order>>,
    }

    #[async_trait]
    impl OrderRepository for InMemoryOrders {
        async fn save(&self, order: &Order) -> Result<(), OrderError> {
            self.orders
                .write()
                .unwrap()
                .insert(order.id().as_str().to_string(), order.clone());
            Ok(())
        }

        async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, OrderError> {
            Ok(self.orders.read().unwrap().get(id.as_str()).cloned())
        }

        async fn find_by_user(&self, _user_id: &str) -> Result<Vec<Order>, OrderError> {
            Ok(Vec::new())
        }

        async fn find_by_user_and_status(
            &self,
            _user_id: &str,
            _status: crate::domain::order::value_objects::OrderStatus,
        ) -> Result<Vec<Order>, OrderError> {
            Ok(Vec::new())
        }

        async fn find_by_status(
            &self,
            _status: crate::domain::order::value_objects::OrderStatus,
        ) -> Result<Vec<Order>, OrderError> {
            Ok(Vec::new())
        }

        async fn update_status(
            &self,
            _id: &OrderId,
            _status: crate::domain::order::value_objects::OrderStatus,
            _failure_reason: Option<String>,
        ) -> Result<(), OrderError> {
            Ok(())
        }

        async fn update_execution(
            &self,
            _id: &OrderId,
            _execution_price: crate::domain::shared::Money,
            _executed_at: chrono::DateTime<chrono::Utc>,
        ) -> Result<(), OrderError> {
            Ok(())
        }

        async fn find_history(
            &self,
            _user_id: &str,
            _limit: u32,
            _offset: u32,
        ) -> Result<Vec<Order>, OrderError> {
            Ok(Vec::new())
        }

        async fn find_by_symbol(
            &self,
            _symbol: &crate::domain::shared::Symbol,
        ) -> Result<Vec<Order>, OrderError> {
            Ok(Vec::new())
        }

        async fn find_by_date_range(
            &self,
            _from: chrono::DateTime<chrono::Utc>,
            _to: chrono::DateTime<chrono::Utc>,
        ) -> Result<Vec<Order>, OrderError> {
            Ok(Vec::new())
        }

        async fn count_by_user(&self, _user_id: &str) -> Result<u64, OrderError> {
            Ok(0)
        }

        async fn delete(&self, _id: &OrderId) -> Result<(), OrderError> {
            Ok(())
        }
    }

    struct RecordingBus {
        published: StdRwLock<Vec<String>>,
    }

    #[async_trait]
    impl MessageBusPort for RecordingBus {
        async fn publish(&self, queue: &str, _payload: Vec<u8>) -> Result<(), BusError> {
            self.published.write().unwrap().push(queue.to_string());
            Ok(())
        }

        async fn publish_with_options(
            &self,
            queue: &str,
            _payload: Vec<u8>,
            _options: crate::application::ports::PublishOptions,
        ) -> Result<(), BusError> {
            self.published.write().unwrap().push(queue.to_string());
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

    fn pending_order() -> Order {
        Order::new(CreateOrderCommand {
            user_id: "user-1".to_string(),
            symbol: Symbol::new("AAPL"),
            side: OrderSide::Buy,
            order_type: OrderType::Market,
            quantity: Quantity::new(dec!(10)),
            price: None,
        })
        .unwrap()
    }

    fn handler_for(
        orders: Arc<InMemoryOrders>,
        market_data: MockIMarketDataClient,
        execution: MockIOrderExecutionClient,
        bus: Arc<RecordingBus>,
    ) -> OrderProcessingHandler<InMemoryOrders, MockIMarketDataClient, MockIOrderExecutionClient, NoOpEventPublisher, RecordingBus>
    {
        OrderProcessingHandler::new(
            WorkerId::new("worker-test"),
            orders,
            Arc::new(market_data),
            Arc::new(execution),
            Arc::new(NoOpEventPublisher),
            bus,
            Arc::new(WorkerCircuitBreakers::default()),
        )
    }

    #[tokio::test]
    async fn executes_order_successfully_and_publishes_position_update() {
        let order = pending_order();
        let order_id = order.id().as_str().to_string();
        let orders = Arc::new(InMemoryOrders::default());
        orders.save(&order).await.unwrap();

        let mut market_data = MockIMarketDataClient::new();
        market_data
            .expect_current_price()
            .returning(|_| Ok(Money::new(dec!(100))));

        let mut execution = MockIOrderExecutionClient::new();
        execution
            .expect_execute()
            .returning(|_, _| Ok(Money::new(dec!(100))));

        let bus = Arc::new(RecordingBus { published: StdRwLock::new(Vec::new()) });
        let handler = handler_for(orders.clone(), market_data, execution, bus);

        let message = BusMessage {
            payload: serde_json::to_vec(&serde_json::json!({ "order_id": order_id })).unwrap(),
            headers: HashMap::new(),
            redelivered: false,
        };

        let decision = handler.handle(message).await;
        assert_eq!(decision, AckDecision::Ack);

        let stored = orders.find_by_id(&OrderId::new(order_id)).await.unwrap().unwrap();
        assert!(stored.status().is_terminal());
    }

    #[tokio::test]
    async fn terminal_order_is_acked_and_dropped() {
        let mut order = pending_order();
        order.mark_failed("already failed").unwrap();
        let order_id = order.id().as_str().to_string();
        let orders = Arc::new(InMemoryOrders::default());
        orders.save(&order).await.unwrap();

        let market_data = MockIMarketDataClient::new();
        let execution = MockIOrderExecutionClient::new();
        let bus = Arc::new(RecordingBus { published: StdRwLock::new(Vec::new()) });
        let handler = handler_for(orders, market_data, execution, bus);

        let message = BusMessage {
            payload: serde_json::to_vec(&serde_json::json!({ "order_id": order_id })).unwrap(),
            headers: HashMap::new(),
            redelivered: false,
        };

        assert_eq!(handler.handle(message).await, AckDecision::Ack);
    }

    #[tokio::test]
    async fn transient_execution_failure_routes_to_retry_tier() {
        let order = pending_order();
        let order_id = order.id().as_str().to_string();
        let orders = Arc::new(InMemoryOrders::default());
        orders.save(&order).await.unwrap();

        let mut market_data = MockIMarketDataClient::new();
        market_data
            .expect_current_price()
            .returning(|_| Ok(Money::new(dec!(100))));

        let mut execution = MockIOrderExecutionClient::new();
        execution.expect_execute().returning(|_, _| {
            Err(crate::application::ports::ExecutionError::Unavailable("timeout".to_string()))
        });

        let bus = Arc::new(RecordingBus { published: StdRwLock::new(Vec::new()) });
        let handler = handler_for(orders.clone(), market_data, execution, bus.clone());

        let message = BusMessage {
            payload: serde_json::to_vec(&serde_json::json!({ "order_id": order_id.clone() })).unwrap(),
            headers: HashMap::new(),
            redelivered: false,
        };

        assert_eq!(handler.handle(message).await, AckDecision::Ack);
        let published = bus.published.read().unwrap();
        assert!(published.iter().any(|q| q == "orders.retry.5m"));

        let stored = orders.find_by_id(&OrderId::new(order_id)).await.unwrap().unwrap();
        assert_eq!(stored.retry_count(), 1);
        assert!(!stored.status().is_terminal());
    }

    #[tokio::test]
    async fn permanent_execution_failure_routes_to_dlq() {
        let order = pending_order();
        let order_id = order.id().as_str().to_string();
        let orders = Arc::new(InMemoryOrders::default());
        orders.save(&order).await.unwrap();

        let mut market_data = MockIMarketDataClient::new();
        market_data
            .expect_current_price()
            .returning(|_| Ok(Money::new(dec!(100))));

        let mut execution = MockIOrderExecutionClient::new();
        execution
            .expect_execute()
            .returning(|_, _| Err(crate::application::ports::ExecutionError::Rejected("bad order".to_string())));

        let bus = Arc::new(RecordingBus { published: StdRwLock::new(Vec::new()) });
        let handler = handler_for(orders.clone(), market_data, execution, bus.clone());

        let message = BusMessage {
            payload: serde_json::to_vec(&serde_json::json!({ "order_id": order_id.clone() })).unwrap(),
            headers: HashMap::new(),
            redelivered: false,
        };

        assert_eq!(handler.handle(message).await, AckDecision::Ack);
        let published = bus.published.read().unwrap();
        assert!(published.iter().any(|q| q == "orders.dlq"));

        let stored = orders.find_by_id(&OrderId::new(order_id)).await.unwrap().unwrap();
        assert!(stored.status().is_terminal());
    }
}
