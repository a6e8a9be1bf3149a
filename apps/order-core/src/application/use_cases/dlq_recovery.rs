//! DLQ Recovery (C6 failure handling, terminal branch).
//!
//! Messages that exhaust every retry tier land in `orders.dlq` via the
//! dead-letter exchange. A human has to look at why, but the Order row
//! itself should not sit FAILED forever without an explicit terminal
//! event for downstream consumers — this handler drains `orders.dlq`,
//! transitions each order to CANCELLED with reason `dlq_recovery`, and
//! publishes the resulting `OrderCancelled` event.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use crate::domain::order::OrderRepository;
use crate::domain::shared::OrderId;

use crate::application::ports::{AckDecision, BusMessage, EventPublisherPort, MessageHandler};

/// Drains `orders.dlq`, cancelling each order it can identify and load.
pub struct DlqRecoveryHandler<O, E>
where
    O: OrderRepository,
    E: EventPublisherPort,
{
    orders: Arc<O>,
    events: Arc<E>,
    recovered: AtomicU64,
}

impl<O, E> DlqRecoveryHandler<O, E>
where
    O: OrderRepository,
    E: EventPublisherPort,
{
    /// Builds a handler that cancels DLQ'd orders through `orders` and
    /// announces the cancellation through `events`.
    #[must_use]
    pub fn new(orders: Arc<O>, events: Arc<E>) -> Self {
        Self {
            orders,
            events,
            recovered: AtomicU64::new(0),
        }
    }

    /// Number of orders cancelled since this handler was created.
    pub fn recovered_count(&self) -> u64 {
        self.recovered.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Deserialize)]
struct DlqPayload {
    order_id: String,
}

#[async_trait]
impl<O, E> MessageHandler for DlqRecoveryHandler<O, E>
where
    O: OrderRepository,
    E: EventPublisherPort,
{
    async fn handle(&self, message: BusMessage) -> AckDecision {
        let payload: DlqPayload = match serde_json::from_slice(&message.payload) {
            Ok(p) => p,
            Err(err) => {
                warn!(error = %err, "dlq recovery: message payload is not recognizable, dropping");
                return AckDecision::NackDrop;
            }
        };

        let order_id = OrderId::new(payload.order_id);

        let mut order = match self.orders.find_by_id(&order_id).await {
            Ok(Some(order)) => order,
            Ok(None) => {
                warn!(order_id = %order_id.as_str(), "dlq recovery: order not found, dropping");
                return AckDecision::NackDrop;
            }
            Err(err) => {
                warn!(order_id = %order_id.as_str(), error = %err, "dlq recovery: lookup failed, requeuing");
                return AckDecision::NackRequeue;
            }
        };

        if let Err(err) = order.mark_cancelled("dlq_recovery") {
            // Already terminal (e.g. a concurrent cancellation); nothing
            // left to do but accept the message.
            info!(order_id = %order_id.as_str(), error = %err, "dlq recovery: order already terminal");
            return AckDecision::Ack;
        }

        if let Err(err) = self.orders.save(&order).await {
            warn!(order_id = %order_id.as_str(), error = %err, "dlq recovery: failed to persist cancellation, requeuing");
            return AckDecision::NackRequeue;
        }

        if let Err(err) = self.events.publish_order_events(order.drain_events()).await {
            warn!(order_id = %order_id.as_str(), error = %err, "dlq recovery: cancelled but event publish failed");
        }

        self.recovered.fetch_add(1, Ordering::Relaxed);
        info!(order_id = %order_id.as_str(), "dlq recovery: order cancelled");
        AckDecision::Ack
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{CreateOrderCommand, OrderError, OrderSide, OrderStatus, OrderType};
    use crate::domain::order::Order;
    use crate::domain::shared::{Money, Quantity, Symbol};
    use crate::application::ports::NoOpEventPublisher;
    use std::collections::HashMap;
    use std::sync::RwLock as StdRwLock;

    struct InMemoryOrders {
        orders: StdRwLock<HashMap<String, Order>>,
    }

    impl InMemoryOrders {
        fn seeded(order: Order) -> Self {
            let mut map = HashMap::new();
            map.insert(order.id().as_str().to_string(), order);
            Self {
                orders: StdRwLock::new(map),
            }
        }
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
            _status: OrderStatus,
        ) -> Result<Vec<Order>, OrderError> {
            Ok(Vec::new())
        }

        async fn find_by_status(&self, _status: OrderStatus) -> Result<Vec<Order>, OrderError> {
            Ok(Vec::new())
        }

        async fn update_status(
            &self,
            _id: &OrderId,
            _status: OrderStatus,
            _failure_reason: Option<String>,
        ) -> Result<(), OrderError> {
            Ok(())
        }

        async fn update_execution(
            &self,
            _id: &OrderId,
            _execution_price: Money,
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

        async fn find_by_symbol(&self, _symbol: &Symbol) -> Result<Vec<Order>, OrderError> {
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

    fn pending_order() -> Order {
        Order::new(CreateOrderCommand {
            user_id: "user-1".to_string(),
            symbol: Symbol::new("AAPL"),
            side: OrderSide::Buy,
            order_type: OrderType::Market,
            quantity: Quantity::from_i64(10),
            price: None,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn cancels_and_counts_a_recognized_order() {
        let order = pending_order();
        let order_id = order.id().as_str().to_string();
        let orders = Arc::new(InMemoryOrders::seeded(order));
        let events = Arc::new(NoOpEventPublisher);
        let handler = DlqRecoveryHandler::new(orders.clone(), events);

        let payload = serde_json::to_vec(&serde_json::json!({ "order_id": order_id })).unwrap();
        let decision = handler
            .handle(BusMessage {
                payload,
                headers: HashMap::new(),
                redelivered: true,
            })
            .await;

        assert_eq!(decision, AckDecision::Ack);
        assert_eq!(handler.recovered_count(), 1);

        let stored = orders
            .find_by_id(&OrderId::new(order_id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status(), OrderStatus::Cancelled);
    }

    #[tokio::test]
    async fn drops_unparseable_payloads() {
        let orders = Arc::new(InMemoryOrders::seeded(pending_order()));
        let events = Arc::new(NoOpEventPublisher);
        let handler = DlqRecoveryHandler::new(orders, events);

        let decision = handler
            .handle(BusMessage {
                payload: b"not json".to_vec(),
                headers: HashMap::new(),
                redelivered: false,
            })
            .await;

        assert_eq!(decision, AckDecision::NackDrop);
        assert_eq!(handler.recovered_count(), 0);
    }

    #[tokio::test]
    async fn drops_messages_for_unknown_orders() {
        let orders = Arc::new(InMemoryOrders::seeded(pending_order()));
        let events = Arc::new(NoOpEventPublisher);
        let handler = DlqRecoveryHandler::new(orders, events);

        let payload =
            serde_json::to_vec(&serde_json::json!({ "order_id": "does-not-exist" })).unwrap();
        let decision = handler
            .handle(BusMessage {
                payload,
                headers: HashMap::new(),
                redelivered: false,
            })
            .await;

        assert_eq!(decision, AckDecision::NackDrop);
    }
}
