//! Outbox Sweeper (recovery half of C6's persist-then-publish step).
//!
//! [`SubmitOrderUseCase`](super::SubmitOrderUseCase) persists a PENDING
//! order before publishing its `orders.processing` message; if the publish
//! fails after the commit, the order sits PENDING with no worker ever
//! picking it up. This sweeper scans for PENDING orders older than a
//! configured threshold and republishes them, closing that gap without
//! blocking the original request on bus availability.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument, warn};

use crate::domain::order::{Order, OrderRepository, OrderStatus};

use crate::application::error::CoreError;
use crate::application::ports::{MessageBusPort, PublishOptions};

/// Scans for stuck PENDING orders and republishes them to
/// `orders.processing`.
pub struct OutboxSweeperUseCase<O, B>
where
    O: OrderRepository,
    B: MessageBusPort,
{
    orders: Arc<O>,
    bus: Arc<B>,
    stale_after: Duration,
}

impl<O, B> OutboxSweeperUseCase<O, B>
where
    O: OrderRepository,
    B: MessageBusPort,
{
    /// Builds a sweeper that treats a PENDING order as stuck once it has
    /// sat unchanged for longer than `stale_after`.
    #[must_use]
    pub fn new(orders: Arc<O>, bus: Arc<B>, stale_after: Duration) -> Self {
        Self {
            orders,
            bus,
            stale_after,
        }
    }

    /// Runs one sweep pass, republishing every stale PENDING order found.
    ///
    /// Returns the number of orders republished. A publish failure for one
    /// order is logged and does not stop the sweep from continuing to the
    /// rest.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::PermanentIO`] if the repository scan itself
    /// fails; per-order publish failures are swallowed and left for the
    /// next sweep.
    #[instrument(skip(self))]
    pub async fn sweep(&self) -> Result<usize, CoreError> {
        let pending = self
            .orders
            .find_by_status(OrderStatus::Pending)
            .await
            .map_err(CoreError::from)?;

        let now = chrono::Utc::now();
        let mut republished = 0usize;

        for order in &pending {
            let age = now.signed_duration_since(order.updated_at().as_datetime());
            let Ok(age) = age.to_std() else { continue };
            if age < self.stale_after {
                continue;
            }

            match self.republish(order).await {
                Ok(()) => {
                    republished += 1;
                    info!(order_id = %order.id().as_str(), "outbox sweeper republished stale order");
                }
                Err(err) => {
                    warn!(
                        order_id = %order.id().as_str(),
                        error = %err,
                        "outbox sweeper failed to republish, will retry next pass"
                    );
                }
            }
        }

        Ok(republished)
    }

    async fn republish(&self, order: &Order) -> Result<(), CoreError> {
        let payload = serde_json::to_vec(&OutboxOrderPayload {
            order_id: order.id().as_str().to_string(),
            user_id: order.user_id().to_string(),
            symbol: order.symbol().as_str().to_string(),
        })
        .map_err(|e| CoreError::Fatal(e.to_string()))?;

        let mut options = PublishOptions::standard(order.id().as_str().to_string());
        options
            .headers
            .insert("event_type".to_string(), "ORDER_SUBMITTED".to_string());
        options
            .headers
            .insert("user_id".to_string(), order.user_id().to_string());
        options
            .headers
            .insert("symbol".to_string(), order.symbol().as_str().to_string());
        options
            .headers
            .insert("outbox_recovery".to_string(), "true".to_string());

        self.bus
            .publish_with_options("orders.processing", payload, options)
            .await
            .map_err(|e| CoreError::TransientIO(e.to_string()))
    }
}

#[derive(serde::Serialize)]
struct OutboxOrderPayload {
    order_id: String,
    user_id: String,
    symbol: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{BusError, MessageHandler, PublishOptions as Opts};
    use crate::domain::order::CreateOrderCommand;
    use crate::domain::order::{OrderSide, OrderType};
    use crate::domain::shared::{Quantity, Symbol, WorkerId};
    use std::sync::Mutex;

    struct FakeOrders {
        orders: Vec<Order>,
    }

    #[async_trait::async_trait]
    impl OrderRepository for FakeOrders {
        async fn save(&self, _order: &Order) -> Result<(), crate::domain::order::OrderError> {
            Ok(())
        }

        async fn find_by_id(
            &self,
            _id: &crate::domain::shared::OrderId,
        ) -> Result<Option<Order>, crate::domain::order::OrderError> {
            Ok(None)
        }

        async fn find_by_user(
            &self,
            _user_id: &str,
        ) -> Result<Vec<Order>, crate::domain::order::OrderError> {
            Ok(Vec::new())
        }

        async fn find_by_user_and_status(
            &self,
            _user_id: &str,
            _status: OrderStatus,
        ) -> Result<Vec<Order>, crate::domain::order::OrderError> {
            Ok(Vec::new())
        }

        async fn find_by_status(
            &self,
            status: OrderStatus,
        ) -> Result<Vec<Order>, crate::domain::order::OrderError> {
            Ok(self
                .orders
                .iter()
                .filter(|o| o.status() == status)
                .cloned()
                .collect())
        }

        async fn update_status(
            &self,
            _id: &crate::domain::shared::OrderId,
            _status: OrderStatus,
            _failure_reason: Option<String>,
        ) -> Result<(), crate::domain::order::OrderError> {
            Ok(())
        }

        async fn update_execution(
            &self,
            _id: &crate::domain::shared::OrderId,
            _execution_price: crate::domain::shared::Money,
            _executed_at: chrono::DateTime<chrono::Utc>,
        ) -> Result<(), crate::domain::order::OrderError> {
            Ok(())
        }

        async fn find_history(
            &self,
            _user_id: &str,
            _limit: u32,
            _offset: u32,
        ) -> Result<Vec<Order>, crate::domain::order::OrderError> {
            Ok(Vec::new())
        }

        async fn find_by_symbol(
            &self,
            _symbol: &Symbol,
        ) -> Result<Vec<Order>, crate::domain::order::OrderError> {
            Ok(Vec::new())
        }

        async fn find_by_date_range(
            &self,
            _from: chrono::DateTime<chrono::Utc>,
            _to: chrono::DateTime<chrono::Utc>,
        ) -> Result<Vec<Order>, crate::domain::order::OrderError> {
            Ok(Vec::new())
        }

        async fn count_by_user(&self, _user_id: &str) -> Result<u64, crate::domain::order::OrderError> {
            Ok(0)
        }

        async fn delete(
            &self,
            _id: &crate::domain::shared::OrderId,
        ) -> Result<(), crate::domain::order::OrderError> {
            Ok(())
        }
    }

    struct RecordingBus {
        published: Mutex<Vec<String>>,
    }

    impl RecordingBus {
        fn new() -> Self {
            Self {
                published: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl MessageBusPort for RecordingBus {
        async fn publish(&self, _queue: &str, _payload: Vec<u8>) -> Result<(), BusError> {
            Ok(())
        }

        async fn publish_with_options(
            &self,
            queue: &str,
            _payload: Vec<u8>,
            _options: Opts,
        ) -> Result<(), BusError> {
            self.published.lock().unwrap().push(queue.to_string());
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
            quantity: Quantity::from_i64(10),
            price: None,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn republishes_stale_pending_orders() {
        let orders = Arc::new(FakeOrders {
            orders: vec![pending_order()],
        });
        let bus = Arc::new(RecordingBus::new());
        let sweeper = OutboxSweeperUseCase::new(orders, bus.clone(), Duration::from_secs(0));

        let count = sweeper.sweep().await.unwrap();
        assert_eq!(count, 1);
        assert_eq!(bus.published.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn leaves_fresh_pending_orders_alone() {
        let orders = Arc::new(FakeOrders {
            orders: vec![pending_order()],
        });
        let bus = Arc::new(RecordingBus::new());
        let sweeper = OutboxSweeperUseCase::new(orders, bus.clone(), Duration::from_secs(3600));

        let count = sweeper.sweep().await.unwrap();
        assert_eq!(count, 0);
        assert!(bus.published.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn ignores_orders_that_are_not_pending() {
        let mut order = pending_order();
        order.mark_processing(WorkerId::new("worker-1")).unwrap();
        let orders = Arc::new(FakeOrders {
            orders: vec![order],
        });
        let bus = Arc::new(RecordingBus::new());
        let sweeper = OutboxSweeperUseCase::new(orders, bus.clone(), Duration::from_secs(0));

        let count = sweeper.sweep().await.unwrap();
        assert_eq!(count, 0);
    }
}
