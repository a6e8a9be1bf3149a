//! In-memory repository adapters.
//!
//! Backs local development and integration tests. State does not survive
//! process restart; production deployments use the Turso-backed adapters
//! in [`super::turso`].

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::idempotency::{IdempotencyCheck, IdempotencyError, IdempotencyKey, IdempotencyRecord, IdempotencyRepository};
use crate::domain::order::{Order, OrderError, OrderRepository, OrderStatus};
use crate::domain::shared::{Money, OrderId, Symbol, Timestamp};

/// `OrderRepository` backed by an in-process `HashMap`.
#[derive(Debug, Default)]
pub struct InMemoryOrderRepository {
    orders: RwLock<HashMap<String, Order>>,
}

impl InMemoryOrderRepository {
    /// Builds an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn save(&self, order: &Order) -> Result<(), OrderError> {
        self.orders
            .write()
            .expect("order repository lock poisoned")
            .insert(order.id().as_str().to_string(), order.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, OrderError> {
        Ok(self
            .orders
            .read()
            .expect("order repository lock poisoned")
            .get(id.as_str())
            .cloned())
    }

    async fn find_by_user(&self, user_id: &str) -> Result<Vec<Order>, OrderError> {
        Ok(self
            .orders
            .read()
            .expect("order repository lock poisoned")
            .values()
            .filter(|o| o.user_id() == user_id)
            .cloned()
            .collect())
    }

    async fn find_by_user_and_status(
        &self,
        user_id: &str,
        status: OrderStatus,
    ) -> Result<Vec<Order>, OrderError> {
        Ok(self
            .orders
            .read()
            .expect("order repository lock poisoned")
            .values()
            .filter(|o| o.user_id() == user_id && o.status() == status)
            .cloned()
            .collect())
    }

    async fn find_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, OrderError> {
        Ok(self
            .orders
            .read()
            .expect("order repository lock poisoned")
            .values()
            .filter(|o| o.status() == status)
            .cloned()
            .collect())
    }

    async fn update_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
        failure_reason: Option<String>,
    ) -> Result<(), OrderError> {
        let mut orders = self.orders.write().expect("order repository lock poisoned");
        let order = orders
            .get_mut(id.as_str())
            .ok_or_else(|| OrderError::NotFound {
                order_id: id.as_str().to_string(),
            })?;

        match status {
            OrderStatus::Failed => order.mark_failed(failure_reason.unwrap_or_default()),
            OrderStatus::Cancelled => order.mark_cancelled(failure_reason.unwrap_or_default()),
            _ => Ok(()),
        }
    }

    async fn update_execution(
        &self,
        id: &OrderId,
        execution_price: Money,
        executed_at: DateTime<Utc>,
    ) -> Result<(), OrderError> {
        let mut orders = self.orders.write().expect("order repository lock poisoned");
        let order = orders
            .get_mut(id.as_str())
            .ok_or_else(|| OrderError::NotFound {
                order_id: id.as_str().to_string(),
            })?;
        let _ = executed_at;
        order.mark_executed(execution_price)
    }

    async fn find_history(
        &self,
        user_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Order>, OrderError> {
        let mut matching: Vec<Order> = self
            .orders
            .read()
            .expect("order repository lock poisoned")
            .values()
            .filter(|o| o.user_id() == user_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at().as_datetime().cmp(&a.created_at().as_datetime()));

        Ok(matching
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn find_by_symbol(&self, symbol: &Symbol) -> Result<Vec<Order>, OrderError> {
        Ok(self
            .orders
            .read()
            .expect("order repository lock poisoned")
            .values()
            .filter(|o| o.symbol() == symbol)
            .cloned()
            .collect())
    }

    async fn find_by_date_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Order>, OrderError> {
        Ok(self
            .orders
            .read()
            .expect("order repository lock poisoned")
            .values()
            .filter(|o| {
                let created = o.created_at().as_datetime();
                created >= from && created <= to
            })
            .cloned()
            .collect())
    }

    async fn count_by_user(&self, user_id: &str) -> Result<u64, OrderError> {
        Ok(self
            .orders
            .read()
            .expect("order repository lock poisoned")
            .values()
            .filter(|o| o.user_id() == user_id)
            .count() as u64)
    }

    async fn delete(&self, id: &OrderId) -> Result<(), OrderError> {
        self.orders
            .write()
            .expect("order repository lock poisoned")
            .remove(id.as_str())
            .ok_or_else(|| OrderError::NotFound {
                order_id: id.as_str().to_string(),
            })?;
        Ok(())
    }
}

/// `IdempotencyRepository` backed by an in-process `HashMap`.
#[derive(Debug, Default)]
pub struct InMemoryIdempotencyRepository {
    records: RwLock<HashMap<String, IdempotencyRecord>>,
}

impl InMemoryIdempotencyRepository {
    /// Builds an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdempotencyRepository for InMemoryIdempotencyRepository {
    async fn check(&self, key: &IdempotencyKey) -> Result<IdempotencyCheck, IdempotencyError> {
        let records = self.records.read().expect("idempotency repository lock poisoned");
        let Some(record) = records.get(key.as_str()) else {
            return Ok(IdempotencyCheck::NotFound);
        };

        if record.is_expired_at(&Timestamp::now()) {
            return Ok(IdempotencyCheck::NotFound);
        }

        use crate::domain::idempotency::IdempotencyStatus;
        Ok(match record.status() {
            IdempotencyStatus::Completed => IdempotencyCheck::Completed {
                order_id: record.order_id().unwrap_or_default().to_string(),
            },
            IdempotencyStatus::Failed => IdempotencyCheck::Failed {
                result: record.result().unwrap_or_default().to_string(),
            },
            IdempotencyStatus::Pending => IdempotencyCheck::Pending,
            IdempotencyStatus::Expired => IdempotencyCheck::NotFound,
        })
    }

    async fn store(&self, record: IdempotencyRecord) -> Result<(), IdempotencyError> {
        let mut records = self.records.write().expect("idempotency repository lock poisoned");
        if let Some(existing) = records.get(record.key()) {
            if !existing.is_expired_at(&Timestamp::now()) && matches!(existing.status(), crate::domain::idempotency::IdempotencyStatus::Pending) {
                return Err(IdempotencyError::Conflict {
                    key: record.key().to_string(),
                });
            }
        }
        records.insert(record.key().to_string(), record);
        Ok(())
    }

    async fn complete(
        &self,
        key: &IdempotencyKey,
        order_id: &str,
        result: &str,
    ) -> Result<(), IdempotencyError> {
        let mut records = self.records.write().expect("idempotency repository lock poisoned");
        let record = records
            .get_mut(key.as_str())
            .ok_or_else(|| IdempotencyError::NotFound {
                key: key.as_str().to_string(),
            })?;
        record.complete(order_id.to_string(), result.to_string())
    }

    async fn fail(&self, key: &IdempotencyKey, result: &str) -> Result<(), IdempotencyError> {
        let mut records = self.records.write().expect("idempotency repository lock poisoned");
        let record = records
            .get_mut(key.as_str())
            .ok_or_else(|| IdempotencyError::NotFound {
                key: key.as_str().to_string(),
            })?;
        record.fail(result.to_string())
    }

    async fn cleanup_expired(&self) -> Result<u64, IdempotencyError> {
        let mut records = self.records.write().expect("idempotency repository lock poisoned");
        let now = Timestamp::now();
        let before = records.len();
        records.retain(|_, record| !record.is_expired_at(&now));
        Ok((before - records.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::CreateOrderCommand;
    use crate::domain::order::value_objects::{OrderSide, OrderType};
    use crate::domain::shared::Quantity;

    fn sample_order() -> Order {
        Order::new(CreateOrderCommand {
            user_id: "user-1".to_string(),
            symbol: Symbol::new("AAPL"),
            side: OrderSide::Buy,
            order_type: OrderType::Market,
            quantity: Quantity::from_i64(10),
            price: None,
        })
        .expect("valid command")
    }

    #[tokio::test]
    async fn save_and_find_roundtrip() {
        let repo = InMemoryOrderRepository::new();
        let order = sample_order();
        repo.save(&order).await.unwrap();

        let found = repo.find_by_id(order.id()).await.unwrap();
        assert_eq!(found.unwrap().id(), order.id());
    }

    #[tokio::test]
    async fn find_by_id_missing_returns_none() {
        let repo = InMemoryOrderRepository::new();
        assert!(repo.find_by_id(&OrderId::generate()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_missing_order_errors() {
        let repo = InMemoryOrderRepository::new();
        assert!(repo.delete(&OrderId::generate()).await.is_err());
    }

    #[tokio::test]
    async fn idempotency_store_then_complete() {
        let repo = InMemoryIdempotencyRepository::new();
        let key = IdempotencyKey::derive(
            "user-1",
            &Symbol::new("AAPL"),
            OrderType::Market,
            OrderSide::Buy,
            Quantity::from_i64(10),
            None,
        );

        repo.store(IdempotencyRecord::new_pending(&key, "user-1"))
            .await
            .unwrap();
        assert!(matches!(repo.check(&key).await.unwrap(), IdempotencyCheck::Pending));

        repo.complete(&key, "order-1", "ok").await.unwrap();
        match repo.check(&key).await.unwrap() {
            IdempotencyCheck::Completed { order_id } => assert_eq!(order_id, "order-1"),
            other => panic!("expected Completed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn idempotency_store_conflicts_while_pending() {
        let repo = InMemoryIdempotencyRepository::new();
        let key = IdempotencyKey::derive(
            "user-1",
            &Symbol::new("AAPL"),
            OrderType::Market,
            OrderSide::Buy,
            Quantity::from_i64(10),
            None,
        );

        repo.store(IdempotencyRecord::new_pending(&key, "user-1"))
            .await
            .unwrap();
        let err = repo
            .store(IdempotencyRecord::new_pending(&key, "user-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, IdempotencyError::Conflict { .. }));
    }
}
