//! Idempotency store port.

use async_trait::async_trait;

use super::errors::IdempotencyError;
use super::key::IdempotencyKey;
use super::record::IdempotencyRecord;

/// Outcome of a `check` call, distinguishing "no record" from each
/// terminal/non-terminal state the submit use case must branch on.
#[derive(Debug, Clone)]
pub enum IdempotencyCheck {
    /// No record exists for this key; the caller should proceed to create
    /// one and continue the submission.
    NotFound,
    /// A prior request already completed; carries the resulting order id.
    Completed {
        /// Order id produced by the prior completed submission.
        order_id: String,
    },
    /// A prior request failed and the record has not expired; carries the
    /// stored error result.
    Failed {
        /// Stored error result from the prior failed submission.
        result: String,
    },
    /// A request for this key is still in flight (PENDING, unexpired).
    /// Callers should reject the new submission as a conflict.
    Pending,
}

/// Port for idempotency key storage, backed by a Turso-resident table in
/// production and an in-memory map in tests.
#[async_trait]
pub trait IdempotencyRepository: Send + Sync {
    /// Checks the current state of a key, distinguishing not-found from
    /// each terminal/non-terminal status.
    ///
    /// # Errors
    ///
    /// Returns error if the underlying store is unreachable.
    async fn check(&self, key: &IdempotencyKey) -> Result<IdempotencyCheck, IdempotencyError>;

    /// Stores a new PENDING record for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`IdempotencyError::Conflict`] if a PENDING record for this
    /// key already exists.
    async fn store(&self, record: IdempotencyRecord) -> Result<(), IdempotencyError>;

    /// Marks the record COMPLETED with the produced order id.
    ///
    /// # Errors
    ///
    /// Returns [`IdempotencyError::NotFound`] or
    /// [`IdempotencyError::AlreadyTerminal`].
    async fn complete(
        &self,
        key: &IdempotencyKey,
        order_id: &str,
        result: &str,
    ) -> Result<(), IdempotencyError>;

    /// Marks the record FAILED with the given error result.
    ///
    /// # Errors
    ///
    /// Returns [`IdempotencyError::NotFound`] or
    /// [`IdempotencyError::AlreadyTerminal`].
    async fn fail(&self, key: &IdempotencyKey, result: &str) -> Result<(), IdempotencyError>;

    /// Sweeps and removes (or marks EXPIRED) all records whose TTL has
    /// elapsed. Returns the number of records reaped.
    ///
    /// # Errors
    ///
    /// Returns error if the underlying store is unreachable.
    async fn cleanup_expired(&self) -> Result<u64, IdempotencyError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{OrderSide, OrderType};
    use crate::domain::shared::{Quantity, Symbol, Timestamp};
    use std::collections::HashMap;
    use std::sync::RwLock;

    struct InMemoryIdempotencyRepository {
        records: RwLock<HashMap<String, IdempotencyRecord>>,
    }

    impl InMemoryIdempotencyRepository {
        fn new() -> Self {
            Self {
                records: RwLock::new(HashMap::new()),
            }
        }
    }

    #[async_trait]
    impl IdempotencyRepository for InMemoryIdempotencyRepository {
        async fn check(&self, key: &IdempotencyKey) -> Result<IdempotencyCheck, IdempotencyError> {
            let records = self.records.read().unwrap();
            let Some(record) = records.get(key.as_str()) else {
                return Ok(IdempotencyCheck::NotFound);
            };

            if record.is_expired_at(&Timestamp::now()) {
                return Ok(IdempotencyCheck::NotFound);
            }

            use crate::domain::idempotency::status::IdempotencyStatus;
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
            let mut records = self.records.write().unwrap();
            if let Some(existing) = records.get(record.key()) {
                if !existing.is_expired_at(&Timestamp::now())
                    && existing.status() == crate::domain::idempotency::status::IdempotencyStatus::Pending
                {
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
            let mut records = self.records.write().unwrap();
            let record = records
                .get_mut(key.as_str())
                .ok_or_else(|| IdempotencyError::NotFound {
                    key: key.as_str().to_string(),
                })?;
            record.complete(order_id.to_string(), result.to_string())
        }

        async fn fail(&self, key: &IdempotencyKey, result: &str) -> Result<(), IdempotencyError> {
            let mut records = self.records.write().unwrap();
            let record = records
                .get_mut(key.as_str())
                .ok_or_else(|| IdempotencyError::NotFound {
                    key: key.as_str().to_string(),
                })?;
            record.fail(result.to_string())
        }

        async fn cleanup_expired(&self) -> Result<u64, IdempotencyError> {
            let mut records = self.records.write().unwrap();
            let now = Timestamp::now();
            let before = records.len();
            records.retain(|_, record| !record.is_expired_at(&now));
            Ok((before - records.len()) as u64)
        }
    }

    fn key() -> IdempotencyKey {
        IdempotencyKey::derive(
            "user-1",
            &Symbol::new("AAPL"),
            OrderType::Market,
            OrderSide::Buy,
            Quantity::from_i64(10),
            None,
        )
    }

    #[tokio::test]
    async fn check_returns_not_found_for_unknown_key() {
        let repo = InMemoryIdempotencyRepository::new();
        let result = repo.check(&key()).await.unwrap();
        assert!(matches!(result, IdempotencyCheck::NotFound));
    }

    #[tokio::test]
    async fn store_then_check_returns_pending() {
        let repo = InMemoryIdempotencyRepository::new();
        let k = key();
        repo.store(IdempotencyRecord::new_pending(&k, "user-1"))
            .await
            .unwrap();

        let result = repo.check(&k).await.unwrap();
        assert!(matches!(result, IdempotencyCheck::Pending));
    }

    #[tokio::test]
    async fn store_pending_twice_conflicts() {
        let repo = InMemoryIdempotencyRepository::new();
        let k = key();
        repo.store(IdempotencyRecord::new_pending(&k, "user-1"))
            .await
            .unwrap();

        let result = repo.store(IdempotencyRecord::new_pending(&k, "user-1")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn complete_then_check_returns_completed() {
        let repo = InMemoryIdempotencyRepository::new();
        let k = key();
        repo.store(IdempotencyRecord::new_pending(&k, "user-1"))
            .await
            .unwrap();
        repo.complete(&k, "order-123", "ok").await.unwrap();

        let result = repo.check(&k).await.unwrap();
        match result {
            IdempotencyCheck::Completed { order_id } => assert_eq!(order_id, "order-123"),
            other => panic!("expected Completed, got {other:?}"),
        }
    }
}
