//! Turso-backed repository adapters.
//!
//! Turso (a Rust rewrite of `SQLite`) provides durable order and
//! idempotency-key storage. Decimal and timestamp fields are stored as
//! canonical text so they survive round-trips without precision loss.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;
use turso::{Builder, Database, Row, Value};

use crate::domain::idempotency::{
    IdempotencyCheck, IdempotencyError, IdempotencyKey, IdempotencyRecord, IdempotencyRepository,
    IdempotencyStatus,
};
use crate::domain::order::value_objects::{OrderSide, OrderStatus, OrderType};
use crate::domain::order::{CreateOrderCommand, Order, OrderError, OrderRepository};
use crate::domain::shared::{BrokerId, Money, OrderId, Quantity, Symbol, Timestamp, WorkerId};

fn turso_err(e: turso::Error) -> OrderError {
    OrderError::InvalidParameters {
        field: "database".to_string(),
        message: e.to_string(),
    }
}

fn turso_idem_err(e: turso::Error) -> IdempotencyError {
    IdempotencyError::InvalidTtl {
        message: e.to_string(),
    }
}

/// `OrderRepository` implementation backed by a Turso database.
pub struct TursoOrderRepository {
    db: Database,
}

impl TursoOrderRepository {
    /// Opens (or creates) a local Turso database file and runs migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub async fn new_local(db_path: &str) -> Result<Self, OrderError> {
        let db = Builder::new_local(db_path).build().await.map_err(turso_err)?;
        Self::run_migrations(&db).await?;
        Ok(Self { db })
    }

    /// Opens an in-memory Turso database. Intended for integration tests.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be migrated.
    pub async fn new_in_memory() -> Result<Self, OrderError> {
        let db = Builder::new_local(":memory:").build().await.map_err(turso_err)?;
        Self::run_migrations(&db).await?;
        Ok(Self { db })
    }

    async fn run_migrations(db: &Database) -> Result<(), OrderError> {
        let conn = db.connect().map_err(turso_err)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS orders (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                symbol TEXT NOT NULL,
                side TEXT NOT NULL,
                order_type TEXT NOT NULL,
                quantity TEXT NOT NULL,
                price TEXT,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                executed_at TEXT,
                execution_price TEXT,
                market_price_at_submission TEXT,
                market_data_timestamp TEXT,
                failure_reason TEXT,
                retry_count INTEGER NOT NULL DEFAULT 0,
                processing_worker_id TEXT,
                external_order_id TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_orders_user ON orders(user_id);
            CREATE INDEX IF NOT EXISTS idx_orders_status ON orders(status);
            CREATE INDEX IF NOT EXISTS idx_orders_symbol ON orders(symbol);
            CREATE INDEX IF NOT EXISTS idx_orders_created_at ON orders(created_at);",
        )
        .await
        .map_err(turso_err)?;
        Ok(())
    }

    fn params_for(order: &Order) -> Vec<Value> {
        vec![
            Value::Text(order.id().as_str().to_string()),
            Value::Text(order.user_id().to_string()),
            Value::Text(order.symbol().as_str().to_string()),
            Value::Text(order.side().to_string()),
            Value::Text(order.order_type().to_string()),
            Value::Text(format!("{:.8}", order.quantity().amount())),
            order
                .price()
                .map_or(Value::Null, |p| Value::Text(format!("{:.8}", p.amount()))),
            Value::Text(order.status().to_string()),
            Value::Text(order.created_at().to_rfc3339()),
            Value::Text(order.updated_at().to_rfc3339()),
            order.executed_at().map_or(Value::Null, |t| Value::Text(t.to_rfc3339())),
            order
                .execution_price()
                .map_or(Value::Null, |p| Value::Text(format!("{:.8}", p.amount()))),
            order
                .market_price_at_submission()
                .map_or(Value::Null, |p| Value::Text(format!("{:.8}", p.amount()))),
            order
                .market_data_timestamp()
                .map_or(Value::Null, |t| Value::Text(t.to_rfc3339())),
            order
                .failure_reason()
                .map_or(Value::Null, |r| Value::Text(r.to_string())),
            Value::Integer(i64::from(order.retry_count())),
            order
                .processing_worker_id()
                .map_or(Value::Null, |w| Value::Text(w.as_str().to_string())),
            order
                .external_order_id()
                .map_or(Value::Null, |b| Value::Text(b.as_str().to_string())),
        ]
    }

    fn row_to_order(row: &Row) -> Result<Order, OrderError> {
        let get_string = |idx: usize, field: &str| -> Result<String, OrderError> {
            row.get::<String>(idx).map_err(|e| OrderError::InvalidParameters {
                field: field.to_string(),
                message: e.to_string(),
            })
        };
        let parse_decimal = |s: &str, field: &str| -> Result<Decimal, OrderError> {
            Decimal::from_str(s).map_err(|_| OrderError::InvalidParameters {
                field: field.to_string(),
                message: format!("invalid decimal: {s}"),
            })
        };
        let parse_ts = |s: &str, field: &str| -> Result<Timestamp, OrderError> {
            Timestamp::parse(s).map_err(|_| OrderError::InvalidParameters {
                field: field.to_string(),
                message: format!("invalid timestamp: {s}"),
            })
        };

        let id = OrderId::new(get_string(0, "id")?);
        let user_id = get_string(1, "user_id")?;
        let symbol = Symbol::new(get_string(2, "symbol")?);
        let side: OrderSide = get_string(3, "side")?.parse()?;
        let order_type: OrderType = get_string(4, "order_type")?.parse()?;
        let quantity = Quantity::new(parse_decimal(&get_string(5, "quantity")?, "quantity")?);
        let price = row
            .get::<String>(6)
            .ok()
            .map(|s| parse_decimal(&s, "price"))
            .transpose()?
            .map(Money::new);
        let status: OrderStatus = get_string(7, "status")?.parse()?;
        let created_at = parse_ts(&get_string(8, "created_at")?, "created_at")?;
        let updated_at = parse_ts(&get_string(9, "updated_at")?, "updated_at")?;
        let executed_at = row
            .get::<String>(10)
            .ok()
            .map(|s| parse_ts(&s, "executed_at"))
            .transpose()?;
        let execution_price = row
            .get::<String>(11)
            .ok()
            .map(|s| parse_decimal(&s, "execution_price"))
            .transpose()?
            .map(Money::new);
        let market_price_at_submission = row
            .get::<String>(12)
            .ok()
            .map(|s| parse_decimal(&s, "market_price_at_submission"))
            .transpose()?
            .map(Money::new);
        let market_data_timestamp = row
            .get::<String>(13)
            .ok()
            .map(|s| parse_ts(&s, "market_data_timestamp"))
            .transpose()?;
        let failure_reason = row.get::<String>(14).ok();
        let retry_count = row.get::<i64>(15).unwrap_or(0) as u32;
        let processing_worker_id = row.get::<String>(16).ok().map(WorkerId::new);
        let external_order_id = row.get::<String>(17).ok().map(BrokerId::new);

        Ok(Order::reconstitute(
            id,
            user_id,
            symbol,
            side,
            order_type,
            quantity,
            price,
            status,
            created_at,
            updated_at,
            executed_at,
            execution_price,
            market_price_at_submission,
            market_data_timestamp,
            failure_reason,
            retry_count,
            processing_worker_id,
            external_order_id,
        ))
    }
}

#[async_trait]
impl OrderRepository for TursoOrderRepository {
    async fn save(&self, order: &Order) -> Result<(), OrderError> {
        let conn = self.db.connect().map_err(turso_err)?;
        conn.execute(
            "INSERT OR REPLACE INTO orders (
                id, user_id, symbol, side, order_type, quantity, price, status,
                created_at, updated_at, executed_at, execution_price,
                market_price_at_submission, market_data_timestamp,
                failure_reason, retry_count, processing_worker_id, external_order_id
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            Self::params_for(order),
        )
        .await
        .map_err(turso_err)?;
        Ok(())
    }

    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, OrderError> {
        let conn = self.db.connect().map_err(turso_err)?;
        let mut rows = conn
            .query(
                "SELECT id, user_id, symbol, side, order_type, quantity, price, status,
                    created_at, updated_at, executed_at, execution_price,
                    market_price_at_submission, market_data_timestamp,
                    failure_reason, retry_count, processing_worker_id, external_order_id
                 FROM orders WHERE id = ?",
                vec![Value::Text(id.as_str().to_string())],
            )
            .await
            .map_err(turso_err)?;

        match rows.next().await.map_err(turso_err)? {
            Some(row) => Ok(Some(Self::row_to_order(&row)?)),
            None => Ok(None),
        }
    }

    async fn find_by_user(&self, user_id: &str) -> Result<Vec<Order>, OrderError> {
        let conn = self.db.connect().map_err(turso_err)?;
        let mut rows = conn
            .query(
                "SELECT id, user_id, symbol, side, order_type, quantity, price, status,
                    created_at, updated_at, executed_at, execution_price,
                    market_price_at_submission, market_data_timestamp,
                    failure_reason, retry_count, processing_worker_id, external_order_id
                 FROM orders WHERE user_id = ? ORDER BY created_at DESC",
                vec![Value::Text(user_id.to_string())],
            )
            .await
            .map_err(turso_err)?;

        let mut orders = Vec::new();
        while let Some(row) = rows.next().await.map_err(turso_err)? {
            orders.push(Self::row_to_order(&row)?);
        }
        Ok(orders)
    }

    async fn find_by_user_and_status(
        &self,
        user_id: &str,
        status: OrderStatus,
    ) -> Result<Vec<Order>, OrderError> {
        let conn = self.db.connect().map_err(turso_err)?;
        let mut rows = conn
            .query(
                "SELECT id, user_id, symbol, side, order_type, quantity, price, status,
                    created_at, updated_at, executed_at, execution_price,
                    market_price_at_submission, market_data_timestamp,
                    failure_reason, retry_count, processing_worker_id, external_order_id
                 FROM orders WHERE user_id = ? AND status = ? ORDER BY created_at DESC",
                vec![
                    Value::Text(user_id.to_string()),
                    Value::Text(status.to_string()),
                ],
            )
            .await
            .map_err(turso_err)?;

        let mut orders = Vec::new();
        while let Some(row) = rows.next().await.map_err(turso_err)? {
            orders.push(Self::row_to_order(&row)?);
        }
        Ok(orders)
    }

    async fn find_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, OrderError> {
        let conn = self.db.connect().map_err(turso_err)?;
        let mut rows = conn
            .query(
                "SELECT id, user_id, symbol, side, order_type, quantity, price, status,
                    created_at, updated_at, executed_at, execution_price,
                    market_price_at_submission, market_data_timestamp,
                    failure_reason, retry_count, processing_worker_id, external_order_id
                 FROM orders WHERE status = ? ORDER BY created_at ASC",
                vec![Value::Text(status.to_string())],
            )
            .await
            .map_err(turso_err)?;

        let mut orders = Vec::new();
        while let Some(row) = rows.next().await.map_err(turso_err)? {
            orders.push(Self::row_to_order(&row)?);
        }
        Ok(orders)
    }

    async fn update_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
        failure_reason: Option<String>,
    ) -> Result<(), OrderError> {
        let existing = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| OrderError::NotFound {
                order_id: id.as_str().to_string(),
            })?;
        let _ = existing;

        let conn = self.db.connect().map_err(turso_err)?;
        let updated = Timestamp::now();
        let rows_affected = conn
            .execute(
                "UPDATE orders SET status = ?, failure_reason = ?, updated_at = ? WHERE id = ?",
                vec![
                    Value::Text(status.to_string()),
                    failure_reason.map_or(Value::Null, Value::Text),
                    Value::Text(updated.to_rfc3339()),
                    Value::Text(id.as_str().to_string()),
                ],
            )
            .await
            .map_err(turso_err)?;

        if rows_affected == 0 {
            return Err(OrderError::NotFound {
                order_id: id.as_str().to_string(),
            });
        }
        Ok(())
    }

    async fn update_execution(
        &self,
        id: &OrderId,
        execution_price: Money,
        executed_at: DateTime<Utc>,
    ) -> Result<(), OrderError> {
        let conn = self.db.connect().map_err(turso_err)?;
        let rows_affected = conn
            .execute(
                "UPDATE orders SET status = ?, execution_price = ?, executed_at = ?, updated_at = ?
                 WHERE id = ?",
                vec![
                    Value::Text(OrderStatus::Executed.to_string()),
                    Value::Text(format!("{:.8}", execution_price.amount())),
                    Value::Text(executed_at.to_rfc3339()),
                    Value::Text(Timestamp::now().to_rfc3339()),
                    Value::Text(id.as_str().to_string()),
                ],
            )
            .await
            .map_err(turso_err)?;

        if rows_affected == 0 {
            return Err(OrderError::NotFound {
                order_id: id.as_str().to_string(),
            });
        }
        Ok(())
    }

    async fn find_history(
        &self,
        user_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Order>, OrderError> {
        let conn = self.db.connect().map_err(turso_err)?;
        let mut rows = conn
            .query(
                "SELECT id, user_id, symbol, side, order_type, quantity, price, status,
                    created_at, updated_at, executed_at, execution_price,
                    market_price_at_submission, market_data_timestamp,
                    failure_reason, retry_count, processing_worker_id, external_order_id
                 FROM orders WHERE user_id = ? ORDER BY created_at DESC LIMIT ? OFFSET ?",
                vec![
                    Value::Text(user_id.to_string()),
                    Value::Integer(i64::from(limit)),
                    Value::Integer(i64::from(offset)),
                ],
            )
            .await
            .map_err(turso_err)?;

        let mut orders = Vec::new();
        while let Some(row) = rows.next().await.map_err(turso_err)? {
            orders.push(Self::row_to_order(&row)?);
        }
        Ok(orders)
    }

    async fn find_by_symbol(&self, symbol: &Symbol) -> Result<Vec<Order>, OrderError> {
        let conn = self.db.connect().map_err(turso_err)?;
        let mut rows = conn
            .query(
                "SELECT id, user_id, symbol, side, order_type, quantity, price, status,
                    created_at, updated_at, executed_at, execution_price,
                    market_price_at_submission, market_data_timestamp,
                    failure_reason, retry_count, processing_worker_id, external_order_id
                 FROM orders WHERE symbol = ? ORDER BY created_at DESC",
                vec![Value::Text(symbol.as_str().to_string())],
            )
            .await
            .map_err(turso_err)?;

        let mut orders = Vec::new();
        while let Some(row) = rows.next().await.map_err(turso_err)? {
            orders.push(Self::row_to_order(&row)?);
        }
        Ok(orders)
    }

    async fn find_by_date_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Order>, OrderError> {
        let conn = self.db.connect().map_err(turso_err)?;
        let mut rows = conn
            .query(
                "SELECT id, user_id, symbol, side, order_type, quantity, price, status,
                    created_at, updated_at, executed_at, execution_price,
                    market_price_at_submission, market_data_timestamp,
                    failure_reason, retry_count, processing_worker_id, external_order_id
                 FROM orders WHERE created_at >= ? AND created_at <= ? ORDER BY created_at ASC",
                vec![
                    Value::Text(from.to_rfc3339()),
                    Value::Text(to.to_rfc3339()),
                ],
            )
            .await
            .map_err(turso_err)?;

        let mut orders = Vec::new();
        while let Some(row) = rows.next().await.map_err(turso_err)? {
            orders.push(Self::row_to_order(&row)?);
        }
        Ok(orders)
    }

    async fn count_by_user(&self, user_id: &str) -> Result<u64, OrderError> {
        let conn = self.db.connect().map_err(turso_err)?;
        let mut rows = conn
            .query(
                "SELECT COUNT(*) FROM orders WHERE user_id = ?",
                vec![Value::Text(user_id.to_string())],
            )
            .await
            .map_err(turso_err)?;

        let count = match rows.next().await.map_err(turso_err)? {
            Some(row) => row.get::<i64>(0).unwrap_or(0),
            None => 0,
        };
        Ok(count as u64)
    }

    async fn delete(&self, id: &OrderId) -> Result<(), OrderError> {
        let conn = self.db.connect().map_err(turso_err)?;
        let rows_affected = conn
            .execute(
                "DELETE FROM orders WHERE id = ?",
                vec![Value::Text(id.as_str().to_string())],
            )
            .await
            .map_err(turso_err)?;

        if rows_affected == 0 {
            return Err(OrderError::NotFound {
                order_id: id.as_str().to_string(),
            });
        }
        Ok(())
    }
}

/// `IdempotencyRepository` implementation backed by a Turso database.
pub struct TursoIdempotencyRepository {
    db: Database,
}

impl TursoIdempotencyRepository {
    /// Opens (or creates) a local Turso database file and runs migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub async fn new_local(db_path: &str) -> Result<Self, IdempotencyError> {
        let db = Builder::new_local(db_path)
            .build()
            .await
            .map_err(turso_idem_err)?;
        Self::run_migrations(&db).await?;
        Ok(Self { db })
    }

    /// Opens an in-memory Turso database. Intended for integration tests.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be migrated.
    pub async fn new_in_memory() -> Result<Self, IdempotencyError> {
        let db = Builder::new_local(":memory:")
            .build()
            .await
            .map_err(turso_idem_err)?;
        Self::run_migrations(&db).await?;
        Ok(Self { db })
    }

    async fn run_migrations(db: &Database) -> Result<(), IdempotencyError> {
        let conn = db.connect().map_err(turso_idem_err)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS idempotency_keys (
                key TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL,
                expires_at TEXT NOT NULL,
                order_id TEXT,
                result TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_idempotency_expires_at
             ON idempotency_keys(expires_at);",
        )
        .await
        .map_err(turso_idem_err)?;
        Ok(())
    }

    fn row_to_record(row: &Row) -> Result<IdempotencyRecord, IdempotencyError> {
        let key = row.get::<String>(0).map_err(turso_idem_err)?;
        let user_id = row.get::<String>(1).map_err(turso_idem_err)?;
        let status_str = row.get::<String>(2).map_err(turso_idem_err)?;
        let status = match status_str.as_str() {
            "PENDING" => IdempotencyStatus::Pending,
            "COMPLETED" => IdempotencyStatus::Completed,
            "FAILED" => IdempotencyStatus::Failed,
            _ => IdempotencyStatus::Expired,
        };
        let created_at = Timestamp::parse(&row.get::<String>(3).map_err(turso_idem_err)?)
            .map_err(|e| IdempotencyError::InvalidTtl {
                message: e.to_string(),
            })?;
        let expires_at = Timestamp::parse(&row.get::<String>(4).map_err(turso_idem_err)?)
            .map_err(|e| IdempotencyError::InvalidTtl {
                message: e.to_string(),
            })?;
        let order_id = row.get::<String>(5).ok();
        let result = row.get::<String>(6).ok();

        Ok(IdempotencyRecord::reconstitute(
            key, user_id, status, created_at, expires_at, order_id, result,
        ))
    }
}

#[async_trait]
impl IdempotencyRepository for TursoIdempotencyRepository {
    async fn check(&self, key: &IdempotencyKey) -> Result<IdempotencyCheck, IdempotencyError> {
        let conn = self.db.connect().map_err(turso_idem_err)?;
        let mut rows = conn
            .query(
                "SELECT key, user_id, status, created_at, expires_at, order_id, result
                 FROM idempotency_keys WHERE key = ?",
                vec![Value::Text(key.as_str().to_string())],
            )
            .await
            .map_err(turso_idem_err)?;

        let Some(row) = rows.next().await.map_err(turso_idem_err)? else {
            return Ok(IdempotencyCheck::NotFound);
        };

        let record = Self::row_to_record(&row)?;
        if record.is_expired_at(&Timestamp::now()) {
            return Ok(IdempotencyCheck::NotFound);
        }

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
        if let IdempotencyCheck::Pending = self
            .check(&IdempotencyKey::from_raw(record.key().to_string()))
            .await?
        {
            return Err(IdempotencyError::Conflict {
                key: record.key().to_string(),
            });
        }

        let conn = self.db.connect().map_err(turso_idem_err)?;
        conn.execute(
            "INSERT OR REPLACE INTO idempotency_keys (
                key, user_id, status, created_at, expires_at, order_id, result
            ) VALUES (?, ?, ?, ?, ?, ?, ?)",
            vec![
                Value::Text(record.key().to_string()),
                Value::Text(record.user_id().to_string()),
                Value::Text(record.status().to_string()),
                Value::Text(record.created_at().to_rfc3339()),
                Value::Text(record.expires_at().to_rfc3339()),
                record.order_id().map_or(Value::Null, |s| Value::Text(s.to_string())),
                record.result().map_or(Value::Null, |s| Value::Text(s.to_string())),
            ],
        )
        .await
        .map_err(turso_idem_err)?;
        Ok(())
    }

    async fn complete(
        &self,
        key: &IdempotencyKey,
        order_id: &str,
        result: &str,
    ) -> Result<(), IdempotencyError> {
        let conn = self.db.connect().map_err(turso_idem_err)?;
        let current = self.check(key).await?;
        if matches!(current, IdempotencyCheck::NotFound) {
            return Err(IdempotencyError::NotFound {
                key: key.as_str().to_string(),
            });
        }
        if matches!(current, IdempotencyCheck::Completed { .. } | IdempotencyCheck::Failed { .. }) {
            return Err(IdempotencyError::AlreadyTerminal {
                key: key.as_str().to_string(),
            });
        }

        let rows_affected = conn
            .execute(
                "UPDATE idempotency_keys SET status = ?, order_id = ?, result = ? WHERE key = ?",
                vec![
                    Value::Text(IdempotencyStatus::Completed.to_string()),
                    Value::Text(order_id.to_string()),
                    Value::Text(result.to_string()),
                    Value::Text(key.as_str().to_string()),
                ],
            )
            .await
            .map_err(turso_idem_err)?;

        if rows_affected == 0 {
            return Err(IdempotencyError::NotFound {
                key: key.as_str().to_string(),
            });
        }
        Ok(())
    }

    async fn fail(&self, key: &IdempotencyKey, result: &str) -> Result<(), IdempotencyError> {
        let conn = self.db.connect().map_err(turso_idem_err)?;
        let current = self.check(key).await?;
        if matches!(current, IdempotencyCheck::NotFound) {
            return Err(IdempotencyError::NotFound {
                key: key.as_str().to_string(),
            });
        }
        if matches!(current, IdempotencyCheck::Completed { .. } | IdempotencyCheck::Failed { .. }) {
            return Err(IdempotencyError::AlreadyTerminal {
                key: key.as_str().to_string(),
            });
        }

        let rows_affected = conn
            .execute(
                "UPDATE idempotency_keys SET status = ?, result = ? WHERE key = ?",
                vec![
                    Value::Text(IdempotencyStatus::Failed.to_string()),
                    Value::Text(result.to_string()),
                    Value::Text(key.as_str().to_string()),
                ],
            )
            .await
            .map_err(turso_idem_err)?;

        if rows_affected == 0 {
            return Err(IdempotencyError::NotFound {
                key: key.as_str().to_string(),
            });
        }
        Ok(())
    }

    async fn cleanup_expired(&self) -> Result<u64, IdempotencyError> {
        let conn = self.db.connect().map_err(turso_idem_err)?;
        let now = Timestamp::now().to_rfc3339();
        let rows_affected = conn
            .execute(
                "DELETE FROM idempotency_keys WHERE expires_at < ?",
                vec![Value::Text(now)],
            )
            .await
            .map_err(turso_idem_err)?;
        Ok(rows_affected)
    }
}
