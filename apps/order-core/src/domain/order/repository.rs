//! Order Repository Trait
//!
//! Defines the persistence abstraction for orders. Implemented by adapters
//! in the infrastructure layer (a Turso-backed store in production, an
//! in-memory store for tests).

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::shared::{Money, OrderId, Symbol};

use super::aggregate::Order;
use super::errors::OrderError;
use super::value_objects::OrderStatus;

/// Repository trait for Order persistence.
///
/// This is a domain interface (port) implemented by infrastructure adapters.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Save an order (insert or update).
    ///
    /// # Errors
    ///
    /// Returns error if persistence fails.
    async fn save(&self, order: &Order) -> Result<(), OrderError>;

    /// Find an order by its internal ID.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, OrderError>;

    /// Find all orders owned by a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn find_by_user(&self, user_id: &str) -> Result<Vec<Order>, OrderError>;

    /// Find a user's orders with a given status.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn find_by_user_and_status(
        &self,
        user_id: &str,
        status: OrderStatus,
    ) -> Result<Vec<Order>, OrderError>;

    /// Find all orders with a given status, across users.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn find_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, OrderError>;

    /// Atomically update an order's status and `updated_at`, without
    /// touching other fields. Used by the worker pool for lightweight
    /// transitions that don't carry an execution price.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::NotFound`] if the order does not exist.
    async fn update_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
        failure_reason: Option<String>,
    ) -> Result<(), OrderError>;

    /// Atomically update an order's execution fields alongside its status.
    /// Used on transition to EXECUTED.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::NotFound`] if the order does not exist.
    async fn update_execution(
        &self,
        id: &OrderId,
        execution_price: Money,
        executed_at: DateTime<Utc>,
    ) -> Result<(), OrderError>;

    /// Returns a page of a user's order history, newest first.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn find_history(
        &self,
        user_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Order>, OrderError>;

    /// Find all orders for a given symbol.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn find_by_symbol(&self, symbol: &Symbol) -> Result<Vec<Order>, OrderError>;

    /// Find all orders created within `[from, to]`.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn find_by_date_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Order>, OrderError>;

    /// Count the total number of orders owned by a user.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn count_by_user(&self, user_id: &str) -> Result<u64, OrderError>;

    /// Delete an order by ID.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::NotFound`] if the order does not exist.
    async fn delete(&self, id: &OrderId) -> Result<(), OrderError>;
}
