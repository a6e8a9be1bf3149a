//! External execution capability consumed by the worker pool.
//!
//! Represents the broker/simulator integration the worker pool hands a
//! validated order to. Out of scope for this crate to implement; callers
//! supply an adapter.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use thiserror::Error;

use crate::domain::order::Order;
use crate::domain::shared::Money;

/// Errors surfaced by an `IOrderExecutionClient` implementation.
#[derive(Debug, Error, Clone)]
pub enum ExecutionError {
    /// The broker rejected the order outright; not retryable.
    #[error("execution rejected: {0}")]
    Rejected(String),
    /// The broker/simulator timed out or returned a server error;
    /// retryable.
    #[error("execution provider unavailable: {0}")]
    Unavailable(String),
}

impl ExecutionError {
    /// Whether this failure should route the order to a retry queue
    /// rather than straight to the dead-letter queue.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Execution capability consumed by the worker pool.
#[async_trait]
#[cfg_attr(test, automock)]
pub trait IOrderExecutionClient: Send + Sync {
    /// Executes `order` at (or near) `market_price`, returning the
    /// achieved execution price.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::Rejected`] or
    /// [`ExecutionError::Unavailable`].
    async fn execute(&self, order: &Order, market_price: Money) -> Result<Money, ExecutionError>;
}
