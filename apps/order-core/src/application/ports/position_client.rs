//! External position/balance capability consumed by the validation
//! service.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use thiserror::Error;

use crate::domain::shared::{Money, Quantity, Symbol};

/// Errors surfaced by an `IPositionClient` implementation.
#[derive(Debug, Error)]
pub enum PositionError {
    /// The user has no account or position record.
    #[error("unknown account: {0}")]
    UnknownAccount(String),
    /// The provider timed out or returned a server error.
    #[error("position service unavailable: {0}")]
    Unavailable(String),
}

/// Position and balance capability consumed by the validation service.
#[async_trait]
#[cfg_attr(test, automock)]
pub trait IPositionClient: Send + Sync {
    /// Returns the quantity of `symbol` the user currently holds and may
    /// sell.
    ///
    /// # Errors
    ///
    /// Returns error if the provider is unreachable.
    async fn available_quantity(
        &self,
        user_id: &str,
        symbol: &Symbol,
    ) -> Result<Quantity, PositionError>;

    /// Returns whether the user has at least `amount` in buying power.
    ///
    /// # Errors
    ///
    /// Returns error if the provider is unreachable.
    async fn has_sufficient_balance(
        &self,
        user_id: &str,
        amount: Money,
    ) -> Result<bool, PositionError>;
}
