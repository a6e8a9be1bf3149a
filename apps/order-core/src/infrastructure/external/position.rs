//! Simulated position/balance provider.

use std::sync::RwLock;

use async_trait::async_trait;
use rust_decimal_macros::dec;

use crate::application::ports::{IPositionClient, PositionError};
use crate::domain::shared::{Money, Quantity, Symbol};

/// Position client backed by a generous fixed allowance rather than a real
/// ledger service. Every user is treated as holding `DEFAULT_HOLDING` of
/// every symbol and `DEFAULT_BALANCE` in buying power; a test can seed a
/// different balance via [`Self::set_balance`].
#[derive(Debug)]
pub struct SimulatedPositionClient {
    default_holding: Quantity,
    balances: RwLock<std::collections::HashMap<String, Money>>,
    default_balance: Money,
}

const DEFAULT_HOLDING_SHARES: i64 = 10_000;

impl SimulatedPositionClient {
    /// Creates a client with a generous default holding and balance for
    /// every user.
    #[must_use]
    pub fn new() -> Self {
        Self {
            default_holding: Quantity::from_i64(DEFAULT_HOLDING_SHARES),
            balances: RwLock::new(std::collections::HashMap::new()),
            default_balance: Money::new(dec!(1_000_000.00)),
        }
    }

    /// Overrides the buying power available to `user_id`.
    pub fn set_balance(&self, user_id: &str, balance: Money) {
        self.balances
            .write()
            .expect("position balances lock poisoned")
            .insert(user_id.to_string(), balance);
    }
}

impl Default for SimulatedPositionClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IPositionClient for SimulatedPositionClient {
    async fn available_quantity(
        &self,
        _user_id: &str,
        _symbol: &Symbol,
    ) -> Result<Quantity, PositionError> {
        Ok(self.default_holding)
    }

    async fn has_sufficient_balance(
        &self,
        user_id: &str,
        amount: Money,
    ) -> Result<bool, PositionError> {
        let balance = self
            .balances
            .read()
            .expect("position balances lock poisoned")
            .get(user_id)
            .copied()
            .unwrap_or(self.default_balance);
        Ok(balance.amount() >= amount.amount())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_balance_covers_typical_orders() {
        let client = SimulatedPositionClient::new();
        let sufficient = client
            .has_sufficient_balance("user-1", Money::new(dec!(5_000.00)))
            .await
            .unwrap();
        assert!(sufficient);
    }

    #[tokio::test]
    async fn seeded_balance_overrides_default() {
        let client = SimulatedPositionClient::new();
        client.set_balance("user-1", Money::new(dec!(10.00)));

        let sufficient = client
            .has_sufficient_balance("user-1", Money::new(dec!(5_000.00)))
            .await
            .unwrap();
        assert!(!sufficient);
    }
}
