//! Simulated order-execution provider.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use rust_decimal_macros::dec;

use crate::application::ports::{ExecutionError, IOrderExecutionClient};
use crate::domain::order::Order;
use crate::domain::shared::Money;

/// Execution client that fills every order at the supplied market price
/// (with a fixed slippage) rather than routing to a real broker/simulator.
///
/// Tracks a call counter so a configured failure rate can be exercised
/// deterministically in tests without external randomness.
#[derive(Debug)]
pub struct SimulatedOrderExecutionClient {
    calls: AtomicU64,
    fail_every_nth: Option<u64>,
}

impl SimulatedOrderExecutionClient {
    /// Creates a client that always fills successfully.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            calls: AtomicU64::new(0),
            fail_every_nth: None,
        }
    }

    /// Creates a client that returns a transient [`ExecutionError::Unavailable`]
    /// on every `n`th call, succeeding otherwise. Useful for exercising the
    /// worker pool's retry path without a live broker.
    #[must_use]
    pub const fn with_transient_failure_every(n: u64) -> Self {
        Self {
            calls: AtomicU64::new(0),
            fail_every_nth: Some(n),
        }
    }
}

impl Default for SimulatedOrderExecutionClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IOrderExecutionClient for SimulatedOrderExecutionClient {
    async fn execute(&self, _order: &Order, market_price: Money) -> Result<Money, ExecutionError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some(n) = self.fail_every_nth
            && n > 0
            && call % n == 0
        {
            return Err(ExecutionError::Unavailable(
                "simulated execution provider timeout".to_string(),
            ));
        }

        let slippage = market_price.amount() * dec!(0.0001);
        Ok(Money::new(market_price.amount() + slippage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{CreateOrderCommand, OrderSide, OrderType};
    use crate::domain::shared::{Quantity, Symbol};

    fn sample_order() -> Order {
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
    async fn execute_applies_small_slippage() {
        let client = SimulatedOrderExecutionClient::new();
        let order = sample_order();
        let filled = client.execute(&order, Money::new(dec!(100.00))).await.unwrap();
        assert!(filled.amount() > dec!(100.00));
    }

    #[tokio::test]
    async fn execute_fails_on_configured_nth_call() {
        let client = SimulatedOrderExecutionClient::with_transient_failure_every(2);
        let order = sample_order();

        assert!(client.execute(&order, Money::new(dec!(100.00))).await.is_ok());
        let second = client.execute(&order, Money::new(dec!(100.00))).await;
        assert!(matches!(second, Err(ExecutionError::Unavailable(_))));
    }
}
