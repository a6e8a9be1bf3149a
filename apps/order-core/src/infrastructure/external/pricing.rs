//! Simulated market-microstructure provider.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::application::ports::{
    IPricingDataClient, OrderBook, OrderBookLevel, PricingDataError,
};
use crate::domain::shared::{Money, Quantity, Symbol};

fn mid_price_for(symbol: &Symbol) -> Decimal {
    let mut hasher = DefaultHasher::new();
    symbol.as_str().hash(&mut hasher);
    let bucket = hasher.finish() % 99_900;
    Decimal::new(100_000 + i64::try_from(bucket).unwrap_or(0), 2)
}

/// Pricing client that synthesizes a symmetric order book around a
/// deterministic mid price rather than querying a real venue.
#[derive(Debug, Clone, Default)]
pub struct SimulatedPricingDataClient;

impl SimulatedPricingDataClient {
    /// Creates a new simulated client.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl IPricingDataClient for SimulatedPricingDataClient {
    async fn market_price(&self, symbol: &Symbol) -> Result<(Money, Money), PricingDataError> {
        let mid = mid_price_for(symbol);
        let spread = mid * dec!(0.0005);
        Ok((Money::new(mid - spread), Money::new(mid + spread)))
    }

    async fn order_book(&self, symbol: &Symbol, depth: u32) -> Result<OrderBook, PricingDataError> {
        let mid = mid_price_for(symbol);
        let tick = mid * dec!(0.0005);
        let levels = depth.max(1);

        let mut bids = Vec::with_capacity(levels as usize);
        let mut asks = Vec::with_capacity(levels as usize);
        for i in 0..levels {
            let offset = tick * Decimal::from(i + 1);
            bids.push(OrderBookLevel {
                price: Money::new(mid - offset),
                quantity: Quantity::from_i64(500 * i64::from(levels - i)),
            });
            asks.push(OrderBookLevel {
                price: Money::new(mid + offset),
                quantity: Quantity::from_i64(500 * i64::from(levels - i)),
            });
        }

        Ok(OrderBook { bids, asks })
    }

    async fn depth(&self, _symbol: &Symbol, depth: u32) -> Result<Quantity, PricingDataError> {
        Ok(Quantity::from_i64(500 * i64::from(depth.max(1))))
    }

    async fn fees(&self, _symbol: &Symbol, notional: Money) -> Result<Money, PricingDataError> {
        Ok(Money::new(notional.amount() * dec!(0.0005)))
    }

    async fn impact_estimate(
        &self,
        _symbol: &Symbol,
        quantity: Quantity,
    ) -> Result<Decimal, PricingDataError> {
        let participation = quantity.amount() / dec!(100_000);
        Ok((participation * dec!(0.1)).min(dec!(0.05)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn market_price_bid_below_ask() {
        let client = SimulatedPricingDataClient::new();
        let (bid, ask) = client.market_price(&Symbol::new("AAPL")).await.unwrap();
        assert!(bid.amount() < ask.amount());
    }

    #[tokio::test]
    async fn order_book_respects_requested_depth() {
        let client = SimulatedPricingDataClient::new();
        let book = client.order_book(&Symbol::new("AAPL"), 5).await.unwrap();
        assert_eq!(book.bids.len(), 5);
        assert_eq!(book.asks.len(), 5);
    }

    #[tokio::test]
    async fn impact_estimate_is_capped() {
        let client = SimulatedPricingDataClient::new();
        let impact = client
            .impact_estimate(&Symbol::new("AAPL"), Quantity::from_i64(1_000_000))
            .await
            .unwrap();
        assert_eq!(impact, dec!(0.05));
    }
}
