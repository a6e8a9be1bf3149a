//! External market-microstructure capability consumed by the pricing
//! service.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::shared::{Money, Quantity, Symbol};

/// Errors surfaced by an `IPricingDataClient` implementation.
#[derive(Debug, Error)]
pub enum PricingDataError {
    /// The symbol is unknown to the provider.
    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),
    /// The provider timed out or returned a server error.
    #[error("pricing data provider unavailable: {0}")]
    Unavailable(String),
}

/// One level of an order book.
#[derive(Debug, Clone, Copy)]
pub struct OrderBookLevel {
    /// Price at this level.
    pub price: Money,
    /// Aggregate quantity resting at this level.
    pub quantity: Quantity,
}

/// A symbol's current order book, best-first.
#[derive(Debug, Clone)]
pub struct OrderBook {
    /// Bid levels, best (highest) first.
    pub bids: Vec<OrderBookLevel>,
    /// Ask levels, best (lowest) first.
    pub asks: Vec<OrderBookLevel>,
}

/// Market-microstructure capability consumed by the pricing service.
#[async_trait]
#[cfg_attr(test, automock)]
pub trait IPricingDataClient: Send + Sync {
    /// Returns the current `(bid, ask)` for `symbol`.
    ///
    /// # Errors
    ///
    /// Returns [`PricingDataError::UnknownSymbol`] or
    /// [`PricingDataError::Unavailable`].
    async fn market_price(&self, symbol: &Symbol) -> Result<(Money, Money), PricingDataError>;

    /// Returns the order book for `symbol`, at most `depth` levels per
    /// side.
    ///
    /// # Errors
    ///
    /// Returns error if the provider is unreachable.
    async fn order_book(&self, symbol: &Symbol, depth: u32) -> Result<OrderBook, PricingDataError>;

    /// Returns total resting quantity within `depth` levels of the touch,
    /// a liquidity-depth signal independent of the full book.
    ///
    /// # Errors
    ///
    /// Returns error if the provider is unreachable.
    async fn depth(&self, symbol: &Symbol, depth: u32) -> Result<Quantity, PricingDataError>;

    /// Returns the estimated fee for a trade of `notional` value.
    ///
    /// # Errors
    ///
    /// Returns error if the provider is unreachable.
    async fn fees(&self, symbol: &Symbol, notional: Money) -> Result<Money, PricingDataError>;

    /// Returns an estimated market-impact cost, as a fraction of notional,
    /// for trading `quantity` of `symbol` immediately.
    ///
    /// # Errors
    ///
    /// Returns error if the provider is unreachable.
    async fn impact_estimate(
        &self,
        symbol: &Symbol,
        quantity: Quantity,
    ) -> Result<Decimal, PricingDataError>;
}
