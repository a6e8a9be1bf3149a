//! Pricing context: market microstructure facts priced orders are built
//! against.

use rust_decimal::Decimal;

use crate::domain::shared::Money;

/// Liquidity tiers used to scale fill-time and slippage estimates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiquidityLevel {
    /// Deep book, tight and stable spread.
    High,
    /// Typical liquidity.
    Normal,
    /// Thin book, wide spread.
    Low,
}

/// Spread condition relative to the instrument's historical norm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpreadCondition {
    /// Spread is tighter than normal.
    Tight,
    /// Spread is within its normal range.
    Normal,
    /// Spread is wider than normal.
    Wide,
}

/// Market facts the pricing service prices an order against.
#[derive(Debug, Clone)]
pub struct PricingContext {
    /// Best bid.
    pub bid: Money,
    /// Best ask.
    pub ask: Money,
    /// Current liquidity tier.
    pub liquidity: LiquidityLevel,
    /// Current spread condition.
    pub spread_condition: SpreadCondition,
    /// The maximum slippage tolerance the caller will accept, as a
    /// fraction (e.g. 0.02 for 2%).
    pub max_slippage_percent: Decimal,
}

impl PricingContext {
    /// `ask - bid`.
    #[must_use]
    pub fn spread(&self) -> Money {
        self.ask - self.bid
    }

    /// Midpoint of bid/ask.
    #[must_use]
    pub fn mid(&self) -> Money {
        Money::new((self.bid.amount() + self.ask.amount()) / Decimal::from(2))
    }
}
