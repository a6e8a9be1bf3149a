//! Pricing recommendation produced by the pricing service.

use std::fmt;
use std::time::Duration;

use rust_decimal::Decimal;

use crate::domain::shared::Money;

/// Execution strategy recommended for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStrategy {
    /// Execute immediately at the best available price.
    Market,
    /// Execute at the limit price or better.
    Limit,
    /// Time-weighted average price: spread execution evenly over time.
    Twap,
    /// Volume-weighted average price: spread execution by volume profile.
    Vwap,
    /// Iceberg: slice a large order into smaller visible clips.
    Iceberg,
}

impl fmt::Display for ExecutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Market => write!(f, "MARKET"),
            Self::Limit => write!(f, "LIMIT"),
            Self::Twap => write!(f, "TWAP"),
            Self::Vwap => write!(f, "VWAP"),
            Self::Iceberg => write!(f, "ICEBERG"),
        }
    }
}

/// A price range recommendation, `[low, high]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceRange {
    /// Lower bound.
    pub low: Money,
    /// Upper bound.
    pub high: Money,
}

/// The pricing service's full recommendation for one order.
#[derive(Debug, Clone)]
pub struct PricingRecommendation {
    /// Recommended execution price.
    pub recommended_price: Money,
    /// Acceptable price range around the recommendation.
    pub price_range: PriceRange,
    /// Estimated probability of a fill, in `[0, 1]`.
    pub fill_probability: Decimal,
    /// Estimated time to fill.
    pub estimated_fill_time: Duration,
    /// Recommended execution strategy.
    pub strategy: ExecutionStrategy,
    /// Slippage tolerance to apply, as a fraction, capped at
    /// `max_slippage_percent`.
    pub slippage_tolerance: Decimal,
}
