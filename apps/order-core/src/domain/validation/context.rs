//! Validation context: externally-sourced facts the validation service
//! checks an order against.
//!
//! Built by the submit use case from `IMarketDataClient` / `IPositionClient`
//! before calling [`super::service::ValidationService::validate`].

use crate::domain::shared::{Money, Quantity};

/// Market facts relevant to validating one order.
#[derive(Debug, Clone)]
pub struct ValidationContext {
    /// Whether the symbol is known and tradeable.
    pub symbol_tradeable: bool,
    /// Whether the market is currently open.
    pub market_open: bool,
    /// Current market price for the symbol.
    pub market_price: Money,
    /// Quantity available to sell, if this is a SELL order.
    pub available_quantity: Option<Quantity>,
    /// Buying power available, if this is a BUY order.
    pub available_balance: Option<Money>,
    /// Total quantity held in the position (for the 80%-of-position warning).
    pub position_quantity: Option<Quantity>,
    /// Configurable bounds and thresholds.
    pub limits: ValidationLimits,
}

/// Configurable validation thresholds.
#[derive(Debug, Clone)]
pub struct ValidationLimits {
    /// Minimum order quantity.
    pub min_order_size: Quantity,
    /// Maximum order quantity.
    pub max_order_size: Quantity,
    /// Minimum order value.
    pub min_order_value: Money,
    /// Maximum order value.
    pub max_order_value: Money,
    /// Limit-price deviation from market beyond which a warning is raised.
    pub price_deviation_warning_pct: rust_decimal::Decimal,
    /// Limit-price deviation from market beyond which an error is raised.
    pub price_deviation_error_pct: rust_decimal::Decimal,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        use rust_decimal_macros::dec;

        Self {
            min_order_size: Quantity::from_i64(1),
            max_order_size: Quantity::from_i64(100_000),
            min_order_value: Money::usd(1.0),
            max_order_value: Money::usd(1_000_000.0),
            price_deviation_warning_pct: dec!(0.05),
            price_deviation_error_pct: dec!(0.50),
        }
    }
}
