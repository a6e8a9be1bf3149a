//! Risk scoring context.

use rust_decimal::Decimal;

/// User risk-tolerance tiers, each with a multiplier applied to the
/// user-risk-profile component of the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskTolerance {
    /// Conservative: dampens the user-profile component.
    Conservative,
    /// Moderate: slight dampening.
    Moderate,
    /// Aggressive: slight amplification.
    Aggressive,
    /// VeryAggressive: strong amplification.
    VeryAggressive,
}

impl RiskTolerance {
    /// The multiplier applied to utilization of `max_order_value`.
    #[must_use]
    pub const fn multiplier(self) -> Decimal {
        match self {
            Self::Conservative => Decimal::from_parts(5, 0, 0, false, 1),
            Self::Moderate => Decimal::from_parts(8, 0, 0, false, 1),
            Self::Aggressive => Decimal::from_parts(12, 0, 0, false, 1),
            Self::VeryAggressive => Decimal::from_parts(15, 0, 0, false, 1),
        }
    }
}

/// Facts the risk service scores an order against.
#[derive(Debug, Clone)]
pub struct RiskContext {
    /// Annualized volatility of the instrument, as a fraction (e.g. 0.35).
    pub volatility: Decimal,
    /// Market beta of the instrument.
    pub beta: Decimal,
    /// Whether the instrument is flagged high-volatility.
    pub high_volatility_flag: bool,
    /// This order's notional as a fraction of total portfolio value.
    pub concentration_pct: Decimal,
    /// Configured concentration limit, as a fraction of portfolio value.
    pub concentration_limit_pct: Decimal,
    /// This order's value divided by the user's configured max order value.
    pub order_value_utilization: Decimal,
    /// The user's configured risk tolerance tier.
    pub tolerance: RiskTolerance,
    /// This order's quantity, expressed as a size bucket in `[0, 1]`
    /// (0 = smallest bucket, 1 = largest).
    pub order_size_bucket: Decimal,
    /// Whether any upstream risk factor reported a critical impact
    /// (e.g. a hard trading-limit breach reported by `IRiskDataClient`).
    pub has_critical_factor: bool,
}
