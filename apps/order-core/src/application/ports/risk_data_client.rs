//! External risk-data capability consumed by the risk service.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::risk::RiskTolerance;
use crate::domain::shared::{Money, Symbol};

/// Errors surfaced by an `IRiskDataClient` implementation.
#[derive(Debug, Error)]
pub enum RiskDataError {
    /// The user has no risk profile on record.
    #[error("unknown user: {0}")]
    UnknownUser(String),
    /// The provider timed out or returned a server error.
    #[error("risk data provider unavailable: {0}")]
    Unavailable(String),
}

/// A user's configured risk posture.
#[derive(Debug, Clone, Copy)]
pub struct UserRiskProfile {
    /// The user's risk-tolerance tier.
    pub tolerance: RiskTolerance,
    /// The largest single order value this user is configured to place.
    pub max_order_value: Money,
}

/// Hard trading limits that, if breached, force manual approval
/// regardless of the composite score.
#[derive(Debug, Clone, Copy)]
pub struct TradingLimits {
    /// Configured maximum concentration in a single symbol, as a fraction
    /// of portfolio value.
    pub max_concentration_pct: Decimal,
    /// Whether any hard limit is already breached for this user.
    pub has_critical_violation: bool,
}

/// Risk-data capability consumed by the risk service.
#[async_trait]
#[cfg_attr(test, automock)]
pub trait IRiskDataClient: Send + Sync {
    /// Returns the user's configured risk profile.
    ///
    /// # Errors
    ///
    /// Returns error if the provider is unreachable.
    async fn user_profile(&self, user_id: &str) -> Result<UserRiskProfile, RiskDataError>;

    /// Returns this symbol's share of the user's total portfolio value,
    /// as a fraction.
    ///
    /// # Errors
    ///
    /// Returns error if the provider is unreachable.
    async fn position_exposure(
        &self,
        user_id: &str,
        symbol: &Symbol,
    ) -> Result<Decimal, RiskDataError>;

    /// Returns the user's available balance.
    ///
    /// # Errors
    ///
    /// Returns error if the provider is unreachable.
    async fn balance(&self, user_id: &str) -> Result<Money, RiskDataError>;

    /// Returns the symbol's annualized volatility, as a fraction.
    ///
    /// # Errors
    ///
    /// Returns error if the provider is unreachable.
    async fn volatility(&self, symbol: &Symbol) -> Result<Decimal, RiskDataError>;

    /// Returns the user's configured hard trading limits.
    ///
    /// # Errors
    ///
    /// Returns error if the provider is unreachable.
    async fn trading_limits(&self, user_id: &str) -> Result<TradingLimits, RiskDataError>;
}
