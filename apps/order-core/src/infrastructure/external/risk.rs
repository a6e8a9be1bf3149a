//! Simulated risk-data provider.

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::application::ports::{IRiskDataClient, RiskDataError, TradingLimits, UserRiskProfile};
use crate::domain::risk::RiskTolerance;
use crate::domain::shared::{Money, Symbol};

/// Risk-data client returning a fixed, moderate risk posture for every
/// user and a low flat volatility/exposure for every symbol, rather than
/// querying a real risk engine.
#[derive(Debug, Clone, Default)]
pub struct SimulatedRiskDataClient;

impl SimulatedRiskDataClient {
    /// Creates a new simulated client.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl IRiskDataClient for SimulatedRiskDataClient {
    async fn user_profile(&self, _user_id: &str) -> Result<UserRiskProfile, RiskDataError> {
        Ok(UserRiskProfile {
            tolerance: RiskTolerance::Moderate,
            max_order_value: Money::new(dec!(250_000.00)),
        })
    }

    async fn position_exposure(
        &self,
        _user_id: &str,
        _symbol: &Symbol,
    ) -> Result<Decimal, RiskDataError> {
        Ok(dec!(0.05))
    }

    async fn balance(&self, _user_id: &str) -> Result<Money, RiskDataError> {
        Ok(Money::new(dec!(1_000_000.00)))
    }

    async fn volatility(&self, _symbol: &Symbol) -> Result<Decimal, RiskDataError> {
        Ok(dec!(0.25))
    }

    async fn trading_limits(&self, _user_id: &str) -> Result<TradingLimits, RiskDataError> {
        Ok(TradingLimits {
            max_concentration_pct: dec!(0.25),
            has_critical_violation: false,
        })
    }
}
