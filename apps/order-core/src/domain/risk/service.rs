//! Risk Service
//!
//! Computes a composite 0-100 risk score for an order from a
//! [`RiskContext`], weighted 40% market risk, 30% concentration risk, 20%
//! user risk profile, 10% order-size bucket.

use rust_decimal::Decimal;

use super::context::RiskContext;
use super::score::RiskAssessment;

/// Scores orders for risk.
pub struct RiskService;

impl RiskService {
    /// Computes the composite risk assessment for the given context.
    #[must_use]
    pub fn assess(ctx: &RiskContext) -> RiskAssessment {
        let market = Self::market_risk(ctx);
        let concentration = Self::concentration_risk(ctx);
        let profile = Self::user_profile_risk(ctx);
        let size = Self::order_size_risk(ctx);

        let weighted = market * Decimal::from_parts(40, 0, 0, false, 2)
            + concentration * Decimal::from_parts(30, 0, 0, false, 2)
            + profile * Decimal::from_parts(20, 0, 0, false, 2)
            + size * Decimal::from_parts(10, 0, 0, false, 2);

        let score = weighted
            .round()
            .clamp(Decimal::ZERO, Decimal::from(100))
            .to_string()
            .parse::<u8>()
            .unwrap_or(100);

        RiskAssessment::new(score, ctx.has_critical_factor)
    }

    /// 0-100 market-risk component: volatility, beta, and a high-volatility
    /// flag each contribute.
    fn market_risk(ctx: &RiskContext) -> Decimal {
        let volatility_component = (ctx.volatility * Decimal::from(100)).min(Decimal::from(60));
        let beta_component = ((ctx.beta - Decimal::ONE).max(Decimal::ZERO) * Decimal::from(20))
            .min(Decimal::from(20));
        let flag_component = if ctx.high_volatility_flag {
            Decimal::from(20)
        } else {
            Decimal::ZERO
        };

        (volatility_component + beta_component + flag_component).min(Decimal::from(100))
    }

    /// 0-100 concentration-risk component: grows exponentially once the
    /// order's concentration exceeds the configured portfolio limit.
    fn concentration_risk(ctx: &RiskContext) -> Decimal {
        if ctx.concentration_limit_pct <= Decimal::ZERO {
            return Decimal::ZERO;
        }

        let ratio = ctx.concentration_pct / ctx.concentration_limit_pct;
        if ratio <= Decimal::ONE {
            return (ratio * Decimal::from(50)).min(Decimal::from(50));
        }

        let excess = ratio - Decimal::ONE;
        // Quadratic growth above the limit approximates exponential blowup
        // without pulling in a transcendental-math dependency.
        (Decimal::from(50) + excess * excess * Decimal::from(50)).min(Decimal::from(100))
    }

    /// 0-100 user-risk-profile component: utilization of `max_order_value`
    /// scaled by the user's tolerance multiplier.
    fn user_profile_risk(ctx: &RiskContext) -> Decimal {
        (ctx.order_value_utilization * ctx.tolerance.multiplier() * Decimal::from(100))
            .min(Decimal::from(100))
    }

    /// 0-100 order-size component, directly from the caller-supplied bucket.
    fn order_size_risk(ctx: &RiskContext) -> Decimal {
        (ctx.order_size_bucket * Decimal::from(100)).min(Decimal::from(100))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::risk::context::RiskTolerance;
    use rust_decimal_macros::dec;

    fn low_risk_context() -> RiskContext {
        RiskContext {
            volatility: dec!(0.05),
            beta: dec!(1.0),
            high_volatility_flag: false,
            concentration_pct: dec!(0.01),
            concentration_limit_pct: dec!(0.10),
            order_value_utilization: dec!(0.05),
            tolerance: RiskTolerance::Conservative,
            order_size_bucket: dec!(0.1),
            has_critical_factor: false,
        }
    }

    #[test]
    fn low_risk_context_scores_low() {
        let assessment = RiskService::assess(&low_risk_context());
        assert!(assessment.score < 20);
        assert!(!assessment.requires_manual_approval);
    }

    #[test]
    fn high_volatility_and_concentration_score_high() {
        let mut ctx = low_risk_context();
        ctx.volatility = dec!(0.80);
        ctx.high_volatility_flag = true;
        ctx.concentration_pct = dec!(0.40);
        ctx.concentration_limit_pct = dec!(0.10);
        ctx.order_value_utilization = dec!(0.90);
        ctx.tolerance = RiskTolerance::VeryAggressive;
        ctx.order_size_bucket = dec!(1.0);

        let assessment = RiskService::assess(&ctx);
        assert!(assessment.score >= 70);
        assert!(assessment.requires_manual_approval);
    }

    #[test]
    fn critical_factor_forces_manual_approval_regardless_of_score() {
        let mut ctx = low_risk_context();
        ctx.has_critical_factor = true;

        let assessment = RiskService::assess(&ctx);
        assert!(assessment.requires_manual_approval);
    }

    #[test]
    fn concentration_above_limit_scores_higher_than_at_limit() {
        let mut at_limit = low_risk_context();
        at_limit.concentration_pct = at_limit.concentration_limit_pct;

        let mut above_limit = low_risk_context();
        above_limit.concentration_pct = above_limit.concentration_limit_pct * dec!(2);

        let at = RiskService::assess(&at_limit);
        let above = RiskService::assess(&above_limit);
        assert!(above.score > at.score);
    }
}
