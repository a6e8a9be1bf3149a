//! Pricing Service
//!
//! Recommends an execution price, range, fill probability, estimated fill
//! time, execution strategy, and slippage tolerance for an order.

use std::time::Duration;

use rust_decimal::Decimal;

use crate::domain::order::{Order, OrderSide, OrderType};
use crate::domain::shared::Money;

use super::context::{LiquidityLevel, PricingContext, SpreadCondition};
use super::recommendation::{ExecutionStrategy, PriceRange, PricingRecommendation};

/// Recommends execution pricing and strategy for orders.
pub struct PricingService;

impl PricingService {
    /// Builds a full pricing recommendation for `order`.
    #[must_use]
    pub fn recommend(order: &Order, ctx: &PricingContext) -> PricingRecommendation {
        let recommended_price = Self::recommended_price(order, ctx);
        let price_range = Self::price_range(ctx);
        let fill_probability = Self::fill_probability(order, ctx, recommended_price);
        let estimated_fill_time = Self::estimated_fill_time(ctx, fill_probability);
        let strategy = Self::strategy(order, ctx);
        let slippage_tolerance = Self::slippage_tolerance(order, ctx);

        PricingRecommendation {
            recommended_price,
            price_range,
            fill_probability,
            estimated_fill_time,
            strategy,
            slippage_tolerance,
        }
    }

    fn recommended_price(order: &Order, ctx: &PricingContext) -> Money {
        match order.order_type() {
            OrderType::Market => match order.side() {
                OrderSide::Buy => ctx.ask,
                OrderSide::Sell => ctx.bid,
            },
            _ => {
                let spread = ctx.spread();
                let offset = spread * Decimal::from_parts(3, 0, 0, false, 1);
                match order.side() {
                    OrderSide::Buy => ctx.bid + offset,
                    OrderSide::Sell => ctx.ask - offset,
                }
            }
        }
    }

    fn price_range(ctx: &PricingContext) -> PriceRange {
        let buffer = ctx.spread() * Decimal::from(2);
        PriceRange {
            low: ctx.bid - buffer,
            high: ctx.ask + buffer,
        }
    }

    fn fill_probability(order: &Order, ctx: &PricingContext, recommended: Money) -> Decimal {
        if order.order_type() == OrderType::Market {
            return Decimal::new(95, 2);
        }

        let Some(price) = order.price() else {
            return Decimal::new(95, 2);
        };

        let spread = ctx.spread().amount();
        if spread <= Decimal::ZERO {
            return Decimal::new(50, 2);
        }

        // Distance from the recommended marketable price, normalized by
        // spread: closer to marketable -> higher fill probability.
        let distance = (price.amount() - recommended.amount()).abs() / spread;
        let probability = Decimal::ONE - (distance * Decimal::new(20, 2)).min(Decimal::new(80, 2));
        probability.max(Decimal::new(10, 2))
    }

    fn estimated_fill_time(ctx: &PricingContext, fill_probability: Decimal) -> Duration {
        let base_seconds: u64 = match ctx.liquidity {
            LiquidityLevel::High => 120,
            LiquidityLevel::Normal => 900,
            LiquidityLevel::Low => 3_600,
        };

        let spread_multiplier: u64 = match ctx.spread_condition {
            SpreadCondition::Tight => 1,
            SpreadCondition::Normal => 2,
            SpreadCondition::Wide => 4,
        };

        let probability_penalty: u64 = if fill_probability < Decimal::new(50, 2) {
            6
        } else if fill_probability < Decimal::new(80, 2) {
            2
        } else {
            1
        };

        let seconds = base_seconds * spread_multiplier * probability_penalty;
        Duration::from_secs(seconds.min(24 * 3_600))
    }

    fn strategy(order: &Order, ctx: &PricingContext) -> ExecutionStrategy {
        let value = order.calculate_order_value();
        let large_order = value.amount() > Decimal::from(100_000);
        let thin_liquidity = matches!(ctx.liquidity, LiquidityLevel::Low)
            || matches!(ctx.spread_condition, SpreadCondition::Wide);

        match order.order_type() {
            OrderType::Market if !large_order => ExecutionStrategy::Market,
            OrderType::Market if thin_liquidity => ExecutionStrategy::Iceberg,
            OrderType::Market => ExecutionStrategy::Vwap,
            _ if large_order && thin_liquidity => ExecutionStrategy::Iceberg,
            _ if large_order => ExecutionStrategy::Twap,
            _ => ExecutionStrategy::Limit,
        }
    }

    fn slippage_tolerance(order: &Order, ctx: &PricingContext) -> Decimal {
        let liquidity_component: Decimal = match ctx.liquidity {
            LiquidityLevel::High => Decimal::new(5, 3),
            LiquidityLevel::Normal => Decimal::new(15, 3),
            LiquidityLevel::Low => Decimal::new(40, 3),
        };

        let spread_component: Decimal = match ctx.spread_condition {
            SpreadCondition::Tight => Decimal::new(2, 3),
            SpreadCondition::Normal => Decimal::new(8, 3),
            SpreadCondition::Wide => Decimal::new(25, 3),
        };

        let value = order.calculate_order_value().amount();
        let value_component = if value > Decimal::from(500_000) {
            Decimal::new(20, 3)
        } else if value > Decimal::from(100_000) {
            Decimal::new(10, 3)
        } else {
            Decimal::ZERO
        };

        (liquidity_component + spread_component + value_component).min(ctx.max_slippage_percent)
    }
}
