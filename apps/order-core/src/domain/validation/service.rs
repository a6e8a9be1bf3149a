//! Validation Service
//!
//! Checks an order against market, position, and balance facts supplied by
//! the caller as a [`ValidationContext`].

use rust_decimal::Decimal;

use crate::domain::order::{Order, OrderSide};

use super::context::ValidationContext;
use super::result::ValidationResult;

/// Validates orders against market/position/balance context.
pub struct ValidationService;

impl ValidationService {
    /// Runs every validation rule and merges the findings.
    #[must_use]
    pub fn validate(order: &Order, ctx: &ValidationContext) -> ValidationResult {
        let mut result = ValidationResult::success();

        result.merge(Self::validate_symbol(ctx));
        result.merge(Self::validate_market_hours(ctx));
        result.merge(Self::validate_price_deviation(order, ctx));
        result.merge(Self::validate_quantity(order, ctx));
        result.merge(Self::validate_side_specific(order, ctx));
        result.merge(Self::validate_order_value(order, ctx));

        result
    }

    fn validate_symbol(ctx: &ValidationContext) -> ValidationResult {
        let mut result = ValidationResult::success();
        if !ctx.symbol_tradeable {
            result.add_error("symbol is not tradeable");
        }
        result
    }

    fn validate_market_hours(ctx: &ValidationContext) -> ValidationResult {
        let mut result = ValidationResult::success();
        if !ctx.market_open {
            result.add_warning("market is closed");
        }
        result
    }

    fn validate_price_deviation(order: &Order, ctx: &ValidationContext) -> ValidationResult {
        let mut result = ValidationResult::success();

        let Some(price) = order.price() else {
            return result;
        };
        if ctx.market_price.amount() == Decimal::ZERO {
            return result;
        }

        let deviation =
            ((price.amount() - ctx.market_price.amount()) / ctx.market_price.amount()).abs();

        if deviation > ctx.limits.price_deviation_error_pct {
            result.add_error(format!(
                "limit price deviates {:.1}% from market, beyond the {:.0}% error threshold",
                deviation * Decimal::from(100),
                ctx.limits.price_deviation_error_pct * Decimal::from(100)
            ));
        } else if deviation > ctx.limits.price_deviation_warning_pct {
            result.add_warning(format!(
                "limit price deviates {:.1}% from market",
                deviation * Decimal::from(100)
            ));
        }

        result
    }

    fn validate_quantity(order: &Order, ctx: &ValidationContext) -> ValidationResult {
        let mut result = ValidationResult::success();
        let qty = order.quantity();

        if qty.amount() < ctx.limits.min_order_size.amount() {
            result.add_error(format!(
                "quantity {qty} below minimum {}",
                ctx.limits.min_order_size
            ));
        }
        if qty.amount() > ctx.limits.max_order_size.amount() {
            result.add_error(format!(
                "quantity {qty} above maximum {}",
                ctx.limits.max_order_size
            ));
        }

        result
    }

    fn validate_side_specific(order: &Order, ctx: &ValidationContext) -> ValidationResult {
        let mut result = ValidationResult::success();

        match order.side() {
            OrderSide::Sell => {
                let available = ctx.available_quantity.unwrap_or_default();
                if available.amount() < order.quantity().amount() {
                    result.add_error(format!(
                        "insufficient position: requested {}, available {available}",
                        order.quantity()
                    ));
                } else if let Some(position) = ctx.position_quantity {
                    if position.amount() > Decimal::ZERO {
                        let pct = order.quantity().amount() / position.amount();
                        if pct > Decimal::new(80, 2) {
                            result.add_warning(format!(
                                "order sells {:.0}% of the current position",
                                pct * Decimal::from(100)
                            ));
                        }
                    }
                }
            }
            OrderSide::Buy => {
                let order_value = order.calculate_order_value();
                let reference_value = if order_value.is_zero() {
                    ctx.market_price * order.quantity().amount()
                } else {
                    order_value
                };

                if let Some(balance) = ctx.available_balance {
                    if balance.amount() < reference_value.amount() {
                        result.add_error(format!(
                            "insufficient buying power: requires {reference_value}, available {balance}"
                        ));
                    }
                }
            }
        }

        result
    }

    fn validate_order_value(order: &Order, ctx: &ValidationContext) -> ValidationResult {
        let mut result = ValidationResult::success();

        let value = order.calculate_order_value();
        let effective_value = if value.is_zero() {
            ctx.market_price * order.quantity().amount()
        } else {
            value
        };

        if effective_value.amount() < ctx.limits.min_order_value.amount() {
            result.add_error(format!(
                "order value {effective_value} below minimum {}",
                ctx.limits.min_order_value
            ));
        }
        if effective_value.amount() > ctx.limits.max_order_value.amount() {
            result.add_error(format!(
                "order value {effective_value} above maximum {}",
                ctx.limits.max_order_value
            ));
        } else {
            let pct_of_max = effective_value.amount() / ctx.limits.max_order_value.amount();
            if pct_of_max > Decimal::new(10, 2) {
                result.add_warning(format!(
                    "order value is {:.0}% of the maximum allowed",
                    pct_of_max * Decimal::from(100)
                ));
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{CreateOrderCommand, OrderType};
    use crate::domain::shared::{Money, Quantity, Symbol};
    use crate::domain::validation::context::ValidationLimits;

    fn order(side: OrderSide, order_type: OrderType, price: Option<Money>, qty: i64) -> Order {
        Order::new(CreateOrderCommand {
            user_id: "user-1".to_string(),
            symbol: Symbol::new("AAPL"),
            side,
            order_type,
            quantity: Quantity::from_i64(qty),
            price,
        })
        .unwrap()
    }

    fn context() -> ValidationContext {
        ValidationContext {
            symbol_tradeable: true,
            market_open: true,
            market_price: Money::usd(100.0),
            available_quantity: Some(Quantity::from_i64(1000)),
            available_balance: Some(Money::usd(1_000_000.0)),
            position_quantity: Some(Quantity::from_i64(1000)),
            limits: ValidationLimits::default(),
        }
    }

    #[test]
    fn untradeable_symbol_is_an_error() {
        let mut ctx = context();
        ctx.symbol_tradeable = false;
        let order = order(OrderSide::Buy, OrderType::Market, None, 10);

        let result = ValidationService::validate(&order, &ctx);
        assert!(!result.valid);
    }

    #[test]
    fn closed_market_is_a_warning_only() {
        let mut ctx = context();
        ctx.market_open = false;
        let order = order(OrderSide::Buy, OrderType::Market, None, 10);

        let result = ValidationService::validate(&order, &ctx);
        assert!(result.valid);
        assert!(!result.warnings.is_empty());
    }

    #[test]
    fn limit_price_far_from_market_is_an_error() {
        let ctx = context();
        let order = order(OrderSide::Buy, OrderType::Limit, Some(Money::usd(200.0)), 10);

        let result = ValidationService::validate(&order, &ctx);
        assert!(!result.valid);
    }

    #[test]
    fn sell_exceeding_position_is_an_error() {
        let mut ctx = context();
        ctx.available_quantity = Some(Quantity::from_i64(5));
        let order = order(OrderSide::Sell, OrderType::Market, None, 10);

        let result = ValidationService::validate(&order, &ctx);
        assert!(!result.valid);
    }

    #[test]
    fn sell_of_most_of_position_warns() {
        let mut ctx = context();
        ctx.available_quantity = Some(Quantity::from_i64(100));
        ctx.position_quantity = Some(Quantity::from_i64(100));
        let order = order(OrderSide::Sell, OrderType::Market, None, 90);

        let result = ValidationService::validate(&order, &ctx);
        assert!(result.valid);
        assert!(!result.warnings.is_empty());
    }

    #[test]
    fn buy_exceeding_balance_is_an_error() {
        let mut ctx = context();
        ctx.available_balance = Some(Money::usd(100.0));
        let order = order(OrderSide::Buy, OrderType::Market, None, 10);

        let result = ValidationService::validate(&order, &ctx);
        assert!(!result.valid);
    }
}
