//! Order aggregate root.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::shared::{BrokerId, Money, OrderId, Quantity, Symbol, Timestamp, WorkerId};

use super::errors::OrderError;
use super::events::OrderEvent;
use super::value_objects::{OrderSide, OrderStatus, OrderType};

/// Default tolerance (10%) allowed between a limit order's price and the
/// market price when validating for execution.
pub const DEFAULT_EXECUTION_TOLERANCE: Decimal = Decimal::from_parts(10, 0, 0, false, 2);

/// Command constructing a new order.
#[derive(Debug, Clone)]
pub struct CreateOrderCommand {
    /// Owning user.
    pub user_id: String,
    /// Instrument symbol.
    pub symbol: Symbol,
    /// Buy or sell.
    pub side: OrderSide,
    /// Market/limit/stop variant.
    pub order_type: OrderType,
    /// Quantity to trade.
    pub quantity: Quantity,
    /// Limit/stop price; required for non-market orders, forbidden for market.
    pub price: Option<Money>,
}

impl CreateOrderCommand {
    fn validate(&self) -> Result<(), OrderError> {
        if !self.quantity.is_positive() {
            return Err(OrderError::InvalidParameters {
                field: "quantity".to_string(),
                message: "quantity must be positive".to_string(),
            });
        }

        if self.order_type.requires_price() {
            match self.price {
                Some(price) if price.is_positive() => {}
                Some(_) => {
                    return Err(OrderError::InvalidParameters {
                        field: "price".to_string(),
                        message: format!("{} requires a positive price", self.order_type),
                    });
                }
                None => {
                    return Err(OrderError::InvalidParameters {
                        field: "price".to_string(),
                        message: format!("{} requires a price", self.order_type),
                    });
                }
            }
        } else if self.order_type.forbids_price() && self.price.is_some() {
            return Err(OrderError::InvalidParameters {
                field: "price".to_string(),
                message: format!("{} forbids a price", self.order_type),
            });
        }

        Ok(())
    }
}

/// The order aggregate root.
///
/// Authoritative state lives in the repository; instances held by a
/// request/worker context are point-in-time snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    user_id: String,
    symbol: Symbol,
    side: OrderSide,
    order_type: OrderType,
    quantity: Quantity,
    price: Option<Money>,
    status: OrderStatus,
    created_at: Timestamp,
    updated_at: Timestamp,
    executed_at: Option<Timestamp>,
    execution_price: Option<Money>,
    market_price_at_submission: Option<Money>,
    market_data_timestamp: Option<Timestamp>,
    failure_reason: Option<String>,
    retry_count: u32,
    processing_worker_id: Option<WorkerId>,
    external_order_id: Option<BrokerId>,
    #[serde(skip)]
    events: Vec<OrderEvent>,
}

impl Order {
    /// Constructs a new order in PENDING status, enforcing type/price
    /// invariants, and records an `OrderSubmitted` event.
    ///
    /// # Errors
    ///
    /// Returns an error if quantity is non-positive or the price is missing
    /// / present in violation of the order type's requirement.
    pub fn new(command: CreateOrderCommand) -> Result<Self, OrderError> {
        command.validate()?;

        let now = Timestamp::now();
        let id = OrderId::generate();

        let mut order = Self {
            id: id.clone(),
            user_id: command.user_id.clone(),
            symbol: command.symbol.clone(),
            side: command.side,
            order_type: command.order_type,
            quantity: command.quantity,
            price: command.price,
            status: OrderStatus::Pending,
            created_at: now.clone(),
            updated_at: now.clone(),
            executed_at: None,
            execution_price: None,
            market_price_at_submission: None,
            market_data_timestamp: None,
            failure_reason: None,
            retry_count: 0,
            processing_worker_id: None,
            external_order_id: None,
            events: Vec::new(),
        };

        order.events.push(OrderEvent::OrderSubmitted {
            event_id: Uuid::new_v4(),
            order_id: id,
            user_id: command.user_id,
            symbol: command.symbol,
            occurred_at: now,
        });

        Ok(order)
    }

    /// Reconstructs an order from persisted state, without emitting events.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn reconstitute(
        id: OrderId,
        user_id: String,
        symbol: Symbol,
        side: OrderSide,
        order_type: OrderType,
        quantity: Quantity,
        price: Option<Money>,
        status: OrderStatus,
        created_at: Timestamp,
        updated_at: Timestamp,
        executed_at: Option<Timestamp>,
        execution_price: Option<Money>,
        market_price_at_submission: Option<Money>,
        market_data_timestamp: Option<Timestamp>,
        failure_reason: Option<String>,
        retry_count: u32,
        processing_worker_id: Option<WorkerId>,
        external_order_id: Option<BrokerId>,
    ) -> Self {
        Self {
            id,
            user_id,
            symbol,
            side,
            order_type,
            quantity,
            price,
            status,
            created_at,
            updated_at,
            executed_at,
            execution_price,
            market_price_at_submission,
            market_data_timestamp,
            failure_reason,
            retry_count,
            processing_worker_id,
            external_order_id,
            events: Vec::new(),
        }
    }

    // --- Getters -----------------------------------------------------

    /// Order identifier.
    #[must_use]
    pub const fn id(&self) -> &OrderId {
        &self.id
    }

    /// Owning user id.
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Instrument symbol.
    #[must_use]
    pub const fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Buy or sell.
    #[must_use]
    pub const fn side(&self) -> OrderSide {
        self.side
    }

    /// Order type.
    #[must_use]
    pub const fn order_type(&self) -> OrderType {
        self.order_type
    }

    /// Requested quantity.
    #[must_use]
    pub const fn quantity(&self) -> Quantity {
        self.quantity
    }

    /// Limit/stop price, if any.
    #[must_use]
    pub const fn price(&self) -> Option<Money> {
        self.price
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> OrderStatus {
        self.status
    }

    /// Creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> &Timestamp {
        &self.created_at
    }

    /// Last-updated timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> &Timestamp {
        &self.updated_at
    }

    /// Execution timestamp, set only on transition to EXECUTED.
    #[must_use]
    pub const fn executed_at(&self) -> Option<&Timestamp> {
        self.executed_at.as_ref()
    }

    /// Execution price, set only on transition to EXECUTED.
    #[must_use]
    pub const fn execution_price(&self) -> Option<Money> {
        self.execution_price
    }

    /// Market price observed at submission, if captured.
    #[must_use]
    pub const fn market_price_at_submission(&self) -> Option<Money> {
        self.market_price_at_submission
    }

    /// Timestamp of the market data snapshot captured at submission.
    #[must_use]
    pub const fn market_data_timestamp(&self) -> Option<&Timestamp> {
        self.market_data_timestamp.as_ref()
    }

    /// Failure reason, set only when the order transitions to FAILED.
    #[must_use]
    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    /// Number of retry attempts made for this order.
    #[must_use]
    pub const fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Worker currently holding this order, if any.
    #[must_use]
    pub const fn processing_worker_id(&self) -> Option<&WorkerId> {
        self.processing_worker_id.as_ref()
    }

    /// External broker order id, if assigned.
    #[must_use]
    pub const fn external_order_id(&self) -> Option<&BrokerId> {
        self.external_order_id.as_ref()
    }

    /// Drains and returns pending domain events.
    pub fn drain_events(&mut self) -> Vec<OrderEvent> {
        std::mem::take(&mut self.events)
    }

    /// Returns pending domain events without draining them.
    #[must_use]
    pub fn pending_events(&self) -> &[OrderEvent] {
        &self.events
    }

    // --- Transition guard ---------------------------------------------

    fn ensure_can_transition_to(&self, target: OrderStatus) -> Result<(), OrderError> {
        if self.status.can_transition_to(target) {
            Ok(())
        } else {
            Err(OrderError::InvalidStateTransition {
                from: self.status,
                to: target,
                reason: "transition not permitted by the order status DAG".to_string(),
            })
        }
    }

    fn push_status_changed(&mut self, from: OrderStatus, to: OrderStatus) {
        self.events.push(OrderEvent::OrderStatusChanged {
            event_id: Uuid::new_v4(),
            order_id: self.id.clone(),
            from,
            to,
            occurred_at: self.updated_at.clone(),
        });
    }

    // --- Mutators -------------------------------------------------------

    /// Attaches a market-price snapshot captured during validation/pricing.
    /// Not a status transition.
    pub fn attach_market_snapshot(&mut self, price: Money, observed_at: Timestamp) {
        self.market_price_at_submission = Some(price);
        self.market_data_timestamp = Some(observed_at.clone());
        self.updated_at = Timestamp::now();

        self.events.push(OrderEvent::MarketDataReceived {
            event_id: Uuid::new_v4(),
            order_id: self.id.clone(),
            symbol: self.symbol.clone(),
            price,
            occurred_at: observed_at,
        });
    }

    /// Transitions the order to PROCESSING, recording the owning worker.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::InvalidStateTransition`] unless the order is
    /// currently PENDING.
    pub fn mark_processing(&mut self, worker_id: WorkerId) -> Result<(), OrderError> {
        self.ensure_can_transition_to(OrderStatus::Processing)?;

        let from = self.status;
        self.status = OrderStatus::Processing;
        self.processing_worker_id = Some(worker_id.clone());
        self.updated_at = Timestamp::now();

        self.events.push(OrderEvent::OrderProcessingStarted {
            event_id: Uuid::new_v4(),
            order_id: self.id.clone(),
            worker_id,
            occurred_at: self.updated_at.clone(),
        });
        self.push_status_changed(from, OrderStatus::Processing);

        Ok(())
    }

    /// Transitions the order to EXECUTED, recording the execution price.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::InvalidStateTransition`] unless the order is
    /// currently PROCESSING.
    pub fn mark_executed(&mut self, execution_price: Money) -> Result<(), OrderError> {
        self.ensure_can_transition_to(OrderStatus::Executed)?;

        let from = self.status;
        let now = Timestamp::now();
        self.status = OrderStatus::Executed;
        self.execution_price = Some(execution_price);
        self.executed_at = Some(now.clone());
        self.updated_at = now.clone();

        let total_value = execution_price * self.quantity.amount();

        self.events.push(OrderEvent::OrderExecuted {
            event_id: Uuid::new_v4(),
            order_id: self.id.clone(),
            user_id: self.user_id.clone(),
            symbol: self.symbol.clone(),
            side: self.side,
            order_type: self.order_type,
            quantity: self.quantity,
            execution_price,
            total_value,
            market_price_at_submission: self.market_price_at_submission,
            market_data_timestamp: self.market_data_timestamp.clone(),
            occurred_at: now,
        });
        self.push_status_changed(from, OrderStatus::Executed);

        Ok(())
    }

    /// Transitions the order to FAILED, recording the failure reason.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::InvalidStateTransition`] if the order is
    /// already terminal.
    pub fn mark_failed(&mut self, reason: impl Into<String>) -> Result<(), OrderError> {
        self.ensure_can_transition_to(OrderStatus::Failed)?;

        let from = self.status;
        let reason = reason.into();
        self.status = OrderStatus::Failed;
        self.failure_reason = Some(reason.clone());
        self.updated_at = Timestamp::now();

        self.events.push(OrderEvent::OrderFailed {
            event_id: Uuid::new_v4(),
            order_id: self.id.clone(),
            reason,
            occurred_at: self.updated_at.clone(),
        });
        self.push_status_changed(from, OrderStatus::Failed);

        Ok(())
    }

    /// Transitions the order to CANCELLED, recording the reason.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::InvalidStateTransition`] if the order is
    /// already terminal.
    pub fn mark_cancelled(&mut self, reason: impl Into<String>) -> Result<(), OrderError> {
        self.ensure_can_transition_to(OrderStatus::Cancelled)?;

        let from = self.status;
        let reason = reason.into();
        self.status = OrderStatus::Cancelled;
        self.updated_at = Timestamp::now();

        self.events.push(OrderEvent::OrderCancelled {
            event_id: Uuid::new_v4(),
            order_id: self.id.clone(),
            reason,
            occurred_at: self.updated_at.clone(),
        });
        self.push_status_changed(from, OrderStatus::Cancelled);

        Ok(())
    }

    /// Increments the retry counter. Called by the worker pool when a
    /// transient execution error routes the order to a retry queue.
    pub fn increment_retry(&mut self) {
        self.retry_count += 1;
        self.updated_at = Timestamp::now();
    }

    /// Assigns the external broker order id.
    pub fn assign_external_order_id(&mut self, broker_id: BrokerId) {
        self.external_order_id = Some(broker_id);
        self.updated_at = Timestamp::now();
    }

    // --- Derived operations ----------------------------------------------

    /// `price * quantity`, or zero for MARKET orders.
    #[must_use]
    pub fn calculate_order_value(&self) -> Money {
        match self.price {
            Some(price) => price * self.quantity.amount(),
            None => Money::ZERO,
        }
    }

    /// `execution_price * quantity`, if the order has executed.
    #[must_use]
    pub fn execution_value(&self) -> Option<Money> {
        self.execution_price.map(|price| price * self.quantity.amount())
    }

    /// Returns the price to use for execution: the limit price for LIMIT
    /// orders, the supplied market price otherwise.
    #[must_use]
    pub fn price_for_execution(&self, market_price: Money) -> Money {
        match (self.order_type, self.price) {
            (OrderType::Limit, Some(price)) => price,
            _ => market_price,
        }
    }

    /// Validates the order can execute against the given market price.
    ///
    /// Rejects execution outside `{PENDING, PROCESSING}`. For LIMIT orders
    /// with a set price, a buy is rejected if its price exceeds the market
    /// price by more than `tolerance`; a sell is rejected if its price is
    /// below the market price by more than `tolerance`.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::CannotExecute`] or
    /// [`OrderError::PriceOutOfTolerance`].
    pub fn validate_for_execution(
        &self,
        market_price: Money,
        tolerance: Decimal,
    ) -> Result<(), OrderError> {
        if !matches!(self.status, OrderStatus::Pending | OrderStatus::Processing) {
            return Err(OrderError::CannotExecute {
                status: self.status,
            });
        }

        if self.order_type == OrderType::Limit {
            if let Some(price) = self.price {
                let upper = market_price * (Decimal::ONE + tolerance);
                let lower = market_price * (Decimal::ONE - tolerance);

                let out_of_tolerance = match self.side {
                    OrderSide::Buy => price.amount() > upper.amount(),
                    OrderSide::Sell => price.amount() < lower.amount(),
                };

                if out_of_tolerance {
                    return Err(OrderError::PriceOutOfTolerance {
                        execution_price: price.to_string(),
                        market_price: market_price.to_string(),
                        tolerance: tolerance.to_string(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Validates that a sell order does not exceed the available position.
    /// A no-op for buy orders.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::InsufficientPosition`] if `available_qty` is
    /// non-positive or less than the order's quantity.
    pub fn validate_position_for_sell(&self, available_qty: Quantity) -> Result<(), OrderError> {
        if self.side != OrderSide::Sell {
            return Ok(());
        }

        if !available_qty.is_positive() || available_qty.amount() < self.quantity.amount() {
            return Err(OrderError::InsufficientPosition {
                requested: self.quantity.to_string(),
                available: available_qty.to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn command(order_type: OrderType, price: Option<Money>) -> CreateOrderCommand {
        CreateOrderCommand {
            user_id: "user-1".to_string(),
            symbol: Symbol::new("AAPL"),
            side: OrderSide::Buy,
            order_type,
            quantity: Quantity::from_i64(10),
            price,
        }
    }

    #[test]
    fn new_market_order_forbids_price() {
        let result = Order::new(command(OrderType::Market, Some(Money::usd(100.0))));
        assert!(result.is_err());
    }

    #[test]
    fn new_limit_order_requires_price() {
        let result = Order::new(command(OrderType::Limit, None));
        assert!(result.is_err());
    }

    #[test]
    fn new_market_order_is_pending_and_emits_submitted() {
        let mut order = Order::new(command(OrderType::Market, None)).unwrap();
        assert_eq!(order.status(), OrderStatus::Pending);

        let events = order.drain_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type(), "ORDER_SUBMITTED");
    }

    #[test]
    fn mark_processing_then_executed_happy_path() {
        let mut order = Order::new(command(OrderType::Market, None)).unwrap();
        order.drain_events();

        order.mark_processing(WorkerId::new("worker-1")).unwrap();
        assert_eq!(order.status(), OrderStatus::Processing);

        order.mark_executed(Money::usd(101.0)).unwrap();
        assert_eq!(order.status(), OrderStatus::Executed);
        assert!(order.executed_at().is_some());
        assert_eq!(order.execution_price(), Some(Money::usd(101.0)));
    }

    #[test]
    fn mark_executed_requires_processing_first() {
        let mut order = Order::new(command(OrderType::Market, None)).unwrap();
        let result = order.mark_executed(Money::usd(101.0));
        assert!(result.is_err());
    }

    #[test]
    fn terminal_orders_reject_further_transitions() {
        let mut order = Order::new(command(OrderType::Market, None)).unwrap();
        order.mark_processing(WorkerId::new("worker-1")).unwrap();
        order.mark_executed(Money::usd(101.0)).unwrap();

        assert!(order.mark_failed("late error").is_err());
        assert!(order.mark_cancelled("too late").is_err());
    }

    #[test]
    fn calculate_order_value_zero_for_market() {
        let order = Order::new(command(OrderType::Market, None)).unwrap();
        assert_eq!(order.calculate_order_value(), Money::ZERO);
    }

    #[test]
    fn calculate_order_value_for_limit() {
        let order = Order::new(command(OrderType::Limit, Some(Money::usd(100.0)))).unwrap();
        assert_eq!(order.calculate_order_value(), Money::usd(1000.0));
    }

    #[test]
    fn validate_for_execution_rejects_buy_limit_above_tolerance() {
        let order = Order::new(command(OrderType::Limit, Some(Money::new(dec!(116))))).unwrap();
        let result = order.validate_for_execution(Money::new(dec!(100)), dec!(0.10));
        assert!(result.is_err());
    }

    #[test]
    fn validate_for_execution_accepts_buy_limit_within_tolerance() {
        let order = Order::new(command(OrderType::Limit, Some(Money::new(dec!(105))))).unwrap();
        let result = order.validate_for_execution(Money::new(dec!(100)), dec!(0.10));
        assert!(result.is_ok());
    }

    #[test]
    fn validate_for_execution_rejects_terminal_status() {
        let mut order = Order::new(command(OrderType::Market, None)).unwrap();
        order.mark_processing(WorkerId::new("worker-1")).unwrap();
        order.mark_executed(Money::usd(101.0)).unwrap();

        let result = order.validate_for_execution(Money::usd(101.0), dec!(0.10));
        assert!(result.is_err());
    }

    #[test]
    fn validate_position_for_sell_rejects_insufficient() {
        let order = Order::new(CreateOrderCommand {
            user_id: "user-1".to_string(),
            symbol: Symbol::new("AAPL"),
            side: OrderSide::Sell,
            order_type: OrderType::Market,
            quantity: Quantity::from_i64(50),
            price: None,
        })
        .unwrap();

        assert!(order
            .validate_position_for_sell(Quantity::from_i64(10))
            .is_err());
        assert!(order
            .validate_position_for_sell(Quantity::from_i64(100))
            .is_ok());
    }

    #[test]
    fn validate_position_for_sell_is_noop_for_buy() {
        let order = Order::new(command(OrderType::Market, None)).unwrap();
        assert!(order
            .validate_position_for_sell(Quantity::from_i64(0))
            .is_ok());
    }

    #[test]
    fn increment_retry_counts_up() {
        let mut order = Order::new(command(OrderType::Market, None)).unwrap();
        assert_eq!(order.retry_count(), 0);
        order.increment_retry();
        order.increment_retry();
        assert_eq!(order.retry_count(), 2);
    }
}
