//! Domain events produced by order operations.
//!
//! Events are immutable once produced, serialized to the bus by the event
//! publisher, and never mutated after creation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::shared::{Money, OrderId, Quantity, Symbol, Timestamp, WorkerId};

use super::value_objects::{OrderSide, OrderStatus, OrderType};

/// A domain event emitted by an order aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderEvent {
    /// Emitted when a new order is constructed by the submit use case.
    OrderSubmitted {
        /// Unique event identifier.
        event_id: Uuid,
        /// Order the event pertains to.
        order_id: OrderId,
        /// Owning user.
        user_id: String,
        /// Order symbol.
        symbol: Symbol,
        /// Event timestamp.
        occurred_at: Timestamp,
    },

    /// Emitted when a worker claims an order for processing.
    OrderProcessingStarted {
        /// Unique event identifier.
        event_id: Uuid,
        /// Order the event pertains to.
        order_id: OrderId,
        /// Worker that claimed the order.
        worker_id: WorkerId,
        /// Event timestamp.
        occurred_at: Timestamp,
    },

    /// Emitted when an order is successfully executed.
    ///
    /// Carries enough detail for downstream position workers to derive a
    /// position-update without re-reading the order.
    OrderExecuted {
        /// Unique event identifier.
        event_id: Uuid,
        /// Order the event pertains to.
        order_id: OrderId,
        /// Owning user.
        user_id: String,
        /// Order symbol.
        symbol: Symbol,
        /// Order side.
        side: OrderSide,
        /// Order type.
        order_type: OrderType,
        /// Executed quantity.
        quantity: Quantity,
        /// Price the order executed at.
        execution_price: Money,
        /// `execution_price * quantity`.
        total_value: Money,
        /// Market price observed at submission, if captured.
        market_price_at_submission: Option<Money>,
        /// Market data timestamp associated with the submission snapshot.
        market_data_timestamp: Option<Timestamp>,
        /// Event timestamp.
        occurred_at: Timestamp,
    },

    /// Emitted when an order fails permanently.
    OrderFailed {
        /// Unique event identifier.
        event_id: Uuid,
        /// Order the event pertains to.
        order_id: OrderId,
        /// Reason for failure.
        reason: String,
        /// Event timestamp.
        occurred_at: Timestamp,
    },

    /// Emitted when an order is cancelled before execution.
    OrderCancelled {
        /// Unique event identifier.
        event_id: Uuid,
        /// Order the event pertains to.
        order_id: OrderId,
        /// Reason for cancellation.
        reason: String,
        /// Event timestamp.
        occurred_at: Timestamp,
    },

    /// Emitted on every status transition, for audit/consumers that only
    /// care about status changes.
    OrderStatusChanged {
        /// Unique event identifier.
        event_id: Uuid,
        /// Order the event pertains to.
        order_id: OrderId,
        /// Previous status.
        from: OrderStatus,
        /// New status.
        to: OrderStatus,
        /// Event timestamp.
        occurred_at: Timestamp,
    },

    /// Emitted by the risk service describing a completed risk check.
    RiskCheckPerformed {
        /// Unique event identifier.
        event_id: Uuid,
        /// Order the event pertains to.
        order_id: OrderId,
        /// Composite risk score, 0-100.
        score: u8,
        /// Whether manual approval is required.
        requires_manual_approval: bool,
        /// Event timestamp.
        occurred_at: Timestamp,
    },

    /// Emitted when market data is fetched in support of validation/pricing.
    MarketDataReceived {
        /// Unique event identifier.
        event_id: Uuid,
        /// Order the event pertains to.
        order_id: OrderId,
        /// Symbol the data pertains to.
        symbol: Symbol,
        /// Observed market price.
        price: Money,
        /// Event timestamp.
        occurred_at: Timestamp,
    },

    /// Emitted when business-rule validation rejects an order.
    OrderValidationFailed {
        /// Unique event identifier.
        event_id: Uuid,
        /// Order the event pertains to.
        order_id: OrderId,
        /// Validation error messages.
        errors: Vec<String>,
        /// Event timestamp.
        occurred_at: Timestamp,
    },

    /// Emitted when position validation rejects a sell order.
    PositionValidationFailed {
        /// Unique event identifier.
        event_id: Uuid,
        /// Order the event pertains to.
        order_id: OrderId,
        /// Quantity requested.
        requested: Quantity,
        /// Quantity available.
        available: Quantity,
        /// Event timestamp.
        occurred_at: Timestamp,
    },
}

impl OrderEvent {
    /// Returns the order id the event pertains to.
    #[must_use]
    pub const fn order_id(&self) -> &OrderId {
        match self {
            Self::OrderSubmitted { order_id, .. }
            | Self::OrderProcessingStarted { order_id, .. }
            | Self::OrderExecuted { order_id, .. }
            | Self::OrderFailed { order_id, .. }
            | Self::OrderCancelled { order_id, .. }
            | Self::OrderStatusChanged { order_id, .. }
            | Self::RiskCheckPerformed { order_id, .. }
            | Self::MarketDataReceived { order_id, .. }
            | Self::OrderValidationFailed { order_id, .. }
            | Self::PositionValidationFailed { order_id, .. } => order_id,
        }
    }

    /// Returns the timestamp the event occurred at.
    #[must_use]
    pub const fn occurred_at(&self) -> &Timestamp {
        match self {
            Self::OrderSubmitted { occurred_at, .. }
            | Self::OrderProcessingStarted { occurred_at, .. }
            | Self::OrderExecuted { occurred_at, .. }
            | Self::OrderFailed { occurred_at, .. }
            | Self::OrderCancelled { occurred_at, .. }
            | Self::OrderStatusChanged { occurred_at, .. }
            | Self::RiskCheckPerformed { occurred_at, .. }
            | Self::MarketDataReceived { occurred_at, .. }
            | Self::OrderValidationFailed { occurred_at, .. }
            | Self::PositionValidationFailed { occurred_at, .. } => occurred_at,
        }
    }

    /// Returns the event's wire type name.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::OrderSubmitted { .. } => "ORDER_SUBMITTED",
            Self::OrderProcessingStarted { .. } => "ORDER_PROCESSING_STARTED",
            Self::OrderExecuted { .. } => "ORDER_EXECUTED",
            Self::OrderFailed { .. } => "ORDER_FAILED",
            Self::OrderCancelled { .. } => "ORDER_CANCELLED",
            Self::OrderStatusChanged { .. } => "ORDER_STATUS_CHANGED",
            Self::RiskCheckPerformed { .. } => "RISK_CHECK_PERFORMED",
            Self::MarketDataReceived { .. } => "MARKET_DATA_RECEIVED",
            Self::OrderValidationFailed { .. } => "ORDER_VALIDATION_FAILED",
            Self::PositionValidationFailed { .. } => "POSITION_VALIDATION_FAILED",
        }
    }

    /// The bus queue downstream consumers for this event type read from, if
    /// the event is published at all (see the event publisher).
    #[must_use]
    pub const fn target_queue(&self) -> Option<&'static str> {
        match self {
            Self::OrderExecuted { .. } => Some("positions.updates"),
            Self::OrderFailed { .. } => Some("orders.failed"),
            Self::OrderCancelled { .. } => Some("orders.cancelled"),
            Self::OrderStatusChanged { .. } => Some("orders.status"),
            _ => None,
        }
    }
}

/// Helper type alias, not currently used but kept for symmetry with the
/// publisher's envelope timestamp field.
pub type OccurredAt = DateTime<Utc>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn order_id() -> OrderId {
        OrderId::generate()
    }

    #[test]
    fn order_executed_targets_positions_updates() {
        let event = OrderEvent::OrderExecuted {
            event_id: Uuid::new_v4(),
            order_id: order_id(),
            user_id: "user-1".to_string(),
            symbol: Symbol::new("AAPL"),
            side: OrderSide::Buy,
            order_type: OrderType::Market,
            quantity: Quantity::from_i64(10),
            execution_price: Money::new(dec!(100.00)),
            total_value: Money::new(dec!(1000.00)),
            market_price_at_submission: Some(Money::new(dec!(99.50))),
            market_data_timestamp: Some(Timestamp::now()),
            occurred_at: Timestamp::now(),
        };

        assert_eq!(event.target_queue(), Some("positions.updates"));
        assert_eq!(event.event_type(), "ORDER_EXECUTED");
    }

    #[test]
    fn order_submitted_has_no_target_queue() {
        let event = OrderEvent::OrderSubmitted {
            event_id: Uuid::new_v4(),
            order_id: order_id(),
            user_id: "user-1".to_string(),
            symbol: Symbol::new("AAPL"),
            occurred_at: Timestamp::now(),
        };

        assert_eq!(event.target_queue(), None);
    }

    #[test]
    fn order_failed_targets_orders_failed() {
        let event = OrderEvent::OrderFailed {
            event_id: Uuid::new_v4(),
            order_id: order_id(),
            reason: "broker rejected".to_string(),
            occurred_at: Timestamp::now(),
        };

        assert_eq!(event.target_queue(), Some("orders.failed"));
    }

    #[test]
    fn event_serializes_with_type_tag() {
        let event = OrderEvent::OrderCancelled {
            event_id: Uuid::new_v4(),
            order_id: order_id(),
            reason: "user requested".to_string(),
            occurred_at: Timestamp::now(),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "ORDER_CANCELLED");
    }
}
