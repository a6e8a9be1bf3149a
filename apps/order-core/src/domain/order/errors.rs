//! Order domain errors.

use std::fmt;

use super::value_objects::OrderStatus;

/// Errors that can occur while constructing or transitioning an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    /// Invalid state transition attempted.
    InvalidStateTransition {
        /// Current order status.
        from: OrderStatus,
        /// Attempted status.
        to: OrderStatus,
        /// Reason for failure.
        reason: String,
    },

    /// Order cannot be executed in its current state.
    CannotExecute {
        /// Current status.
        status: OrderStatus,
    },

    /// Order cannot be cancelled in its current state.
    CannotCancel {
        /// Current status.
        status: OrderStatus,
    },

    /// Execution price deviates from the market price beyond tolerance.
    PriceOutOfTolerance {
        /// Price the order would execute at.
        execution_price: String,
        /// Reference market price.
        market_price: String,
        /// Allowed tolerance, as a fraction (e.g. "0.10" for 10%).
        tolerance: String,
    },

    /// Position being sold exceeds what is held.
    InsufficientPosition {
        /// Quantity requested to sell.
        requested: String,
        /// Quantity available.
        available: String,
    },

    /// Invalid order parameters.
    InvalidParameters {
        /// Field with invalid value.
        field: String,
        /// Error message.
        message: String,
    },

    /// Order not found.
    NotFound {
        /// Order ID.
        order_id: String,
    },

    /// Duplicate order ID.
    DuplicateOrderId {
        /// Order ID.
        order_id: String,
    },
}

impl fmt::Display for OrderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidStateTransition { from, to, reason } => {
                write!(
                    f,
                    "Invalid order state transition: {from} -> {to}: {reason}"
                )
            }
            Self::CannotExecute { status } => {
                write!(f, "Cannot execute order in status: {status}")
            }
            Self::CannotCancel { status } => {
                write!(f, "Cannot cancel order in status: {status}")
            }
            Self::PriceOutOfTolerance {
                execution_price,
                market_price,
                tolerance,
            } => {
                write!(
                    f,
                    "Execution price {execution_price} deviates from market price \
                     {market_price} by more than tolerance {tolerance}"
                )
            }
            Self::InsufficientPosition {
                requested,
                available,
            } => {
                write!(
                    f,
                    "Insufficient position: requested {requested}, available {available}"
                )
            }
            Self::InvalidParameters { field, message } => {
                write!(f, "Invalid order parameter '{field}': {message}")
            }
            Self::NotFound { order_id } => {
                write!(f, "Order not found: {order_id}")
            }
            Self::DuplicateOrderId { order_id } => {
                write!(f, "Duplicate order ID: {order_id}")
            }
        }
    }
}

impl std::error::Error for OrderError {}
