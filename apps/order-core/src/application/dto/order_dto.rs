//! Data transfer objects for order submission.

use serde::{Deserialize, Serialize};

use crate::domain::order::{Order, OrderSide, OrderStatus, OrderType};

/// Inbound request to submit a new order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitOrderRequestDto {
    /// Owning user.
    pub user_id: String,
    /// Instrument symbol.
    pub symbol: String,
    /// Buy or sell.
    pub side: OrderSide,
    /// Market/limit/stop variant.
    pub order_type: OrderType,
    /// Quantity to trade, as a decimal string.
    pub quantity: String,
    /// Limit/stop price, as a decimal string; required for non-market
    /// orders.
    pub price: Option<String>,
}

/// Outcome returned to the caller of the submit-order use case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitOrderResponseDto {
    /// The order id, whether newly created or resolved from a prior
    /// idempotent completion.
    pub order_id: String,
    /// Current order status at the time of response.
    pub status: OrderStatus,
    /// Non-blocking warnings surfaced during validation/pricing/risk.
    pub warnings: Vec<String>,
}

/// Read-model projection of an order, returned by order lookup endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDto {
    /// Order id.
    pub order_id: String,
    /// Owning user.
    pub user_id: String,
    /// Instrument symbol.
    pub symbol: String,
    /// Buy or sell.
    pub side: OrderSide,
    /// Market/limit/stop variant.
    pub order_type: OrderType,
    /// Requested quantity.
    pub quantity: String,
    /// Limit/stop price, if any.
    pub price: Option<String>,
    /// Current status.
    pub status: OrderStatus,
    /// Execution price, once executed.
    pub execution_price: Option<String>,
    /// Creation timestamp, RFC3339.
    pub created_at: String,
    /// Last-updated timestamp, RFC3339.
    pub updated_at: String,
}

impl OrderDto {
    /// Projects a domain [`Order`] into its wire representation.
    #[must_use]
    pub fn from_order(order: &Order) -> Self {
        Self {
            order_id: order.id().as_str().to_string(),
            user_id: order.user_id().to_string(),
            symbol: order.symbol().as_str().to_string(),
            side: order.side(),
            order_type: order.order_type(),
            quantity: order.quantity().to_string(),
            price: order.price().map(|p| p.to_string()),
            status: order.status(),
            execution_price: order.execution_price().map(|p| p.to_string()),
            created_at: order.created_at().to_rfc3339(),
            updated_at: order.updated_at().to_rfc3339(),
        }
    }
}
