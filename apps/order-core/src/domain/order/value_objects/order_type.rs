//! Order type (market, limit, or stop variants).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::order::errors::OrderError;

/// Order type specifying execution behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    /// Market order - execute at best available price.
    Market,
    /// Limit order - execute at specified price or better.
    Limit,
    /// Stop-loss order - becomes a market order when the stop price is reached.
    StopLoss,
    /// Stop-limit order - becomes a limit order when the stop price is reached.
    StopLimit,
}

impl OrderType {
    /// Returns true if this order type requires a price to be set.
    #[must_use]
    pub const fn requires_price(&self) -> bool {
        matches!(self, Self::Limit | Self::StopLoss | Self::StopLimit)
    }

    /// Returns true if this order type forbids a price.
    #[must_use]
    pub const fn forbids_price(&self) -> bool {
        matches!(self, Self::Market)
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Market => write!(f, "MARKET"),
            Self::Limit => write!(f, "LIMIT"),
            Self::StopLoss => write!(f, "STOP_LOSS"),
            Self::StopLimit => write!(f, "STOP_LIMIT"),
        }
    }
}

impl FromStr for OrderType {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MARKET" => Ok(Self::Market),
            "LIMIT" => Ok(Self::Limit),
            "STOP_LOSS" => Ok(Self::StopLoss),
            "STOP_LIMIT" => Ok(Self::StopLimit),
            other => Err(OrderError::InvalidParameters {
                field: "order_type".to_string(),
                message: format!("unknown order type: {other}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_type_requires_price() {
        assert!(!OrderType::Market.requires_price());
        assert!(OrderType::Limit.requires_price());
        assert!(OrderType::StopLoss.requires_price());
        assert!(OrderType::StopLimit.requires_price());
    }

    #[test]
    fn order_type_forbids_price() {
        assert!(OrderType::Market.forbids_price());
        assert!(!OrderType::Limit.forbids_price());
    }

    #[test]
    fn order_type_display() {
        assert_eq!(format!("{}", OrderType::StopLoss), "STOP_LOSS");
        assert_eq!(format!("{}", OrderType::StopLimit), "STOP_LIMIT");
    }

    #[test]
    fn order_type_round_trip() {
        for ty in [
            OrderType::Market,
            OrderType::Limit,
            OrderType::StopLoss,
            OrderType::StopLimit,
        ] {
            let parsed: OrderType = ty.to_string().parse().unwrap();
            assert_eq!(parsed, ty);
        }
    }

    #[test]
    fn order_type_parse_rejects_unknown() {
        assert!("ICEBERG".parse::<OrderType>().is_err());
    }

    #[test]
    fn order_type_serde() {
        let json = serde_json::to_string(&OrderType::StopLimit).unwrap();
        assert_eq!(json, "\"STOP_LIMIT\"");
    }
}
