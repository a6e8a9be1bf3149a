//! Order status and the transition DAG it follows.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::order::errors::OrderError;

/// Order status in the lifecycle.
///
/// Transitions form a DAG: `Pending -> {Processing, Cancelled, Failed}`,
/// `Processing -> {Executed, Failed, Cancelled}`. Terminal states admit no
/// further transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Order created, awaiting a worker to pick it up.
    Pending,
    /// A worker currently owns the order and is executing it.
    Processing,
    /// Order filled; `execution_price` and `executed_at` are set.
    Executed,
    /// Order failed permanently; `failure_reason` is set.
    Failed,
    /// Order cancelled before execution.
    Cancelled,
}

impl OrderStatus {
    /// Returns true if no further transition is permitted.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Executed | Self::Failed | Self::Cancelled)
    }

    /// Returns true if the order is still live (can transition further).
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Returns true if the transition to `target` is permitted by the DAG.
    #[must_use]
    pub const fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Pending, Self::Processing)
                | (Self::Pending, Self::Cancelled)
                | (Self::Pending, Self::Failed)
                | (Self::Processing, Self::Executed)
                | (Self::Processing, Self::Failed)
                | (Self::Processing, Self::Cancelled)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Processing => write!(f, "PROCESSING"),
            Self::Executed => write!(f, "EXECUTED"),
            Self::Failed => write!(f, "FAILED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

impl FromStr for OrderStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "PROCESSING" => Ok(Self::Processing),
            "EXECUTED" => Ok(Self::Executed),
            "FAILED" => Ok(Self::Failed),
            "CANCELLED" => Ok(Self::Cancelled),
            other => Err(OrderError::InvalidParameters {
                field: "status".to_string(),
                message: format!("unknown order status: {other}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_status_is_terminal() {
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::Processing.is_terminal());
        assert!(OrderStatus::Executed.is_terminal());
        assert!(OrderStatus::Failed.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
    }

    #[test]
    fn order_status_transition_dag() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Processing));
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Cancelled));
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Failed));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Executed));

        assert!(OrderStatus::Processing.can_transition_to(OrderStatus::Executed));
        assert!(OrderStatus::Processing.can_transition_to(OrderStatus::Failed));
        assert!(OrderStatus::Processing.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Processing.can_transition_to(OrderStatus::Pending));
    }

    #[test]
    fn order_status_terminal_states_admit_no_transitions() {
        for terminal in [
            OrderStatus::Executed,
            OrderStatus::Failed,
            OrderStatus::Cancelled,
        ] {
            for target in [
                OrderStatus::Pending,
                OrderStatus::Processing,
                OrderStatus::Executed,
                OrderStatus::Failed,
                OrderStatus::Cancelled,
            ] {
                assert!(!terminal.can_transition_to(target));
            }
        }
    }

    #[test]
    fn order_status_executed_cannot_become_failed() {
        assert!(!OrderStatus::Executed.can_transition_to(OrderStatus::Failed));
    }

    #[test]
    fn order_status_round_trip() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Processing,
            OrderStatus::Executed,
            OrderStatus::Failed,
            OrderStatus::Cancelled,
        ] {
            let parsed: OrderStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn order_status_parse_rejects_unknown() {
        assert!("UNKNOWN".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn order_status_serde() {
        let json = serde_json::to_string(&OrderStatus::Processing).unwrap();
        assert_eq!(json, "\"PROCESSING\"");
    }
}
