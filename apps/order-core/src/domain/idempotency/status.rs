//! Idempotency record status.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of an idempotency key's backing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IdempotencyStatus {
    /// Submission is in flight; no terminal result yet.
    Pending,
    /// Submission succeeded; `order_id` and `result` are set.
    Completed,
    /// Submission failed; `result` carries the error.
    Failed,
    /// The key's TTL has elapsed and it is eligible for garbage collection.
    Expired,
}

impl IdempotencyStatus {
    /// Returns true once the key carries a terminal result.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Expired)
    }
}

impl fmt::Display for IdempotencyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Failed => write!(f, "FAILED"),
            Self::Expired => write!(f, "EXPIRED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_is_not_terminal() {
        assert!(!IdempotencyStatus::Pending.is_terminal());
    }

    #[test]
    fn completed_failed_expired_are_terminal() {
        assert!(IdempotencyStatus::Completed.is_terminal());
        assert!(IdempotencyStatus::Failed.is_terminal());
        assert!(IdempotencyStatus::Expired.is_terminal());
    }

    #[test]
    fn display_matches_wire_form() {
        assert_eq!(format!("{}", IdempotencyStatus::Pending), "PENDING");
    }
}
