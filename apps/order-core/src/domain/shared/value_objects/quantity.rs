//! Quantity value object for order quantities.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Sub};

use crate::domain::shared::DomainError;

/// A quantity for orders (shares or contracts).
///
/// Represented as a Decimal to handle partial quantities from fills.
/// For options, 1 contract = 100 shares underlying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(Decimal);

impl Quantity {
    /// Create a new Quantity from a Decimal.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create a Quantity from an integer.
    #[must_use]
    pub fn from_i64(amount: i64) -> Self {
        Self(Decimal::new(amount, 0))
    }

    /// Create a Quantity from a u32.
    #[must_use]
    pub fn from_u32(amount: u32) -> Self {
        Self(Decimal::from(amount))
    }

    /// Zero quantity.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Get the inner Decimal value.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Get the integer portion (truncated).
    ///
    /// # Note on Truncation
    ///
    /// This method casts i128 to i64, which may truncate values exceeding `i64::MAX`.
    /// This is acceptable for order quantities in this domain because:
    /// - Maximum order quantity is validated to 100,000 shares (see `validate_for_order`)
    /// - Real-world order quantities never approach `i64::MAX` (~9.2 quintillion)
    /// - The truncation would only occur for astronomically large invalid quantities
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn as_i64(&self) -> i64 {
        let divisor = 10i128.pow(self.0.scale());
        let result = self.0.mantissa() / divisor;
        result as i64
    }

    /// Returns true if this quantity is positive.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Returns true if this quantity is negative.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Returns true if this quantity is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == Decimal::ZERO
    }

    /// Get the absolute value.
    #[must_use]
    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    /// Validate quantity for order submission.
    ///
    /// # Errors
    ///
    /// Returns error if quantity is zero, negative, or exceeds limits.
    pub fn validate_for_order(&self) -> Result<(), DomainError> {
        if self.0 <= Decimal::ZERO {
            return Err(DomainError::InvalidValue {
                field: "quantity".to_string(),
                message: "Order quantity must be positive".to_string(),
            });
        }
        let max = Decimal::new(100_000, 0);
        if self.0 > max {
            return Err(DomainError::InvalidValue {
                field: "quantity".to_string(),
                message: format!("Order quantity exceeds maximum: {max}"),
            });
        }
        Ok(())
    }

    /// Round to whole units (for final order submission).
    #[must_use]
    pub fn round_down(&self) -> Self {
        Self(self.0.floor())
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.fract().is_zero() {
            write!(f, "{}", self.0.trunc())
        } else {
            write!(f, "{:.4}", self.0)
        }
    }
}

impl PartialOrd for Quantity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Quantity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl Add for Quantity {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Quantity {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl From<Decimal> for Quantity {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl From<i64> for Quantity {
    fn from(value: i64) -> Self {
        Self::from_i64(value)
    }
}

impl From<u32> for Quantity {
    fn from(value: u32) -> Self {
        Self::from_u32(value)
    }
}

impl From<Quantity> for Decimal {
    fn from(value: Quantity) -> Self {
        value.0
    }
}
