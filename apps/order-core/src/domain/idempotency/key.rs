//! Idempotency key derivation.

use sha2::{Digest, Sha256};
use std::fmt;

use crate::domain::order::{OrderSide, OrderType};
use crate::domain::shared::{Money, Quantity, Symbol};

/// A deterministic key identifying a unique order-submission request.
///
/// Derived as `SHA-256(user, symbol, type, side, quantity, price|"MARKET")`
/// over a canonical pipe-joined string, prefixed `order_` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Derives the key for a candidate order submission.
    ///
    /// Price and quantity are formatted to 8 decimal places (or the literal
    /// `"MARKET"` for an absent price) so that two requests describing the
    /// same logical order always canonicalize to the same string regardless
    /// of the originating `Decimal`'s stored scale.
    #[must_use]
    pub fn derive(
        user_id: &str,
        symbol: &Symbol,
        order_type: OrderType,
        side: OrderSide,
        quantity: Quantity,
        price: Option<Money>,
    ) -> Self {
        let price_component =
            price.map_or_else(|| "MARKET".to_string(), |p| format!("{:.8}", p.amount()));

        let canonical = format!(
            "{user_id}:{}:{order_type}:{side}:{:.8}:{price_component}",
            symbol.as_str(),
            quantity.amount(),
        );

        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        let digest = hasher.finalize();

        Self(format!("order_{digest:x}"))
    }

    /// Wraps an already-derived key string, e.g. one read back from storage.
    #[must_use]
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
