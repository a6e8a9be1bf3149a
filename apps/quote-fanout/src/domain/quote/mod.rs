//! Asset Quote Domain Types
//!
//! Core domain type for the quote catalog: a single symbol's current price
//! state plus the fields needed to describe its latest move. Pure data and
//! pure functions only — no locks, no tokio, no I/O.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Floor applied to any oscillated price so quotes never go non-positive.
pub const MIN_PRICE: Decimal = dec!(1.00);

/// A single symbol's quote state, mutated only by the oscillator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetQuote {
    /// Ticker symbol, e.g. "AAPL".
    pub symbol: String,
    /// Reference price the quote was seeded with; the anchor `change` is measured against.
    pub base_price: Decimal,
    /// Latest traded/displayed price.
    pub current_price: Decimal,
    /// `current_price - base_price`.
    pub change: Decimal,
    /// `change / base_price * 100`, zero when `base_price` is zero.
    pub change_percent: Decimal,
    /// When this quote was last mutated.
    pub last_updated: DateTime<Utc>,
}

impl AssetQuote {
    /// Seed a quote at its base price with zero change.
    #[must_use]
    pub fn new(symbol: impl Into<String>, base_price: Decimal, now: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.into(),
            base_price,
            current_price: base_price,
            change: Decimal::ZERO,
            change_percent: Decimal::ZERO,
            last_updated: now,
        }
    }

    /// Apply a uniform perturbation (a fraction, e.g. `dec!(0.01)` for +1%) of
    /// `base_price` to `current_price`, flooring at [`MIN_PRICE`], and
    /// recompute the derived fields. `pct` may be negative.
    pub fn oscillate(&mut self, pct: Decimal, now: DateTime<Utc>) {
        let delta = self.base_price * pct;
        let mut next = self.current_price + delta;
        if next < MIN_PRICE {
            next = MIN_PRICE;
        }
        self.current_price = next;
        self.change = self.current_price - self.base_price;
        self.change_percent = if self.base_price.is_zero() {
            Decimal::ZERO
        } else {
            (self.change / self.base_price) * dec!(100)
        };
        self.last_updated = now;
    }

    /// Whether the four mutable fields differ between `self` and `other`.
    /// Used to decide whether an update is patch-worthy at all.
    #[must_use]
    pub fn differs_from(&self, other: &Self) -> bool {
        self.current_price != other.current_price
            || self.change != other.change
            || self.change_percent != other.change_percent
            || self.last_updated != other.last_updated
    }
}

/// A named mutable field of [`AssetQuote`], used to build minimal JSON-Patch
/// `replace` ops (see [`crate::domain::patch`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteField {
    /// `/quotes/<symbol>/current_price`
    CurrentPrice,
    /// `/quotes/<symbol>/change`
    Change,
    /// `/quotes/<symbol>/change_percent`
    ChangePercent,
    /// `/quotes/<symbol>/last_updated`
    LastUpdated,
}

impl QuoteField {
    /// All tracked fields, in wire-stable order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::CurrentPrice,
            Self::Change,
            Self::ChangePercent,
            Self::LastUpdated,
        ]
    }

    /// JSON field name as it appears in the patch path.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CurrentPrice => "current_price",
            Self::Change => "change",
            Self::ChangePercent => "change_percent",
            Self::LastUpdated => "last_updated",
        }
    }
}

/// Default symbol universe the catalog is seeded with at startup, paired
/// with a plausible base price. Real deployments would instead seed this
/// from a configuration file; the values here exist purely so the
/// oscillator has something to perturb.
#[must_use]
pub fn default_symbol_seeds() -> Vec<(&'static str, Decimal)> {
    vec![
        ("AAPL", dec!(195.50)),
        ("MSFT", dec!(412.30)),
        ("GOOGL", dec!(165.80)),
        ("AMZN", dec!(178.25)),
        ("TSLA", dec!(242.10)),
        ("NVDA", dec!(875.40)),
        ("META", dec!(505.60)),
        ("NFLX", dec!(615.90)),
        ("AMD", dec!(168.75)),
        ("INTC", dec!(42.15)),
    ]
}
