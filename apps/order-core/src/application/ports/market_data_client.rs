//! External market-data capability consumed by validation, pricing, and
//! the worker pool.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
#[cfg(test)]
use mockall::automock;
use thiserror::Error;

use crate::domain::shared::{Money, Symbol};

/// Errors surfaced by an `IMarketDataClient` implementation.
#[derive(Debug, Error)]
pub enum MarketDataError {
    /// The symbol is unknown to the provider.
    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),
    /// The provider timed out or returned a server error.
    #[error("market data provider unavailable: {0}")]
    Unavailable(String),
}

/// Static details about a tradeable instrument.
#[derive(Debug, Clone)]
pub struct AssetDetails {
    /// The instrument's symbol.
    pub symbol: Symbol,
    /// Whether the instrument currently accepts orders.
    pub tradeable: bool,
    /// Human-readable instrument name.
    pub name: String,
}

/// The exchange's regular trading session for the current day.
#[derive(Debug, Clone, Copy)]
pub struct TradingHours {
    /// Session open, UTC.
    pub open: DateTime<Utc>,
    /// Session close, UTC.
    pub close: DateTime<Utc>,
}

/// Market data capability consumed by validation/pricing/risk and the
/// worker pool. Implemented outside the core; represented here as an
/// `#[async_trait]` so use cases can depend on it through a generic bound
/// or a trait object.
#[async_trait]
#[cfg_attr(test, automock)]
pub trait IMarketDataClient: Send + Sync {
    /// Returns whether `symbol` is known and currently tradeable.
    ///
    /// # Errors
    ///
    /// Returns error if the provider is unreachable.
    async fn validate_symbol(&self, symbol: &Symbol) -> Result<bool, MarketDataError>;

    /// Returns the current market price for `symbol`.
    ///
    /// # Errors
    ///
    /// Returns [`MarketDataError::UnknownSymbol`] or
    /// [`MarketDataError::Unavailable`].
    async fn current_price(&self, symbol: &Symbol) -> Result<Money, MarketDataError>;

    /// Returns whether the relevant market is currently open.
    ///
    /// # Errors
    ///
    /// Returns error if the provider is unreachable.
    async fn is_market_open(&self) -> Result<bool, MarketDataError>;

    /// Returns static details about `symbol`.
    ///
    /// # Errors
    ///
    /// Returns [`MarketDataError::UnknownSymbol`] or
    /// [`MarketDataError::Unavailable`].
    async fn asset_details(&self, symbol: &Symbol) -> Result<AssetDetails, MarketDataError>;

    /// Returns today's regular trading session.
    ///
    /// # Errors
    ///
    /// Returns error if the provider is unreachable.
    async fn trading_hours(&self) -> Result<TradingHours, MarketDataError>;
}
