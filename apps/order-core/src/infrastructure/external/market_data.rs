//! Simulated market-data provider.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Timelike, Utc};
use rust_decimal::Decimal;

use crate::application::ports::{AssetDetails, IMarketDataClient, MarketDataError, TradingHours};
use crate::domain::shared::{Money, Symbol};

/// Derives a stable base price in `[1, 1000)` from a symbol's bytes so
/// repeated calls for the same symbol are self-consistent.
fn base_price_for(symbol: &Symbol) -> Decimal {
    let mut hasher = DefaultHasher::new();
    symbol.as_str().hash(&mut hasher);
    let bucket = hasher.finish() % 99_900;
    Decimal::new(100_000 + i64::try_from(bucket).unwrap_or(0), 2)
}

/// Market-data client backed by deterministic per-symbol pricing rather
/// than a live feed. Useful for local development and the reference
/// binary; swap for a real vendor adapter in production.
#[derive(Debug, Clone, Default)]
pub struct SimulatedMarketDataClient;

impl SimulatedMarketDataClient {
    /// Creates a new simulated client.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl IMarketDataClient for SimulatedMarketDataClient {
    async fn validate_symbol(&self, symbol: &Symbol) -> Result<bool, MarketDataError> {
        Ok(!symbol.as_str().is_empty())
    }

    async fn current_price(&self, symbol: &Symbol) -> Result<Money, MarketDataError> {
        Ok(Money::new(base_price_for(symbol)))
    }

    async fn is_market_open(&self) -> Result<bool, MarketDataError> {
        let hour = Utc::now().hour();
        Ok((13..20).contains(&hour))
    }

    async fn asset_details(&self, symbol: &Symbol) -> Result<AssetDetails, MarketDataError> {
        Ok(AssetDetails {
            symbol: symbol.clone(),
            tradeable: true,
            name: format!("{} Simulated Instrument", symbol.as_str()),
        })
    }

    async fn trading_hours(&self) -> Result<TradingHours, MarketDataError> {
        let now = Utc::now();
        let open = now
            .date_naive()
            .and_hms_opt(13, 30, 0)
            .map_or(now, |naive| naive.and_utc());
        Ok(TradingHours {
            open,
            close: open + ChronoDuration::hours(6) + ChronoDuration::minutes(30),
        })
    }
}
