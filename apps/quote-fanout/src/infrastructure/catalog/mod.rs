//! Quote Catalog and Oscillator
//!
//! `QuoteCatalog` is the server-side source of truth for every symbol's
//! current quote. `Oscillator` is the background task that perturbs a
//! random subset of symbols on a timer and fans the resulting snapshot out
//! to every subscribed WebSocket handler through its own bounded mpsc
//! channel. Each subscriber owns its own `last_quotes` view and diffs
//! independently in `infrastructure::websocket` — the oscillator only ever
//! publishes full snapshots, never pre-computed patches, so a slow or new
//! subscriber can always resync from scratch.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::RwLock;
use rand::seq::SliceRandom;
use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::quote::{default_symbol_seeds, AssetQuote};

/// A full point-in-time view of every symbol's quote.
pub type QuoteSnapshot = HashMap<String, AssetQuote>;

/// Capacity of each subscriber's mpsc channel. Sized to absorb a handful of
/// ticks of backpressure without unbounded memory growth; a subscriber that
/// falls behind this drops the oldest *queued* tick via `try_send` failing,
/// not the newest — see [`Oscillator::tick`].
pub const SUBSCRIBER_CHANNEL_CAPACITY: usize = 10;

/// Server-side catalog of every tracked symbol's quote, guarded by a single
/// reader-writer lock. Reads (snapshot) are far more frequent than writes
/// (oscillator ticks), which is exactly the access pattern `RwLock` favors.
#[derive(Debug)]
pub struct QuoteCatalog {
    quotes: RwLock<QuoteSnapshot>,
}

impl QuoteCatalog {
    /// Seed a catalog from `seeds`, each a `(symbol, base_price)` pair.
    #[must_use]
    pub fn new(seeds: impl IntoIterator<Item = (String, Decimal)>) -> Self {
        let now = Utc::now();
        let quotes = seeds
            .into_iter()
            .map(|(symbol, base_price)| {
                let quote = AssetQuote::new(symbol.clone(), base_price, now);
                (symbol, quote)
            })
            .collect();
        Self {
            quotes: RwLock::new(quotes),
        }
    }

    /// Seed a catalog from the built-in default symbol universe.
    #[must_use]
    pub fn with_default_symbols() -> Self {
        Self::new(
            default_symbol_seeds()
                .into_iter()
                .map(|(symbol, price)| (symbol.to_string(), price)),
        )
    }

    /// A full, consistent snapshot of every quote.
    #[must_use]
    pub fn snapshot(&self) -> QuoteSnapshot {
        self.quotes.read().clone()
    }

    /// Number of symbols tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.quotes.read().len()
    }

    /// Whether the catalog has no symbols.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.quotes.read().is_empty()
    }

    /// All tracked symbols.
    #[must_use]
    pub fn symbols(&self) -> Vec<String> {
        self.quotes.read().keys().cloned().collect()
    }

    fn oscillate_subset(&self, symbols: &[String], pct_range: Decimal) {
        let mut quotes = self.quotes.write();
        let now = Utc::now();
        for symbol in symbols {
            if let Some(quote) = quotes.get_mut(symbol) {
                let pct = random_signed_pct(pct_range);
                quote.oscillate(pct, now);
            }
        }
    }
}

impl Default for QuoteCatalog {
    fn default() -> Self {
        Self::with_default_symbols()
    }
}

fn random_signed_pct(magnitude: Decimal) -> Decimal {
    if rand::rng().random_bool(0.5) {
        magnitude
    } else {
        -magnitude
    }
}

/// Tunables for [`Oscillator`].
#[derive(Debug, Clone, Copy)]
pub struct OscillatorConfig {
    /// How often a tick perturbs a subset of symbols.
    pub tick_interval: Duration,
    /// How many symbols to perturb per tick.
    pub subset_size: usize,
    /// Perturbation magnitude applied to a symbol's `base_price`, e.g. `dec!(0.01)` for ±1%.
    pub perturbation_pct: Decimal,
}

impl Default for OscillatorConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(2),
            subset_size: 5,
            perturbation_pct: dec!(0.01),
        }
    }
}

/// A subscriber's inbound half: receives a full snapshot on every tick the
/// oscillator publishes, and once immediately on subscribe.
pub type SnapshotReceiver = mpsc::Receiver<QuoteSnapshot>;

/// Background task that perturbs a random subset of the catalog's symbols
/// on an interval and fans the resulting full snapshot out to every
/// subscriber. Subscribers that can't keep up simply miss a tick: this
/// deliberately uses `try_send` over a bounded channel rather than
/// `tokio::sync::broadcast`, because broadcast drops the *oldest* queued
/// message on lag, which for a snapshot feed means a subscriber could skip
/// straight past stale history anyway — there is no lost event to recover,
/// only a lost opportunity to coalesce, so drop-newest is the simpler and
/// equally correct choice here.
pub struct Oscillator {
    catalog: Arc<QuoteCatalog>,
    config: OscillatorConfig,
    subscribers: RwLock<Vec<mpsc::Sender<QuoteSnapshot>>>,
}

impl Oscillator {
    /// Build an oscillator over `catalog`.
    #[must_use]
    pub fn new(catalog: Arc<QuoteCatalog>, config: OscillatorConfig) -> Self {
        Self {
            catalog,
            config,
            subscribers: RwLock::new(Vec::new()),
        }
    }

    /// Subscribe to snapshot updates, returning the receiving half. The
    /// caller gets an immediate snapshot as the first item so a fresh
    /// WebSocket connection can build its initial patch without waiting
    /// for the next tick.
    pub fn subscribe(&self) -> SnapshotReceiver {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_CHANNEL_CAPACITY);
        let _ = tx.try_send(self.catalog.snapshot());
        self.subscribers.write().push(tx);
        rx
    }

    /// Current subscriber count, used by the autoscaler/health monitor as a
    /// proxy for active connections.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    fn tick(&self) {
        let symbols = self.catalog.symbols();
        if symbols.is_empty() {
            return;
        }
        let subset_size = self.config.subset_size.min(symbols.len());
        let mut rng = rand::rng();
        let chosen: Vec<String> = symbols
            .choose_multiple(&mut rng, subset_size)
            .cloned()
            .collect();

        self.catalog.oscillate_subset(&chosen, self.config.perturbation_pct);
        let snapshot = self.catalog.snapshot();

        let mut subscribers = self.subscribers.write();
        subscribers.retain(|tx| match tx.try_send(snapshot.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!("subscriber channel full, dropping this tick for it");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
    }

    /// Run the oscillator loop until `cancel` fires.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.tick_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!(interval_ms = self.config.tick_interval.as_millis(), "oscillator started");

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!("oscillator stopping");
                    break;
                }
                _ = ticker.tick() => {
                    self.tick();
                }
            }
        }
    }
}
