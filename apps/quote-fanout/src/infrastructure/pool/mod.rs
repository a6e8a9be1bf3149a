//! Connection Pool
//!
//! Tracks every live WebSocket connection's [`PooledConnection`] record
//! behind a single `parking_lot::RwLock`, ages out idle/failed connections
//! on an interval, and implements the [`PoolObserverPort`], [`ScalingPort`],
//! and [`ReconnectionPort`] the health monitor, autoscaler, and reconnection
//! manager depend on.
//!
//! There is no separate OS-level worker pool in this service — every
//! connection is handled by its own lightweight tokio task multiplexed on
//! the shared runtime — so "scaling the worker pool" here means adjusting
//! `capacity`, the soft ceiling on concurrent connections the pool accepts.
//! Crossing that ceiling fails new upgrade attempts with 503 rather than
//! letting the pool grow unbounded.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::application::ports::{PoolObserverPort, ReconnectionPort, ScalingPort};
use crate::domain::autoscale::{LoadSample, ScalingDecision};
use crate::domain::circuit_breaker::CircuitBreakerConfig;
use crate::domain::connection::{ClientInfo, ConnectionId, PooledConnection};
use crate::domain::health::PoolSnapshot;

/// Tunables for pool maintenance and capacity.
#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    /// Initial soft connection ceiling; adjusted by the autoscaler thereafter.
    pub initial_capacity: u32,
    /// Connections a single worker unit is assumed able to serve (used to translate
    /// worker-count scaling decisions into a connection capacity delta).
    pub connections_per_worker: u32,
    /// How often the maintenance sweep runs.
    pub maintenance_interval: Duration,
    /// A connection idle longer than this is eligible for reaping.
    pub idle_timeout: chrono::Duration,
    /// A connection older than this is eligible for reaping regardless of activity.
    pub max_connection_age: chrono::Duration,
    /// A connection with more failures than this is eligible for reaping.
    pub max_failures: u32,
    /// Circuit breaker config applied to every new connection.
    pub breaker: CircuitBreakerConfig,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 100,
            connections_per_worker: 10,
            maintenance_interval: Duration::from_secs(30),
            idle_timeout: chrono::Duration::seconds(60),
            max_connection_age: chrono::Duration::hours(24),
            max_failures: 20,
            breaker: CircuitBreakerConfig::default(),
        }
    }
}

/// Aggregate counters fed by every connection's send path, read by
/// [`PoolObserverPort::health_snapshot`].
#[derive(Debug, Default)]
struct PoolCounters {
    sends_attempted: AtomicU64,
    sends_failed: AtomicU64,
}

/// Pool of live WebSocket connections plus the capacity the autoscaler tunes.
pub struct ConnectionPool {
    connections: RwLock<HashMap<ConnectionId, Arc<PooledConnection>>>,
    capacity: AtomicU32,
    config: PoolConfig,
    counters: PoolCounters,
}

impl ConnectionPool {
    /// Build an empty pool.
    #[must_use]
    pub fn new(config: PoolConfig) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            capacity: AtomicU32::new(config.initial_capacity),
            config,
            counters: PoolCounters::default(),
        }
    }

    /// Current soft connection ceiling.
    #[must_use]
    pub fn capacity(&self) -> u32 {
        self.capacity.load(Ordering::Relaxed)
    }

    /// Number of connections currently tracked (active or not yet reaped).
    #[must_use]
    pub fn len(&self) -> usize {
        self.connections.read().len()
    }

    /// Whether the pool has no tracked connections.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections.read().is_empty()
    }

    /// Whether a new connection would exceed capacity right now.
    #[must_use]
    pub fn has_room(&self) -> bool {
        (self.len() as u32) < self.capacity()
    }

    /// Register a new connection and return its shared handle.
    #[must_use]
    pub fn insert(&self, client_info: ClientInfo) -> Arc<PooledConnection> {
        let conn = Arc::new(PooledConnection::new(client_info, self.config.breaker, Utc::now()));
        self.connections.write().insert(conn.id(), conn.clone());
        conn
    }

    /// Look up a connection by id.
    #[must_use]
    pub fn get(&self, id: ConnectionId) -> Option<Arc<PooledConnection>> {
        self.connections.read().get(&id).cloned()
    }

    /// Remove a connection outright (e.g. once its handler task exits).
    pub fn remove(&self, id: ConnectionId) {
        self.connections.write().remove(&id);
    }

    /// Record the outcome of a send attempt against pool-wide counters, in
    /// addition to whatever the connection's own circuit breaker tracks.
    pub fn record_send(&self, succeeded: bool) {
        self.counters.sends_attempted.fetch_add(1, Ordering::Relaxed);
        if !succeeded {
            self.counters.sends_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Broadcast an arbitrary pre-serialized message to every connection
    /// whose circuit breaker currently permits a send. `send` performs the
    /// actual write and reports success back so the pool can update both
    /// the connection's and the pool's failure counters. This is a general
    /// operational capability (e.g. admin notices); the oscillator's hot
    /// path does not go through it; see the oscillator's own per-connection
    /// subscription channels in `infrastructure::catalog`.
    pub async fn broadcast<F, Fut>(&self, send: F)
    where
        F: Fn(Arc<PooledConnection>) -> Fut,
        Fut: std::future::Future<Output = bool>,
    {
        let targets: Vec<Arc<PooledConnection>> = self
            .connections
            .read()
            .values()
            .filter(|c| c.is_active() && c.circuit_breaker().is_call_permitted())
            .cloned()
            .collect();

        for conn in targets {
            let succeeded = send(conn.clone()).await;
            self.record_send(succeeded);
            if succeeded {
                conn.record_success();
            } else {
                conn.record_failure();
            }
        }
    }

    /// Ids of connections still tracked as active whose circuit breaker has
    /// tripped. Used to seed the reconnection manager: a tripped breaker
    /// does not itself close the socket, so these connections are the ones
    /// worth retrying once the breaker's recovery timeout has passed.
    #[must_use]
    pub fn tripped_connections(&self) -> Vec<ConnectionId> {
        self.connections
            .read()
            .values()
            .filter(|c| c.is_active() && !c.circuit_breaker().is_call_permitted())
            .map(|c| c.id())
            .collect()
    }

    /// Remove every connection that is inactive or stale per [`PoolConfig`].
    pub fn reap_stale(&self) -> usize {
        let now = Utc::now();
        let config = self.config;
        let mut connections = self.connections.write();
        let before = connections.len();
        connections.retain(|_, conn| {
            conn.is_active()
                && !conn.is_stale(now, config.idle_timeout, config.max_connection_age, config.max_failures)
        });
        before - connections.len()
    }

    /// Run the maintenance sweep loop until `cancel` fires.
    pub async fn run_maintenance(self: Arc<Self>, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.maintenance_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!("pool maintenance stopping");
                    break;
                }
                _ = ticker.tick() => {
                    let reaped = self.reap_stale();
                    if reaped > 0 {
                        warn!(reaped, "pool maintenance reaped stale connections");
                    }
                }
            }
        }
    }
}

#[async_trait]
impl PoolObserverPort for ConnectionPool {
    async fn health_snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            active_connections: self.len() as u32,
            capacity: self.capacity(),
            sends_attempted: self.counters.sends_attempted.load(Ordering::Relaxed),
            sends_failed: self.counters.sends_failed.load(Ordering::Relaxed),
        }
    }

    async fn load_sample(&self) -> LoadSample {
        let capacity = self.capacity();
        let per_worker = self.config.connections_per_worker.max(1);
        LoadSample {
            active_connections: self.len() as u32,
            current_workers: (capacity / per_worker).max(1),
            connections_per_worker: per_worker,
            cpu_utilization: 0.0,
            memory_utilization: 0.0,
            since_last_scaling: Duration::ZERO,
        }
    }
}

#[async_trait]
impl ScalingPort for ConnectionPool {
    async fn apply(&self, decision: ScalingDecision) {
        let per_worker = self.config.connections_per_worker.max(1);
        match decision {
            ScalingDecision::ScaleUp => {
                self.capacity.fetch_add(per_worker, Ordering::Relaxed);
            }
            ScalingDecision::ScaleDown => {
                self.capacity
                    .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |c| {
                        Some(c.saturating_sub(per_worker).max(per_worker))
                    })
                    .ok();
            }
            ScalingDecision::Hold => {}
        }
    }
}

/// `attempt` probes whether a tripped connection's circuit breaker has
/// recovered enough to permit calls again. There is no outbound dial here —
/// clients connect to us, so "reconnecting" a still-open socket means
/// letting its breaker half-open and resume sends; a connection the pool no
/// longer tracks has nothing left to retry and counts as done.
#[async_trait]
impl ReconnectionPort for ConnectionPool {
    async fn attempt(&self, connection_id: ConnectionId) -> bool {
        match self.get(connection_id) {
            Some(conn) => conn.circuit_breaker().is_call_permitted(),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_get_round_trips() {
        let pool = ConnectionPool::new(PoolConfig::default());
        let conn = pool.insert(ClientInfo::default());
        assert!(pool.get(conn.id()).is_some());
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn has_room_respects_capacity() {
        let pool = ConnectionPool::new(PoolConfig {
            initial_capacity: 1,
            ..Default::default()
        });
        assert!(pool.has_room());
        pool.insert(ClientInfo::default());
        assert!(!pool.has_room());
    }

    #[test]
    fn reap_stale_removes_inactive_connections() {
        let pool = ConnectionPool::new(PoolConfig::default());
        let conn = pool.insert(ClientInfo::default());
        conn.deactivate();
        assert_eq!(pool.reap_stale(), 1);
        assert_eq!(pool.len(), 0);
    }

    #[tokio::test]
    async fn scale_up_increases_capacity() {
        let pool = ConnectionPool::new(PoolConfig {
            initial_capacity: 10,
            connections_per_worker: 10,
            ..Default::default()
        });
        pool.apply(ScalingDecision::ScaleUp).await;
        assert_eq!(pool.capacity(), 20);
    }

    #[tokio::test]
    async fn scale_down_never_drops_below_one_worker_unit() {
        let pool = ConnectionPool::new(PoolConfig {
            initial_capacity: 10,
            connections_per_worker: 10,
            ..Default::default()
        });
        pool.apply(ScalingDecision::ScaleDown).await;
        assert_eq!(pool.capacity(), 10);
    }

    #[tokio::test]
    async fn reconnection_attempt_reflects_breaker_state() {
        let pool = ConnectionPool::new(PoolConfig::default());
        let conn = pool.insert(ClientInfo::default());
        assert!(pool.attempt(conn.id()).await);

        for _ in 0..10 {
            conn.record_failure();
        }
        assert!(pool.tripped_connections().contains(&conn.id()));
        assert!(!pool.attempt(conn.id()).await);
    }

    #[tokio::test]
    async fn reconnection_attempt_on_unknown_connection_succeeds() {
        let pool = ConnectionPool::new(PoolConfig::default());
        assert!(pool.attempt(ConnectionId::new()).await);
    }

    #[tokio::test]
    async fn broadcast_skips_connections_with_open_breaker() {
        let pool = ConnectionPool::new(PoolConfig::default());
        let healthy = pool.insert(ClientInfo::default());
        let broken = pool.insert(ClientInfo::default());
        for _ in 0..10 {
            broken.record_failure();
        }

        let sent_to = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let sent_to_clone = sent_to.clone();
        pool.broadcast(move |conn| {
            let sent_to = sent_to_clone.clone();
            async move {
                sent_to.lock().unwrap().push(conn.id());
                true
            }
        })
        .await;

        let sent_to = sent_to.lock().unwrap();
        assert!(sent_to.contains(&healthy.id()));
        assert!(!sent_to.contains(&broken.id()));
    }
}
