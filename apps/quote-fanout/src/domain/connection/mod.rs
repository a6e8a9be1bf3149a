//! Pooled Connection Entity
//!
//! A `PooledConnection` is the pool's bookkeeping record for one live
//! WebSocket: identity, timestamps, failure count, and the client metadata
//! captured at upgrade time. It owns no I/O handle — the actual socket
//! lives in the task spawned by `infrastructure::websocket`; the pool keeps
//! only what it needs to report metrics, age out idle sockets, and guard
//! sends through the connection's own circuit breaker.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

use crate::domain::circuit_breaker::{CircuitBreakerConfig, ConnectionCircuitBreaker};

/// Unique identifier for a pooled connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Mint a fresh random id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Metadata captured from the HTTP upgrade request.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    /// Remote peer address, if known.
    pub ip: Option<String>,
    /// `User-Agent` header value.
    pub user_agent: Option<String>,
    /// Authenticated user id (from the verified bearer token).
    pub user_id: Option<String>,
    /// Opaque session identifier, if the auth layer issues one.
    pub session: Option<String>,
}

/// Bookkeeping record for one pooled WebSocket connection.
#[derive(Debug)]
pub struct PooledConnection {
    id: ConnectionId,
    created_at: DateTime<Utc>,
    last_activity: Mutex<DateTime<Utc>>,
    active: std::sync::atomic::AtomicBool,
    failure_count: std::sync::atomic::AtomicU32,
    client_info: ClientInfo,
    circuit_breaker: ConnectionCircuitBreaker,
}

impl PooledConnection {
    /// Create a new connection record, active as of `now`.
    #[must_use]
    pub fn new(client_info: ClientInfo, breaker_config: CircuitBreakerConfig, now: DateTime<Utc>) -> Self {
        Self {
            id: ConnectionId::new(),
            created_at: now,
            last_activity: Mutex::new(now),
            active: std::sync::atomic::AtomicBool::new(true),
            failure_count: std::sync::atomic::AtomicU32::new(0),
            client_info,
            circuit_breaker: ConnectionCircuitBreaker::new(breaker_config),
        }
    }

    /// The connection's id.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// When this connection was accepted.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// When this connection last sent or received anything.
    #[must_use]
    pub fn last_activity(&self) -> DateTime<Utc> {
        *self.last_activity.lock()
    }

    /// Stamp the connection as active right now.
    pub fn touch(&self, now: DateTime<Utc>) {
        *self.last_activity.lock() = now;
    }

    /// Whether the connection is still considered live.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(std::sync::atomic::Ordering::Relaxed)
    }

    /// Mark the connection as closed; the pool will reap it on the next
    /// maintenance pass.
    pub fn deactivate(&self) {
        self.active.store(false, std::sync::atomic::Ordering::Relaxed);
    }

    /// Total failed sends recorded against this connection.
    #[must_use]
    pub fn failure_count(&self) -> u32 {
        self.failure_count.load(std::sync::atomic::Ordering::Relaxed)
    }

    /// Record a failed send; also feeds the circuit breaker.
    pub fn record_failure(&self) {
        self.failure_count.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        self.circuit_breaker.record_failure();
    }

    /// Record a successful send; also feeds the circuit breaker.
    pub fn record_success(&self) {
        self.circuit_breaker.record_success();
    }

    /// This connection's circuit breaker.
    #[must_use]
    pub const fn circuit_breaker(&self) -> &ConnectionCircuitBreaker {
        &self.circuit_breaker
    }

    /// Client metadata captured at upgrade time.
    #[must_use]
    pub const fn client_info(&self) -> &ClientInfo {
        &self.client_info
    }

    /// Whether this connection has been idle (no activity) longer than
    /// `idle_timeout`, or has lived longer than `max_idle_time` outright, or
    /// has exceeded `max_failures` — any of which makes it eligible for
    /// maintenance cleanup.
    #[must_use]
    pub fn is_stale(
        &self,
        now: DateTime<Utc>,
        idle_timeout: chrono::Duration,
        max_idle_time: chrono::Duration,
        max_failures: u32,
    ) -> bool {
        let idle_for = now - self.last_activity();
        let age = now - self.created_at;
        idle_for > idle_timeout || age > max_idle_time || self.failure_count() > max_failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn() -> PooledConnection {
        PooledConnection::new(ClientInfo::default(), CircuitBreakerConfig::default(), Utc::now())
    }

    #[test]
    fn new_connection_is_active_with_zero_failures() {
        let c = conn();
        assert!(c.is_active());
        assert_eq!(c.failure_count(), 0);
    }

    #[test]
    fn deactivate_flips_active_flag() {
        let c = conn();
        c.deactivate();
        assert!(!c.is_active());
    }

    #[test]
    fn record_failure_increments_count_and_feeds_breaker() {
        let c = PooledConnection::new(
            ClientInfo::default(),
            CircuitBreakerConfig {
                failure_threshold: 1,
                ..Default::default()
            },
            Utc::now(),
        );
        c.record_failure();
        assert_eq!(c.failure_count(), 1);
        assert!(!c.circuit_breaker().is_call_permitted());
    }

    #[test]
    fn is_stale_when_idle_too_long() {
        let past = Utc::now() - chrono::Duration::hours(1);
        let c = PooledConnection::new(ClientInfo::default(), CircuitBreakerConfig::default(), past);
        assert!(c.is_stale(
            Utc::now(),
            chrono::Duration::seconds(30),
            chrono::Duration::hours(24),
            1000
        ));
    }

    #[test]
    fn is_stale_false_for_fresh_connection() {
        let c = conn();
        assert!(!c.is_stale(
            Utc::now(),
            chrono::Duration::seconds(30),
            chrono::Duration::hours(24),
            1000
        ));
    }

    #[test]
    fn connection_ids_are_unique() {
        assert_ne!(ConnectionId::new(), ConnectionId::new());
    }
}
