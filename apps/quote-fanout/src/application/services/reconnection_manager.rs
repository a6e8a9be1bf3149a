//! Reconnection Manager
//!
//! Owns a priority queue of pending reconnection attempts and a per-
//! connection [`ReconnectionPolicy`], and drives both from a single
//! interval-driven task. Call [`ReconnectionManager::schedule`] whenever a
//! connection drops; [`ReconnectionManager::run`] drains due attempts and
//! calls back through a [`ReconnectionPort`].

use std::collections::{BinaryHeap, HashMap};
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::application::ports::ReconnectionPort;
use crate::domain::connection::ConnectionId;
use crate::domain::reconnection::{
    ReconnectionAttempt, ReconnectionConfig, ReconnectionMetrics, ReconnectionPolicy,
    ReconnectionPriority,
};

struct QueuedAttempt {
    ready_at: Instant,
    attempt: ReconnectionAttempt,
}

impl PartialEq for QueuedAttempt {
    fn eq(&self, other: &Self) -> bool {
        self.ready_at == other.ready_at
    }
}
impl Eq for QueuedAttempt {}

impl PartialOrd for QueuedAttempt {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedAttempt {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; we want the earliest-ready item on top,
        // so reverse the instant comparison.
        other.ready_at.cmp(&self.ready_at)
    }
}

/// Coordinates reconnection attempts for dropped connections.
pub struct ReconnectionManager<R: ReconnectionPort> {
    port: Arc<R>,
    default_config: ReconnectionConfig,
    policies: Mutex<HashMap<ConnectionId, ReconnectionPolicy>>,
    queue: Mutex<BinaryHeap<QueuedAttempt>>,
    metrics: Mutex<ReconnectionMetrics>,
}

impl<R: ReconnectionPort + 'static> ReconnectionManager<R> {
    /// Build a manager backed by `port`, using `default_config` for any
    /// connection that has no existing policy.
    #[must_use]
    pub fn new(port: Arc<R>, default_config: ReconnectionConfig) -> Self {
        Self {
            port,
            default_config,
            policies: Mutex::new(HashMap::new()),
            queue: Mutex::new(BinaryHeap::new()),
            metrics: Mutex::new(ReconnectionMetrics::default()),
        }
    }

    /// Schedule a reconnection attempt for `connection_id`. Does nothing if
    /// that connection's attempt budget is already exhausted.
    pub fn schedule(&self, connection_id: ConnectionId, priority: ReconnectionPriority) {
        let mut policies = self.policies.lock();
        let policy = policies
            .entry(connection_id)
            .or_insert_with(|| ReconnectionPolicy::new(self.default_config.clone()));

        let Some(delay) = policy.next_delay() else {
            warn!(%connection_id, "reconnection budget exhausted, giving up");
            policies.remove(&connection_id);
            return;
        };

        let attempt = ReconnectionAttempt {
            connection_id,
            priority,
            attempt_number: policy.attempts_made(),
        };
        self.queue.lock().push(QueuedAttempt {
            ready_at: Instant::now() + delay,
            attempt,
        });
    }

    /// Current metrics snapshot.
    #[must_use]
    pub fn metrics(&self) -> ReconnectionMetrics {
        let mut snapshot = *self.metrics.lock();
        snapshot.queue_size = self.queue.lock().len();
        snapshot
    }

    async fn drain_due(&self) {
        loop {
            let due = {
                let mut queue = self.queue.lock();
                match queue.peek() {
                    Some(top) if top.ready_at <= Instant::now() => queue.pop(),
                    _ => None,
                }
            };
            let Some(queued) = due else { break };

            let started = Instant::now();
            let succeeded = self.port.attempt(queued.attempt.connection_id).await;
            self.metrics.lock().record(succeeded, started.elapsed());

            if succeeded {
                self.policies.lock().remove(&queued.attempt.connection_id);
                info!(connection_id = %queued.attempt.connection_id, "reconnection succeeded");
            } else {
                self.schedule(queued.attempt.connection_id, queued.attempt.priority);
            }
        }
    }

    /// Run the drain loop on `tick` until `cancel` fires.
    pub async fn run(self: Arc<Self>, tick: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!("reconnection manager stopping");
                    break;
                }
                _ = ticker.tick() => {
                    self.drain_due().await;
                }
            }
        }
    }
}
