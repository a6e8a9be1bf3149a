//! Worker Manager: scales and supervises the process-order worker pool.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::domain::shared::WorkerId;

use crate::application::ports::{MessageBusPort, MessageHandler};

/// Health classification for a single worker, mirroring the lifecycle
/// described for worker state in the overview.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerHealth {
    Starting,
    Healthy,
    Degraded,
    Unhealthy,
    Stopping,
    Stopped,
}

/// Scaling and heartbeat configuration for a [`WorkerPoolManager`].
#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    pub min_workers: usize,
    pub max_workers: usize,
    pub scale_up_threshold: f64,
    pub scale_up_cooldown: Duration,
    pub scale_down_threshold: f64,
    pub heartbeat_interval: Duration,
    pub consumer_prefetch: u16,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            min_workers: 2,
            max_workers: 8,
            scale_up_threshold: 0.8,
            scale_up_cooldown: Duration::from_secs(30),
            scale_down_threshold: 0.2,
            heartbeat_interval: Duration::from_secs(10),
            consumer_prefetch: 1,
        }
    }
}

/// Aggregate counters exposed for metrics scraping.
#[derive(Debug, Default)]
pub struct WorkerPoolMetrics {
    pub processed: AtomicU64,
    pub successful: AtomicU64,
    pub failed: AtomicU64,
}

struct ManagedWorker {
    id: WorkerId,
    health: WorkerHealth,
    consecutive_missed_heartbeats: u32,
    last_heartbeat: Instant,
    cancellation: CancellationToken,
    handle: JoinHandle<()>,
}

/// A factory building a fresh [`MessageHandler`] for a given worker id.
/// Boxed so the manager stays free of the handler's own generic bounds.
pub type HandlerFactory = Arc<dyn Fn(WorkerId) -> Arc<dyn MessageHandler> + Send + Sync>;

/// Maintains `[MinWorkers, MaxWorkers]` consumers of `orders.processing`,
/// scaling on backlog pressure and replacing workers whose heartbeats
/// lapse three times in a row.
pub struct WorkerPoolManager<B: MessageBusPort + 'static> {
    config: WorkerPoolConfig,
    queue: String,
    bus: Arc<B>,
    handler_factory: HandlerFactory,
    workers: RwLock<Vec<ManagedWorker>>,
    next_worker_seq: AtomicU32,
    last_scale_event: RwLock<Instant>,
    metrics: Arc<WorkerPoolMetrics>,
}

impl<B: MessageBusPort + 'static> WorkerPoolManager<B> {
    /// Builds a manager bound to `queue`, starting with `min_workers`
    /// consumers already spawned.
    pub async fn start(
        config: WorkerPoolConfig,
        queue: impl Into<String>,
        bus: Arc<B>,
        handler_factory: HandlerFactory,
    ) -> Self {
        let initial_last_scale = Instant::now()
            .checked_sub(config.scale_up_cooldown)
            .unwrap_or_else(Instant::now);
        let manager = Self {
            config,
            queue: queue.into(),
            bus,
            handler_factory,
            workers: RwLock::new(Vec::new()),
            next_worker_seq: AtomicU32::new(0),
            last_scale_event: RwLock::new(initial_last_scale),
            metrics: Arc::new(WorkerPoolMetrics::default()),
        };

        for _ in 0..manager.config.min_workers {
            manager.spawn_worker().await;
        }
        manager
    }

    /// Aggregate metrics handle, shared with the metrics exporter.
    #[must_use]
    pub fn metrics(&self) -> Arc<WorkerPoolMetrics> {
        self.metrics.clone()
    }

    async fn spawn_worker(&self) {
        let seq = self.next_worker_seq.fetch_add(1, Ordering::SeqCst);
        let worker_id = WorkerId::new(format!("order-worker-{seq}"));
        let handler = (self.handler_factory)(worker_id.clone());
        let cancellation = CancellationToken::new();
        let bus = self.bus.clone();
        let queue = self.queue.clone();
        let prefetch = self.config.consumer_prefetch;

        let task_token = cancellation.clone();
        let task_worker_id = worker_id.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                () = task_token.cancelled() => {
                    info!(worker = %task_worker_id.as_str(), "worker cancelled before consume loop exited");
                }
                result = bus.consume(&queue, prefetch, handler) => {
                    if let Err(err) = result {
                        warn!(worker = %task_worker_id.as_str(), error = %err, "consumer loop exited with error");
                    }
                }
            }
        });

        self.workers.write().await.push(ManagedWorker {
            id: worker_id,
            health: WorkerHealth::Starting,
            consecutive_missed_heartbeats: 0,
            last_heartbeat: Instant::now(),
            cancellation,
            handle,
        });
    }

    /// Records a heartbeat success or failure for `worker_id`, updating
    /// its health classification. Call this from a periodic monitor tied
    /// to `heartbeat_interval`.
    pub async fn record_heartbeat(&self, worker_id: &WorkerId, succeeded: bool) {
        let mut workers = self.workers.write().await;
        let Some(worker) = workers.iter_mut().find(|w| w.id.as_str() == worker_id.as_str()) else {
            return;
        };

        if succeeded {
            worker.consecutive_missed_heartbeats = 0;
            worker.last_heartbeat = Instant::now();
            worker.health = WorkerHealth::Healthy;
        } else {
            worker.consecutive_missed_heartbeats += 1;
            worker.health = if worker.consecutive_missed_heartbeats >= 3 {
                WorkerHealth::Unhealthy
            } else {
                WorkerHealth::Degraded
            };
        }
    }

    /// Replaces any worker currently classified `Unhealthy` with a fresh
    /// one, cancelling its task first.
    pub async fn replace_unhealthy_workers(&self) {
        let stale: Vec<WorkerId> = {
            let workers = self.workers.read().await;
            workers
                .iter()
                .filter(|w| w.health == WorkerHealth::Unhealthy)
                .map(|w| w.id.clone())
                .collect()
        };

        for worker_id in stale {
            self.retire_worker(&worker_id).await;
            self.spawn_worker().await;
            warn!(worker = %worker_id.as_str(), "replaced unhealthy worker");
        }
    }

    async fn retire_worker(&self, worker_id: &WorkerId) {
        let mut workers = self.workers.write().await;
        if let Some(pos) = workers.iter().position(|w| w.id.as_str() == worker_id.as_str()) {
            let worker = workers.remove(pos);
            worker.cancellation.cancel();
            worker.handle.abort();
        }
    }

    /// Evaluates `backlog_ratio` (consumer queue depth / expected
    /// throughput) against the configured thresholds and scales the
    /// pool by one worker if warranted and the cooldown has elapsed.
    pub async fn evaluate_scaling(&self, backlog_ratio: f64) {
        let worker_count = self.workers.read().await.len();

        let mut last_scale = self.last_scale_event.write().await;
        if last_scale.elapsed() < self.config.scale_up_cooldown {
            return;
        }

        if backlog_ratio > self.config.scale_up_threshold && worker_count < self.config.max_workers {
            drop(last_scale);
            self.spawn_worker().await;
            *self.last_scale_event.write().await = Instant::now();
            info!(workers = worker_count + 1, backlog_ratio, "scaled worker pool up");
        } else if backlog_ratio < self.config.scale_down_threshold && worker_count > self.config.min_workers {
            let victim = self.workers.read().await.last().map(|w| w.id.clone());
            drop(last_scale);
            if let Some(victim) = victim {
                self.retire_worker(&victim).await;
                *self.last_scale_event.write().await = Instant::now();
                info!(workers = worker_count - 1, backlog_ratio, "scaled worker pool down");
            }
        }
    }

    /// Current worker count.
    pub async fn worker_count(&self) -> usize {
        self.workers.read().await.len()
    }

    /// Cancels every worker and awaits their tasks, draining in-flight
    /// work up to `shutdown_timeout` before hard-aborting stragglers.
    pub async fn shutdown(&self, shutdown_timeout: Duration) {
        let mut workers = self.workers.write().await;
        for worker in workers.iter_mut() {
            worker.health = WorkerHealth::Stopping;
            worker.cancellation.cancel();
        }

        for worker in workers.drain(..) {
            if tokio::time::timeout(shutdown_timeout, worker.handle).await.is_err() {
                warn!(worker = %worker.id.as_str(), "worker did not stop within shutdown timeout");
            }
        }
    }
}
