//! Health Monitor
//!
//! Samples the connection pool on an interval, classifies it via
//! [`domain::health::classify`], and republishes the result through a
//! caller-supplied sink (typically a metrics gauge plus the `/healthz`
//! state the HTTP health server reads).

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::application::ports::PoolObserverPort;
use crate::domain::health::{classify, HealthStatus, HealthThresholds};

/// Tunables for [`run`].
#[derive(Debug, Clone, Copy)]
pub struct HealthMonitorConfig {
    /// How often to sample the pool.
    pub interval: Duration,
    /// Thresholds passed through to [`classify`].
    pub thresholds: HealthThresholds,
}

impl Default for HealthMonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            thresholds: HealthThresholds::default(),
        }
    }
}

/// Run the health-sampling loop until `cancel` fires. `on_status` is
/// invoked with every newly computed status, including repeats — the
/// caller decides whether a transition is log-worthy.
pub async fn run(
    observer: Arc<dyn PoolObserverPort>,
    config: HealthMonitorConfig,
    on_status: impl Fn(HealthStatus) + Send + Sync + 'static,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                info!("health monitor stopping");
                break;
            }
            _ = ticker.tick() => {
                let snapshot = observer.health_snapshot().await;
                let status = classify(snapshot, config.thresholds);
                debug!(status = status.as_str(), "health sample");
                on_status(status);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::MockPoolObserverPort;
    use crate::domain::autoscale::LoadSample;
    use crate::domain::health::PoolSnapshot;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration as StdDuration;

    #[tokio::test]
    async fn reports_status_on_each_tick() {
        let mut mock = MockPoolObserverPort::new();
        mock.expect_health_snapshot().returning(|| {
            PoolSnapshot {
                active_connections: 0,
                capacity: 10,
                sends_attempted: 0,
                sends_failed: 0,
            }
        });
        mock.expect_load_sample().returning(|| LoadSample {
            active_connections: 0,
            current_workers: 1,
            connections_per_worker: 10,
            cpu_utilization: 0.0,
            memory_utilization: 0.0,
            since_last_scaling: StdDuration::from_secs(60),
        });

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let cancel = CancellationToken::new();
        let cancel_clone = cancel.clone();

        let config = HealthMonitorConfig {
            interval: Duration::from_millis(5),
            thresholds: HealthThresholds::default(),
        };

        let handle = tokio::spawn(run(
            Arc::new(mock),
            config,
            move |status| {
                assert_eq!(status, HealthStatus::Healthy);
                calls_clone.fetch_add(1, Ordering::Relaxed);
            },
            cancel_clone,
        ));

        tokio::time::sleep(Duration::from_millis(30)).await;
        cancel.cancel();
        handle.await.unwrap();

        assert!(calls.load(Ordering::Relaxed) >= 1);
    }
}
