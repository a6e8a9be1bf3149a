//! Autoscaler
//!
//! Samples the connection pool's load on an interval, evaluates a scaling
//! decision via [`domain::autoscale::evaluate`], and applies it through a
//! [`ScalingPort`]. Enforces the cooldown itself so the decision function
//! only ever needs a correct `since_last_scaling` value.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::application::ports::{PoolObserverPort, ScalingPort};
use crate::domain::autoscale::{evaluate, AutoscaleConfig, ScalingDecision};

/// Tunables for [`run`].
#[derive(Debug, Clone, Copy)]
pub struct AutoscalerConfig {
    /// How often to sample load and re-evaluate.
    pub interval: Duration,
    /// Thresholds and gates passed through to [`evaluate`].
    pub autoscale: AutoscaleConfig,
}

impl Default for AutoscalerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(15),
            autoscale: AutoscaleConfig::default(),
        }
    }
}

/// Run the autoscaling loop until `cancel` fires.
pub async fn run(
    observer: Arc<dyn PoolObserverPort>,
    scaler: Arc<dyn ScalingPort>,
    config: AutoscalerConfig,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let last_scale_event = Mutex::new(Instant::now() - config.autoscale.cooldown);

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                info!("autoscaler stopping");
                break;
            }
            _ = ticker.tick() => {
                let mut sample = observer.load_sample().await;
                sample.since_last_scaling = last_scale_event.lock().elapsed();

                let decision = evaluate(sample, config.autoscale);
                if decision != ScalingDecision::Hold {
                    warn!(?decision, "autoscaler applying decision");
                    scaler.apply(decision).await;
                    *last_scale_event.lock() = Instant::now();
                }
            }
        }
    }
}
