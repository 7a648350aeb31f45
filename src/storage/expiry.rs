//! Background Expiry Sweeper
//!
//! Lazy expiry only reclaims keys that somebody touches again. The sweeper is
//! a Tokio task that periodically calls [`StorageEngine::cleanup_expired`] so
//! abandoned keys do not pin memory forever.
//!
//! The interval adapts to the amount of garbage found: a sweep that removes a
//! large share of the keyspace halves the interval (down to `min_interval`),
//! a sweep that finds nothing doubles it (up to `max_interval`).

use crate::storage::StorageEngine;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

/// Configuration for the expiry sweeper.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpiryConfig {
    /// Interval of the first sweep (default: 100ms)
    pub base_interval: Duration,

    /// Lower bound for the adaptive interval (default: 10ms)
    pub min_interval: Duration,

    /// Upper bound for the adaptive interval (default: 1s)
    pub max_interval: Duration,

    /// Expired fraction above which the sweeper speeds up
    pub speedup_threshold: f64,

    /// Expired fraction below which an idle sweeper slows down
    pub slowdown_threshold: f64,
}

impl Default for ExpiryConfig {
    fn default() -> Self {
        Self {
            base_interval: Duration::from_millis(100),
            min_interval: Duration::from_millis(10),
            max_interval: Duration::from_secs(1),
            speedup_threshold: 0.25,
            slowdown_threshold: 0.01,
        }
    }
}

impl ExpiryConfig {
    /// Default thresholds around a custom starting interval.
    ///
    /// The bounds are widened if needed so `interval` lies inside them.
    pub fn with_interval(interval: Duration) -> Self {
        let defaults = Self::default();
        Self {
            base_interval: interval,
            min_interval: defaults.min_interval.min(interval),
            max_interval: defaults.max_interval.max(interval),
            ..defaults
        }
    }

    /// Picks the interval for the next sweep given the last sweep's result.
    fn next_interval(&self, current: Duration, expired: u64, scanned: usize) -> Duration {
        if scanned == 0 {
            return current;
        }

        let rate = expired as f64 / scanned as f64;
        if rate > self.speedup_threshold {
            (current / 2).max(self.min_interval)
        } else if expired == 0 && rate < self.slowdown_threshold {
            (current * 2).min(self.max_interval)
        } else {
            current
        }
    }
}

/// Handle to the running sweeper.
///
/// Dropping the handle signals the task to stop; [`ExpirySweeper::shutdown`]
/// also waits for it to finish.
#[derive(Debug)]
pub struct ExpirySweeper {
    shutdown_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl ExpirySweeper {
    /// Spawns the sweeper on the current Tokio runtime.
    ///
    /// # Example
    ///
    /// ```
    /// use redkv::storage::{ExpiryConfig, ExpirySweeper, StorageEngine};
    /// use std::sync::Arc;
    ///
    /// # #[tokio::main]
    /// # async fn main() {
    /// let engine = Arc::new(StorageEngine::new());
    /// let sweeper = ExpirySweeper::start(engine, ExpiryConfig::default());
    /// sweeper.shutdown().await;
    /// # }
    /// ```
    pub fn start(engine: Arc<StorageEngine>, config: ExpiryConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        info!(
            interval_ms = config.base_interval.as_millis() as u64,
            "Background expiry sweeper started"
        );
        let task = tokio::spawn(sweeper_loop(engine, config, shutdown_rx));

        Self {
            shutdown_tx,
            task: Some(task),
        }
    }

    /// Stops the sweeper and waits for the task to exit.
    pub async fn shutdown(mut self) {
        self.signal_stop();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        info!("Background expiry sweeper stopped");
    }

    fn signal_stop(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

impl Drop for ExpirySweeper {
    fn drop(&mut self) {
        self.signal_stop();
    }
}

async fn sweeper_loop(
    engine: Arc<StorageEngine>,
    config: ExpiryConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut interval = config.base_interval;

    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    debug!("Expiry sweeper received shutdown signal");
                    return;
                }
            }
        }

        let scanned = engine.len();
        let expired = engine.cleanup_expired();
        let next = config.next_interval(interval, expired, scanned);

        if expired > 0 {
            debug!(
                expired,
                keys_remaining = scanned.saturating_sub(expired as usize),
                next_interval_ms = next.as_millis() as u64,
                "Expired keys cleaned up"
            );
        } else if next != interval {
            trace!(next_interval_ms = next.as_millis() as u64, "Sweeper backing off");
        }

        interval = next;
    }
}
