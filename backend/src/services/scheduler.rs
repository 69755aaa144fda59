//! Periodic alert batches

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::services::alert_runner::AlertRunner;

/// Run a batch every `interval` until `shutdown` flips to true
///
/// The same receiver is handed to each batch so shutdown also cancels the
/// batch in flight.
pub async fn run_scheduler(
    runner: Arc<AlertRunner>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!("Alert scheduler running every {}s", interval.as_secs());

    loop {
        tokio::select! {
            biased;
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                match runner.run_batch(Utc::now(), shutdown.clone()).await {
                    Ok(summary) => tracing::debug!(
                        "Scheduled batch: {} decisions, {} fired",
                        summary.decisions.len(),
                        summary.fired_count()
                    ),
                    Err(e) => tracing::warn!("Scheduled alert batch failed: {}", e),
                }
            }
        }
    }

    tracing::info!("Alert scheduler stopped");
}
