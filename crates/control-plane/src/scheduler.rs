//! Component K: the job scheduler.
//!
//! Grounded on `trading-agent/src/main.rs`'s main loop shape (`tokio::time::
//! interval` racing a shutdown signal via `tokio::select!`) generalized to
//! several independently-periodic jobs instead of one. Each job gets its own
//! ticker; a tick is skipped if the previous invocation of that same job is
//! still running (spec §4.K: "a job already in flight, the tick is a
//! no-op"), and a job that returns an error is logged and the loop keeps
//! going rather than bringing the process down.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Spawns a periodic job on its own ticker. `job_fn` is called at the start
/// of every period that isn't already running; the returned future is
/// awaited in its own task so a slow job never delays the ticker itself.
/// `shutdown` is a `watch` channel flipped to `true` once, at process
/// shutdown, by every ticker's owner.
pub fn spawn_job<F, Fut>(
    name: &'static str,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
    job_fn: F,
) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    let in_flight = Arc::new(AtomicBool::new(false));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if in_flight.swap(true, Ordering::SeqCst) {
                        tracing::debug!(job = name, "previous tick still running, skipping");
                        continue;
                    }

                    let in_flight = Arc::clone(&in_flight);
                    let fut = job_fn();
                    tokio::spawn(async move {
                        if let Err(e) = fut.await {
                            tracing::error!(job = name, error = %e, "scheduled job failed");
                        }
                        in_flight.store(false, Ordering::SeqCst);
                    });
                }
                _ = shutdown.changed() => {
                    tracing::info!(job = name, "scheduler shutting down");
                    break;
                }
            }
        }
    })
}
