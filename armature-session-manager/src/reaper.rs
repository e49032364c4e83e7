//! Background eviction of expired sessions.

use crate::error::{SessionError, SessionResult};
use crate::store::StoreState;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Spawn the reaper for `state` on the current tokio runtime.
///
/// Every `interval` the task sweeps the store under its lock. It exits when
/// `cancel` fires.
pub(crate) fn spawn<T>(
    state: Arc<StoreState<T>>,
    interval: Duration,
    cancel: CancellationToken,
) -> SessionResult<JoinHandle<()>>
where
    T: Send + Sync + 'static,
{
    let runtime = tokio::runtime::Handle::try_current()
        .map_err(|e| SessionError::Runtime(format!("session store needs a tokio runtime: {}", e)))?;

    Ok(runtime.spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let evicted = state.sweep(Utc::now());
                    if evicted > 0 {
                        debug!(evicted = evicted, "Reaped expired sessions");
                    }
                }
            }
        }

        info!("Session reaper stopped");
    }))
}
