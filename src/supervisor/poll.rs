//! The shared poll clock driving every pipeline.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::manager::Supervisor;

/// One logical clock for all sessions.
pub const POLL_INTERVAL: Duration = Duration::from_millis(300);

/// Run until cancelled: every 300 ms, tick every live session. The
/// supervisor lock serializes ticks against inbound command handling.
pub async fn run_poll_loop(supervisor: Arc<Mutex<Supervisor>>, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(POLL_INTERVAL);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                supervisor.lock().await.tick_all().await;
            }
        }
    }
    info!("poll loop stopped");
}
