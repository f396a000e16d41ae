//! Background tasks for the server.
//!
//! Includes:
//! - Reaping call sessions whose end event never arrived.

use dsva_telephony::CallRouter;
use tokio::time::{sleep, Duration};

/// Starts the session reaper.
///
/// Runs indefinitely, tearing down calls older than `ttl_seconds`: the
/// session is closed, its controller aborted, its playback wait dropped and
/// the channel hung up.
pub async fn start_session_reaper(router: CallRouter, ttl_seconds: u64) {
    if ttl_seconds == 0 {
        tracing::warn!("session reaper disabled (ttl=0)");
        return;
    }

    let interval_seconds = (ttl_seconds / 2).clamp(1, 60);
    let interval = Duration::from_secs(interval_seconds);
    let max_age = chrono::Duration::seconds(ttl_seconds.min(u64::from(u32::MAX)) as i64);

    tracing::info!(ttl_seconds, interval_seconds, "starting session reaper");

    loop {
        sleep(interval).await;

        let reaped = router.reap(max_age).await;
        if !reaped.is_empty() {
            tracing::warn!(count = reaped.len(), calls = ?reaped, "reaped expired call sessions");
        }
    }
}
