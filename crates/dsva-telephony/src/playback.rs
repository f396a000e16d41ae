//! Playback-completion signals keyed by call id.
//!
//! The controller registers a waiter before issuing a play command and
//! suspends on it; the event listener completes it when the platform reports
//! that the audio finished. Ending the call cancels the waiter.
//!
//! A playback the controller stopped waiting for is remembered per call, so
//! its late completion cannot wake the waiter of the next utterance.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::oneshot;

/// Result of waiting for one playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackWait {
    Finished,
    TimedOut,
    /// The waiter was dropped, normally because the call ended.
    Cancelled,
}

struct Waiter {
    playback_id: Option<String>,
    tx: oneshot::Sender<()>,
}

#[derive(Default)]
struct Slots {
    waiters: HashMap<String, Waiter>,
    /// Last abandoned playback id per call.
    abandoned: HashMap<String, String>,
}

#[derive(Default)]
pub struct PlaybackSignals {
    slots: Mutex<Slots>,
}

impl PlaybackSignals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a waiter for the next playback on `call_id`, replacing any
    /// previous one.
    pub fn expect(&self, call_id: &str) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        self.lock().waiters.insert(
            call_id.to_string(),
            Waiter {
                playback_id: None,
                tx,
            },
        );
        rx
    }

    /// Associates the pending waiter with the playback the platform started,
    /// so completions of stale playbacks are ignored.
    pub fn bind(&self, call_id: &str, playback_id: &str) {
        if let Some(waiter) = self.lock().waiters.get_mut(call_id) {
            waiter.playback_id = Some(playback_id.to_string());
        }
    }

    /// Fires the waiter for `call_id`. Returns `false` if nothing was waiting,
    /// the waiter is bound to a different playback, or `playback_id` was
    /// abandoned earlier.
    pub fn complete(&self, call_id: &str, playback_id: &str) -> bool {
        let mut slots = self.lock();
        if slots.abandoned.get(call_id).is_some_and(|id| id == playback_id) {
            slots.abandoned.remove(call_id);
            return false;
        }

        let matches = match slots.waiters.get(call_id) {
            Some(waiter) => waiter
                .playback_id
                .as_deref()
                .map_or(true, |bound| bound == playback_id),
            None => false,
        };
        if !matches {
            return false;
        }

        slots
            .waiters
            .remove(call_id)
            .map(|waiter| waiter.tx.send(()).is_ok())
            .unwrap_or(false)
    }

    /// Drops the waiter without firing it. If it was bound, the playback id
    /// is remembered and its completion is ignored.
    pub fn abandon(&self, call_id: &str) {
        let mut slots = self.lock();
        let bound = slots
            .waiters
            .remove(call_id)
            .and_then(|waiter| waiter.playback_id);
        if let Some(playback_id) = bound {
            slots.abandoned.insert(call_id.to_string(), playback_id);
        }
    }

    /// Drops everything held for `call_id`; a suspended controller wakes with
    /// [`PlaybackWait::Cancelled`].
    pub fn cancel(&self, call_id: &str) {
        let mut slots = self.lock();
        slots.waiters.remove(call_id);
        slots.abandoned.remove(call_id);
    }

    /// Number of calls with an armed waiter.
    pub fn pending(&self) -> usize {
        self.lock().waiters.len()
    }

    /// Number of calls with an abandoned playback still remembered.
    pub fn abandoned(&self) -> usize {
        self.lock().abandoned.len()
    }

    /// Suspends until the waiter fires, is cancelled, or `timeout` elapses.
    pub async fn wait(rx: oneshot::Receiver<()>, timeout: Duration) -> PlaybackWait {
        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(())) => PlaybackWait::Finished,
            Ok(Err(_)) => PlaybackWait::Cancelled,
            Err(_) => PlaybackWait::TimedOut,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn complete_wakes_waiter() {
        let signals = PlaybackSignals::new();
        let rx = signals.expect("call-1");
        signals.bind("call-1", "pb-1");
        assert!(signals.complete("call-1", "pb-1"));
        assert_eq!(
            PlaybackSignals::wait(rx, Duration::from_secs(1)).await,
            PlaybackWait::Finished
        );
        assert_eq!(signals.pending(), 0);
    }

    #[tokio::test]
    async fn stale_playback_is_ignored() {
        let signals = PlaybackSignals::new();
        let rx = signals.expect("call-1");
        signals.bind("call-1", "pb-2");
        assert!(!signals.complete("call-1", "pb-1"));
        assert_eq!(
            PlaybackSignals::wait(rx, Duration::from_millis(20)).await,
            PlaybackWait::TimedOut
        );
    }

    #[tokio::test]
    async fn completion_before_bind_is_accepted() {
        let signals = PlaybackSignals::new();
        let rx = signals.expect("call-1");
        assert!(signals.complete("call-1", "pb-1"));
        signals.bind("call-1", "pb-1");
        assert_eq!(
            PlaybackSignals::wait(rx, Duration::from_secs(1)).await,
            PlaybackWait::Finished
        );
    }

    #[tokio::test]
    async fn cancel_wakes_with_cancelled() {
        let signals = PlaybackSignals::new();
        let rx = signals.expect("call-1");
        signals.cancel("call-1");
        assert_eq!(
            PlaybackSignals::wait(rx, Duration::from_secs(1)).await,
            PlaybackWait::Cancelled
        );
        assert!(!signals.complete("call-1", "pb-1"));
    }

    #[tokio::test]
    async fn late_completion_of_abandoned_playback_is_ignored() {
        let signals = PlaybackSignals::new();
        let _first = signals.expect("call-1");
        signals.bind("call-1", "pb-1");
        signals.abandon("call-1");
        assert_eq!(signals.pending(), 0);
        assert_eq!(signals.abandoned(), 1);

        // Next utterance armed, not yet bound, when the old event arrives.
        let rx = signals.expect("call-1");
        assert!(!signals.complete("call-1", "pb-1"));
        assert_eq!(signals.pending(), 1);
        assert_eq!(signals.abandoned(), 0);

        signals.bind("call-1", "pb-2");
        assert!(signals.complete("call-1", "pb-2"));
        assert_eq!(
            PlaybackSignals::wait(rx, Duration::from_secs(1)).await,
            PlaybackWait::Finished
        );
    }

    #[test]
    fn cancel_forgets_abandoned_playback() {
        let signals = PlaybackSignals::new();
        let _rx = signals.expect("call-1");
        signals.bind("call-1", "pb-1");
        signals.abandon("call-1");
        signals.cancel("call-1");
        assert_eq!(signals.abandoned(), 0);
    }
}
