//! Routes platform events to per-call controllers.

use crate::control::CallEvent;
use crate::controller::{CallDeps, TurnController, TurnSettings};
use std::sync::Arc;

/// Starts a [`TurnController`] for every new call and tears it down when the
/// call ends. Cheap to clone.
#[derive(Clone)]
pub struct CallRouter {
    deps: CallDeps,
    settings: Arc<TurnSettings>,
}

impl CallRouter {
    pub fn new(deps: CallDeps, settings: TurnSettings) -> Self {
        Self {
            deps,
            settings: Arc::new(settings),
        }
    }

    pub fn deps(&self) -> &CallDeps {
        &self.deps
    }

    pub async fn handle(&self, event: CallEvent) {
        match event {
            CallEvent::Started { call_id } => self.start(call_id).await,
            CallEvent::Ended { call_id } => self.end(&call_id),
            CallEvent::PlaybackFinished {
                call_id,
                playback_id,
            } => {
                if !self.deps.signals.complete(&call_id, &playback_id) {
                    tracing::debug!(%call_id, %playback_id, "playback finished with no waiter");
                }
            }
        }
    }

    async fn start(&self, call_id: String) {
        if let Err(e) = self.deps.registry.open(&call_id) {
            tracing::warn!(%call_id, "ignoring call start: {}", e);
            return;
        }
        tracing::info!(%call_id, "call started");

        if let Err(e) = self.deps.control.answer(&call_id).await {
            tracing::error!(%call_id, "failed to answer call: {}", e);
            self.deps.registry.release(&call_id);
            return;
        }

        let controller = TurnController::new(call_id.clone(), self.deps.clone(), self.settings.clone());
        let task = tokio::spawn(async move {
            controller.run().await;
        });
        // The task may already have finished and released the session.
        self.deps.registry.attach(&call_id, task.abort_handle());
    }

    fn end(&self, call_id: &str) {
        self.deps.signals.cancel(call_id);
        if self.deps.registry.close(call_id).is_some() {
            tracing::info!(%call_id, "caller left, session closed");
        }
    }

    /// Tears down every call older than `max_age` as if its end event had
    /// arrived, then hangs the channel up. Returns the reaped call ids.
    pub async fn reap(&self, max_age: chrono::Duration) -> Vec<String> {
        let reaped = self.deps.registry.reap_expired(max_age);
        for call_id in &reaped {
            self.deps.signals.cancel(call_id);
            if let Err(e) = self.deps.control.hangup(call_id).await {
                tracing::warn!(%call_id, "failed to hang up reaped call: {}", e);
            }
        }
        reaped
    }
}
