use crate::error::TelephonyError;
use async_trait::async_trait;
use std::time::Duration;

/// Acquires what the caller said.
#[async_trait]
pub trait UtteranceSource: Send + Sync {
    /// Returns `Ok(None)` when nothing was heard within the listen window.
    async fn listen(&self, call_id: &str) -> Result<Option<String>, TelephonyError>;
}

/// Stands in for speech recognition: waits out the listen window and
/// reports silence.
#[derive(Debug, Clone)]
pub struct SilentListener {
    window: Duration,
}

impl SilentListener {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }
}

impl Default for SilentListener {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

#[async_trait]
impl UtteranceSource for SilentListener {
    async fn listen(&self, call_id: &str) -> Result<Option<String>, TelephonyError> {
        tracing::debug!(call_id, window_ms = self.window.as_millis() as u64, "listening");
        tokio::time::sleep(self.window).await;
        Ok(None)
    }
}
