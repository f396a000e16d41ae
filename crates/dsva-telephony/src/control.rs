//! Commands issued to, and events received from, the telephony platform.

use crate::error::TelephonyError;
use async_trait::async_trait;

/// Dialplan location a transferred call continues at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialplanTarget {
    pub context: String,
    pub extension: String,
    pub priority: u32,
}

impl Default for DialplanTarget {
    fn default() -> Self {
        Self {
            context: "default".to_string(),
            extension: "1000".to_string(),
            priority: 1,
        }
    }
}

/// Call-control commands.
#[async_trait]
pub trait CallControl: Send + Sync {
    async fn answer(&self, call_id: &str) -> Result<(), TelephonyError>;

    /// Starts playback and returns the platform's playback id.
    async fn play(&self, call_id: &str, media_uri: &str) -> Result<String, TelephonyError>;

    async fn redirect(&self, call_id: &str, target: &DialplanTarget) -> Result<(), TelephonyError>;

    async fn hangup(&self, call_id: &str) -> Result<(), TelephonyError>;
}

/// Call lifecycle events the agent reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallEvent {
    /// A call entered the application.
    Started { call_id: String },
    /// A call left the application (caller hung up, transfer completed, ...).
    Ended { call_id: String },
    /// Audio started by [`CallControl::play`] finished on the call.
    PlaybackFinished { call_id: String, playback_id: String },
}

impl CallEvent {
    pub fn call_id(&self) -> &str {
        match self {
            Self::Started { call_id }
            | Self::Ended { call_id }
            | Self::PlaybackFinished { call_id, .. } => call_id,
        }
    }
}
