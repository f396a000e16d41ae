//! Shared types, error definitions, and constants for the DSVA voice agent.
//!
//! This crate provides the data model used across all DSVA crates: the
//! conversation transcript, the webhook configuration record, and the
//! classification of generated replies into agent decisions.
//!
//! No crate in the workspace depends on anything *except* `dsva-types` for
//! cross-cutting type definitions.

pub mod intent;

pub use intent::{AgentDecision, IntentClassifier, PhraseClassifier};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Opening utterance spoken when a call is answered.
pub const GREETING: &str = "Hello, this is Alex. How can I help you today?";

/// Utterance substituted for a reply when the text generator fails.
pub const APOLOGY: &str =
    "I apologize, but I am having trouble processing your request right now.";

/// Literal reply the model emits when the caller asks for a human.
pub const TRANSFER_SENTINEL: &str = "transfer_to_owner";

/// Phrase the model uses when it confirms that a request was captured.
pub const LOGGED_REQUEST_PHRASE: &str = "logged your request";

/// Event type sent to the webhook for a loggable interaction.
pub const INTERACTION_LOGGED_EVENT: &str = "interaction_logged";

/// Author of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions for the language model.
    System,
    /// The caller.
    User,
    /// The voice agent.
    Assistant,
}

impl Role {
    /// Returns the wire label for this role.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A single utterance in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Layout of the JSON body posted to the webhook.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadShape {
    /// `{"event": E, "data": P}`
    #[default]
    Standard,
    /// `{...P, "event": E}`
    Flat,
}

impl PayloadShape {
    /// Returns the wire label for this shape.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Flat => "flat",
        }
    }
}

impl fmt::Display for PayloadShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a known payload shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown output format '{0}' (expected 'standard' or 'flat')")]
pub struct UnknownPayloadShape(pub String);

impl FromStr for PayloadShape {
    type Err = UnknownPayloadShape;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(Self::Standard),
            "flat" => Ok(Self::Flat),
            _ => Err(UnknownPayloadShape(s.to_string())),
        }
    }
}

/// The single global outbound-notification configuration record.
///
/// Serialized as `{"webhookUrl": ..., "outputFormat": ...}`. The snake_case
/// keys written by older dashboards are still accepted when reading.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Destination URL. Empty disables dispatch.
    #[serde(rename = "webhookUrl", alias = "webhook_url", default)]
    pub webhook_url: String,
    /// Body layout for dispatched events.
    #[serde(rename = "outputFormat", alias = "output_format", default)]
    pub output_format: PayloadShape,
}

impl WebhookConfig {
    pub fn new(webhook_url: impl Into<String>, output_format: PayloadShape) -> Self {
        Self {
            webhook_url: webhook_url.into(),
            output_format,
        }
    }

    /// Returns `true` if a destination URL is configured.
    pub fn is_enabled(&self) -> bool {
        !self.webhook_url.trim().is_empty()
    }
}
