//! Outbound webhook notifications for the DSVA voice agent.
//!
//! A single [`WebhookConfig`](dsva_types::WebhookConfig) record decides where
//! loggable interactions are sent and how the JSON body is laid out. The
//! record lives in a [`ConfigStore`] backed by an injected
//! [`ConfigBackend`]; the [`WebhookDispatcher`] reads it on every dispatch.
//!
//! Delivery is fire-and-forget: one POST with a short timeout, no retries,
//! and failures are logged rather than returned.

pub mod dispatch;
pub mod error;
pub mod store;

pub use dispatch::{build_body, WebhookDispatcher, WEBHOOK_TIMEOUT};
pub use error::WebhookError;
pub use store::{ConfigBackend, ConfigStore, JsonFileBackend, MemoryBackend};
