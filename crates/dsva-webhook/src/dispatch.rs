//! Delivery of webhook events.

use crate::error::WebhookError;
use crate::store::ConfigStore;
use dsva_types::{PayloadShape, INTERACTION_LOGGED_EVENT};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

/// Upper bound for a single webhook POST.
pub const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(5);

/// Builds the JSON body for an event.
///
/// - `standard`: `{"event": E, "data": P}`
/// - `flat`: the payload's keys plus `"event": E`. A payload key named
///   `event` is overwritten.
pub fn build_body(shape: PayloadShape, event_type: &str, payload: Map<String, Value>) -> Value {
    match shape {
        PayloadShape::Standard => {
            let mut body = Map::with_capacity(2);
            body.insert("event".to_string(), Value::String(event_type.to_string()));
            body.insert("data".to_string(), Value::Object(payload));
            Value::Object(body)
        }
        PayloadShape::Flat => {
            let mut body = payload;
            body.insert("event".to_string(), Value::String(event_type.to_string()));
            Value::Object(body)
        }
    }
}

/// Posts events to the configured webhook.
#[derive(Clone)]
pub struct WebhookDispatcher {
    store: Arc<ConfigStore>,
    client: reqwest::Client,
}

impl WebhookDispatcher {
    pub fn new(store: Arc<ConfigStore>) -> Result<Self, WebhookError> {
        Self::with_timeout(store, WEBHOOK_TIMEOUT)
    }

    pub fn with_timeout(store: Arc<ConfigStore>, timeout: Duration) -> Result<Self, WebhookError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { store, client })
    }

    pub fn store(&self) -> &Arc<ConfigStore> {
        &self.store
    }

    /// Sends one event and returns the parsed response body.
    ///
    /// Returns `None` without any network activity when no URL is
    /// configured, and `None` after logging on any delivery failure. A
    /// response body that is not JSON comes back as `{"rawResponse": text}`.
    pub async fn dispatch(&self, event_type: &str, payload: Map<String, Value>) -> Option<Value> {
        let config = self.store.get_config();
        if !config.is_enabled() {
            tracing::debug!(event = event_type, "webhook disabled, skipping dispatch");
            return None;
        }

        let body = build_body(config.output_format, event_type, payload);
        match self.post(&config.webhook_url, &body).await {
            Ok(response) => {
                tracing::info!(event = event_type, url = %config.webhook_url, "webhook delivered");
                Some(response)
            }
            Err(e) => {
                tracing::error!(
                    event = event_type,
                    url = %config.webhook_url,
                    "failed to send webhook: {}",
                    e
                );
                None
            }
        }
    }

    /// Reports a loggable exchange as an `interaction_logged` event.
    ///
    /// `extra` keys are added after the standard ones and may not replace them.
    pub async fn notify_interaction(
        &self,
        source: &str,
        user_message: &str,
        agent_response: &str,
        extra: Map<String, Value>,
    ) -> Option<Value> {
        let mut payload = Map::new();
        payload.insert("userMessage".to_string(), user_message.into());
        payload.insert("agentResponse".to_string(), agent_response.into());
        payload.insert("source".to_string(), source.into());
        for (key, value) in extra {
            payload.entry(key).or_insert(value);
        }

        self.dispatch(INTERACTION_LOGGED_EVENT, payload).await
    }

    async fn post(&self, url: &str, body: &Value) -> Result<Value, WebhookError> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await?
            .error_for_status()?;
        let text = response.text().await?;

        Ok(serde_json::from_str(&text).unwrap_or_else(|_| {
            let mut raw = Map::new();
            raw.insert("rawResponse".to_string(), Value::String(text));
            Value::Object(raw)
        }))
    }
}
