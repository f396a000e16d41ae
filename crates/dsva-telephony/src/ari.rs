//! Asterisk REST Interface (ARI) adapter.
//!
//! [`AriClient`] issues channel commands over REST and [`AriEventStream`]
//! turns the application's websocket event feed into [`CallEvent`]s.

use crate::control::{CallControl, CallEvent, DialplanTarget};
use crate::error::TelephonyError;
use crate::router::CallRouter;
use async_trait::async_trait;
use futures_util::StreamExt;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use url::Url;

/// Connection settings for one Stasis application.
#[derive(Clone)]
pub struct AriConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub app_name: String,
    /// Timeout for individual REST commands.
    pub timeout_secs: u64,
}

impl Default for AriConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8088,
            username: "asterisk".to_string(),
            password: String::new(),
            app_name: "voice-agent".to_string(),
            timeout_secs: 10,
        }
    }
}

impl fmt::Debug for AriConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AriConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("app_name", &self.app_name)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl AriConfig {
    pub fn rest_base(&self) -> Result<Url, TelephonyError> {
        Ok(Url::parse(&format!("http://{}:{}/ari/", self.host, self.port))?)
    }

    /// Websocket URL of the event feed for `app_name`.
    pub fn events_url(&self) -> Result<Url, TelephonyError> {
        let mut url = Url::parse(&format!("ws://{}:{}/ari/events", self.host, self.port))?;
        url.query_pairs_mut()
            .append_pair("app", &self.app_name)
            .append_pair("api_key", &format!("{}:{}", self.username, self.password));
        Ok(url)
    }
}

/// [`CallControl`] over ARI's REST endpoints.
#[derive(Clone)]
pub struct AriClient {
    config: AriConfig,
    base: Url,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct PlaybackCreated {
    id: String,
}

impl AriClient {
    pub fn new(config: AriConfig) -> Result<Self, TelephonyError> {
        let base = config.rest_base()?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            config,
            base,
            client,
        })
    }

    pub fn config(&self) -> &AriConfig {
        &self.config
    }

    fn channel_url(&self, call_id: &str, action: Option<&str>) -> Result<Url, TelephonyError> {
        let mut url = self.base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?;
            segments.pop_if_empty().push("channels").push(call_id);
            if let Some(action) = action {
                segments.push(action);
            }
        }
        Ok(url)
    }

    async fn send(
        &self,
        operation: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, TelephonyError> {
        let response = request
            .basic_auth(&self.config.username, Some(&self.config.password))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TelephonyError::Rejected {
                operation,
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl CallControl for AriClient {
    async fn answer(&self, call_id: &str) -> Result<(), TelephonyError> {
        let url = self.channel_url(call_id, Some("answer"))?;
        self.send("answer", self.client.post(url)).await?;
        Ok(())
    }

    async fn play(&self, call_id: &str, media_uri: &str) -> Result<String, TelephonyError> {
        let mut url = self.channel_url(call_id, Some("play"))?;
        url.query_pairs_mut().append_pair("media", media_uri);
        let response = self.send("play", self.client.post(url)).await?;
        let playback: PlaybackCreated = serde_json::from_str(&response.text().await?)?;
        Ok(playback.id)
    }

    async fn redirect(&self, call_id: &str, target: &DialplanTarget) -> Result<(), TelephonyError> {
        let mut url = self.channel_url(call_id, Some("continue"))?;
        url.query_pairs_mut()
            .append_pair("context", &target.context)
            .append_pair("extension", &target.extension)
            .append_pair("priority", &target.priority.to_string());
        self.send("continue", self.client.post(url)).await?;
        Ok(())
    }

    async fn hangup(&self, call_id: &str) -> Result<(), TelephonyError> {
        let url = self.channel_url(call_id, None)?;
        self.send("hangup", self.client.delete(url)).await?;
        Ok(())
    }
}

#[derive(Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    kind: String,
    channel: Option<RawChannel>,
    playback: Option<RawPlayback>,
}

#[derive(Deserialize)]
struct RawChannel {
    id: String,
}

#[derive(Deserialize)]
struct RawPlayback {
    id: String,
    target_uri: String,
}

/// Maps one ARI event message to a [`CallEvent`].
///
/// Returns `None` for malformed messages and event types the agent does not
/// act on.
pub fn parse_event(text: &str) -> Option<CallEvent> {
    let raw: RawEvent = match serde_json::from_str(text) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::debug!("ignoring malformed ARI event: {}", e);
            return None;
        }
    };

    match raw.kind.as_str() {
        "StasisStart" => raw.channel.map(|c| CallEvent::Started { call_id: c.id }),
        "StasisEnd" => raw.channel.map(|c| CallEvent::Ended { call_id: c.id }),
        "PlaybackFinished" => {
            let playback = raw.playback?;
            let call_id = playback.target_uri.strip_prefix("channel:")?.to_string();
            Some(CallEvent::PlaybackFinished {
                call_id,
                playback_id: playback.id,
            })
        }
        _ => None,
    }
}

/// The application's event websocket.
pub struct AriEventStream {
    url: Url,
}

impl AriEventStream {
    pub fn new(config: &AriConfig) -> Result<Self, TelephonyError> {
        Ok(Self {
            url: config.events_url()?,
        })
    }

    /// Connects and feeds every recognised event to `router` until the
    /// server closes the socket.
    ///
    /// # Errors
    ///
    /// [`TelephonyError::EventStream`] if the connection cannot be
    /// established or breaks.
    pub async fn run(&self, router: &CallRouter) -> Result<(), TelephonyError> {
        let (mut socket, _) = connect_async(self.url.as_str()).await?;
        tracing::info!(host = ?self.url.host_str(), "connected to ARI event stream");

        while let Some(message) = socket.next().await {
            match message? {
                Message::Text(text) => {
                    if let Some(event) = parse_event(text.as_str()) {
                        router.handle(event).await;
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }

        tracing::warn!("ARI event stream closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_url_carries_app_and_credentials() {
        let config = AriConfig {
            host: "pbx.local".to_string(),
            password: "secret".to_string(),
            ..AriConfig::default()
        };
        let url = config.events_url().unwrap();
        assert_eq!(url.scheme(), "ws");
        assert_eq!(url.path(), "/ari/events");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("app".to_string(), "voice-agent".to_string()),
                ("api_key".to_string(), "asterisk:secret".to_string()),
            ]
        );
    }

    #[test]
    fn debug_redacts_password() {
        let config = AriConfig {
            password: "hunter2".to_string(),
            ..AriConfig::default()
        };
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn channel_urls() {
        let client = AriClient::new(AriConfig::default()).unwrap();
        assert_eq!(
            client.channel_url("1700.1", Some("answer")).unwrap().as_str(),
            "http://localhost:8088/ari/channels/1700.1/answer"
        );
        assert_eq!(
            client.channel_url("1700.1", None).unwrap().as_str(),
            "http://localhost:8088/ari/channels/1700.1"
        );
    }

    #[test]
    fn parses_lifecycle_events() {
        assert_eq!(
            parse_event(r#"{"type":"StasisStart","channel":{"id":"c1","name":"PJSIP/100"}}"#),
            Some(CallEvent::Started {
                call_id: "c1".to_string()
            })
        );
        assert_eq!(
            parse_event(r#"{"type":"StasisEnd","channel":{"id":"c1"}}"#),
            Some(CallEvent::Ended {
                call_id: "c1".to_string()
            })
        );
        assert_eq!(
            parse_event(
                r#"{"type":"PlaybackFinished","playback":{"id":"pb1","target_uri":"channel:c1","state":"done"}}"#
            ),
            Some(CallEvent::PlaybackFinished {
                call_id: "c1".to_string(),
                playback_id: "pb1".to_string()
            })
        );
    }

    #[test]
    fn ignores_unrelated_and_malformed_events() {
        assert_eq!(parse_event(r#"{"type":"ChannelDtmfReceived","channel":{"id":"c1"}}"#), None);
        assert_eq!(
            parse_event(r#"{"type":"PlaybackFinished","playback":{"id":"pb1","target_uri":"bridge:b1"}}"#),
            None
        );
        assert_eq!(parse_event("not json"), None);
    }
}
