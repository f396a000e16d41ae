//! Server configuration loading from file and environment variables.

use dsva_telephony::{AriConfig, DialplanTarget, TurnSettings};
use dsva_voice::{GeneratorConfig, SynthesizerConfig};
use serde::Deserialize;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub webhook: WebhookStoreConfig,

    /// Text-response generator settings.
    #[serde(default)]
    pub llm: GeneratorConfig,

    /// Speech synthesizer settings.
    #[serde(default)]
    pub tts: SynthesizerConfig,

    #[serde(default)]
    pub telephony: TelephonyConfig,

    #[serde(default)]
    pub frontend: FrontendConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,

    #[serde(default = "default_port")]
    pub port: u16,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "dsva_telephony=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

/// Where the webhook configuration record is persisted.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookStoreConfig {
    #[serde(default = "default_webhook_store")]
    pub store_path: String,
}

/// Asterisk connection and call-flow settings.
#[derive(Clone, Deserialize)]
pub struct TelephonyConfig {
    /// ARI host. Telephony is disabled when unset.
    #[serde(default)]
    pub host: Option<String>,

    #[serde(default = "default_ari_port")]
    pub port: u16,

    #[serde(default = "default_ari_username")]
    pub username: String,

    #[serde(default)]
    pub password: String,

    #[serde(default = "default_app_name")]
    pub app_name: String,

    #[serde(default = "default_transfer_context")]
    pub transfer_context: String,

    #[serde(default = "default_transfer_extension")]
    pub transfer_extension: String,

    #[serde(default = "default_transfer_priority")]
    pub transfer_priority: u32,

    #[serde(default = "default_termination_keywords")]
    pub termination_keywords: Vec<String>,

    #[serde(default = "default_playback_timeout_secs")]
    pub playback_timeout_secs: u64,

    #[serde(default = "default_listen_attempts")]
    pub listen_attempts: u32,

    #[serde(default = "default_listen_window_secs")]
    pub listen_window_secs: u64,

    /// Sessions older than this are reaped. `0` disables the reaper.
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
}

/// Static front-end served at the root path.
#[derive(Debug, Clone, Deserialize)]
pub struct FrontendConfig {
    #[serde(default = "default_frontend_dir")]
    pub dir: String,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0))
}

fn default_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_webhook_store() -> String {
    "config.json".to_string()
}

fn default_ari_port() -> u16 {
    8088
}

fn default_ari_username() -> String {
    "asterisk".to_string()
}

fn default_app_name() -> String {
    "voice-agent".to_string()
}

fn default_transfer_context() -> String {
    DialplanTarget::default().context
}

fn default_transfer_extension() -> String {
    DialplanTarget::default().extension
}

fn default_transfer_priority() -> u32 {
    DialplanTarget::default().priority
}

fn default_termination_keywords() -> Vec<String> {
    vec!["hangup".to_string()]
}

fn default_playback_timeout_secs() -> u64 {
    30
}

fn default_listen_attempts() -> u32 {
    3
}

fn default_listen_window_secs() -> u64 {
    5
}

fn default_session_ttl_secs() -> u64 {
    3600
}

fn default_frontend_dir() -> String {
    "frontend".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for WebhookStoreConfig {
    fn default() -> Self {
        Self {
            store_path: default_webhook_store(),
        }
    }
}

impl Default for TelephonyConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: default_ari_port(),
            username: default_ari_username(),
            password: String::new(),
            app_name: default_app_name(),
            transfer_context: default_transfer_context(),
            transfer_extension: default_transfer_extension(),
            transfer_priority: default_transfer_priority(),
            termination_keywords: default_termination_keywords(),
            playback_timeout_secs: default_playback_timeout_secs(),
            listen_attempts: default_listen_attempts(),
            listen_window_secs: default_listen_window_secs(),
            session_ttl_secs: default_session_ttl_secs(),
        }
    }
}

impl fmt::Debug for TelephonyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelephonyConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("app_name", &self.app_name)
            .field("transfer_context", &self.transfer_context)
            .field("transfer_extension", &self.transfer_extension)
            .field("transfer_priority", &self.transfer_priority)
            .field("termination_keywords", &self.termination_keywords)
            .field("playback_timeout_secs", &self.playback_timeout_secs)
            .field("listen_attempts", &self.listen_attempts)
            .field("listen_window_secs", &self.listen_window_secs)
            .field("session_ttl_secs", &self.session_ttl_secs)
            .finish()
    }
}

impl TelephonyConfig {
    /// ARI connection settings, or `None` when no host is configured.
    pub fn ari(&self) -> Option<AriConfig> {
        let host = self.host.as_deref().map(str::trim).filter(|h| !h.is_empty())?;
        Some(AriConfig {
            host: host.to_string(),
            port: self.port,
            username: self.username.clone(),
            password: self.password.clone(),
            app_name: self.app_name.clone(),
            ..AriConfig::default()
        })
    }

    pub fn turn_settings(&self) -> TurnSettings {
        TurnSettings {
            termination_keywords: self.termination_keywords.clone(),
            transfer_target: DialplanTarget {
                context: self.transfer_context.clone(),
                extension: self.transfer_extension.clone(),
                priority: self.transfer_priority,
            },
            playback_timeout: Duration::from_secs(self.playback_timeout_secs),
            listen_attempts: self.listen_attempts.max(1),
            ..TurnSettings::default()
        }
    }
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            dir: default_frontend_dir(),
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `DSVA_HOST`, `DSVA_PORT` override `server.host` / `server.port`
/// - `DSVA_LOG_LEVEL`, `DSVA_LOG_JSON` override `logging.level` / `logging.json`
/// - `DSVA_WEBHOOK_STORE` overrides `webhook.store_path`
/// - `DSVA_FRONTEND_DIR` overrides `frontend.dir`
/// - `OPENAI_API_KEY`, `OPENAI_BASE_URL` override `llm.api_key` / `llm.base_url`
/// - `ELEVENLABS_API_KEY`, `ELEVENLABS_VOICE_ID` override `tts.api_key` / `tts.voice_id`
/// - `ASTERISK_HOST`, `ASTERISK_PORT`, `ASTERISK_USER`, `ASTERISK_PASS`,
///   `ASTERISK_APP_NAME` override the `telephony` connection fields
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Applies overrides from `lookup`, which maps a variable name to its value.
pub fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(host) = lookup("DSVA_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Some(port) = lookup("DSVA_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Some(level) = lookup("DSVA_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = lookup("DSVA_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    if let Some(path) = lookup("DSVA_WEBHOOK_STORE") {
        config.webhook.store_path = path;
    }
    if let Some(dir) = lookup("DSVA_FRONTEND_DIR") {
        config.frontend.dir = dir;
    }

    if let Some(key) = lookup("OPENAI_API_KEY") {
        config.llm.api_key = key;
    }
    if let Some(url) = lookup("OPENAI_BASE_URL") {
        config.llm.base_url = url;
    }
    if let Some(key) = lookup("ELEVENLABS_API_KEY") {
        config.tts.api_key = key;
    }
    if let Some(voice) = lookup("ELEVENLABS_VOICE_ID") {
        config.tts.voice_id = voice;
    }

    if let Some(host) = lookup("ASTERISK_HOST") {
        config.telephony.host = Some(host);
    }
    if let Some(port) = lookup("ASTERISK_PORT") {
        if let Ok(parsed) = port.parse() {
            config.telephony.port = parsed;
        }
    }
    if let Some(user) = lookup("ASTERISK_USER") {
        config.telephony.username = user;
    }
    if let Some(pass) = lookup("ASTERISK_PASS") {
        config.telephony.password = pass;
    }
    if let Some(app) = lookup("ASTERISK_APP_NAME") {
        config.telephony.app_name = app;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_without_file() {
        let config = Config::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.webhook.store_path, "config.json");
        assert!(config.telephony.ari().is_none());
        assert_eq!(config.telephony.turn_settings().listen_attempts, 3);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let config = load_config(path.to_str()).unwrap();
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn parses_toml_sections() {
        let config: Config = toml::from_str(
            r#"
            [server]
            port = 9100

            [llm]
            model = "gpt-4o-mini"

            [telephony]
            host = "pbx.internal"
            transfer_extension = "2000"
            termination_keywords = ["hangup", "goodbye"]
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9100);
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.max_tokens, 150);
        let ari = config.telephony.ari().unwrap();
        assert_eq!(ari.host, "pbx.internal");
        assert_eq!(ari.port, 8088);
        let settings = config.telephony.turn_settings();
        assert_eq!(settings.transfer_target.extension, "2000");
        assert_eq!(settings.transfer_target.context, "default");
        assert_eq!(settings.termination_keywords.len(), 2);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[server\nport = ").unwrap();
        assert!(matches!(
            load_config(path.to_str()),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn env_overrides_apply() {
        let vars: HashMap<&str, &str> = [
            ("DSVA_PORT", "9000"),
            ("DSVA_LOG_JSON", "1"),
            ("DSVA_WEBHOOK_STORE", "/var/lib/dsva/webhook.json"),
            ("OPENAI_API_KEY", "sk-test"),
            ("ASTERISK_HOST", "10.0.0.5"),
            ("ASTERISK_PORT", "not-a-port"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        apply_env_overrides(&mut config, |key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.server.port, 9000);
        assert!(config.logging.json);
        assert_eq!(config.webhook.store_path, "/var/lib/dsva/webhook.json");
        assert_eq!(config.llm.api_key, "sk-test");
        assert_eq!(config.telephony.host.as_deref(), Some("10.0.0.5"));
        assert_eq!(config.telephony.port, 8088);
    }

    #[test]
    fn blank_asterisk_host_disables_telephony() {
        let config = TelephonyConfig {
            host: Some("  ".to_string()),
            ..TelephonyConfig::default()
        };
        assert!(config.ari().is_none());
    }

    #[test]
    fn debug_redacts_password() {
        let config = TelephonyConfig {
            password: "ari-secret".to_string(),
            ..TelephonyConfig::default()
        };
        assert!(!format!("{:?}", config).contains("ari-secret"));
    }
}
