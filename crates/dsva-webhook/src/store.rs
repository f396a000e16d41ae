//! Persistent storage for the webhook configuration record.

use crate::error::WebhookError;
use dsva_types::{PayloadShape, WebhookConfig};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

/// Where the configuration record is kept between restarts.
///
/// Implementations store the whole record; there is no partial update.
pub trait ConfigBackend: Send + Sync {
    /// Returns `Ok(None)` if nothing has been stored yet.
    fn load(&self) -> Result<Option<WebhookConfig>, WebhookError>;

    fn store(&self, config: &WebhookConfig) -> Result<(), WebhookError>;
}

/// Stores the record as a single JSON object on disk.
///
/// Writes go to a sibling temporary file that is renamed over the target,
/// so readers never observe a half-written file.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "webhook".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl ConfigBackend for JsonFileBackend {
    fn load(&self) -> Result<Option<WebhookConfig>, WebhookError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(serde_json::from_str(&contents)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(WebhookError::Persistence(e)),
        }
    }

    fn store(&self, config: &WebhookConfig) -> Result<(), WebhookError> {
        let json = serde_json::to_string_pretty(config)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let temp = self.temp_path();
        std::fs::write(&temp, json)?;
        std::fs::rename(&temp, &self.path)?;
        Ok(())
    }
}

/// Keeps the record in memory only. Useful for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    record: Mutex<Option<WebhookConfig>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: WebhookConfig) -> Self {
        Self {
            record: Mutex::new(Some(config)),
        }
    }
}

impl ConfigBackend for MemoryBackend {
    fn load(&self) -> Result<Option<WebhookConfig>, WebhookError> {
        Ok(self
            .record
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone())
    }

    fn store(&self, config: &WebhookConfig) -> Result<(), WebhookError> {
        *self.record.lock().unwrap_or_else(|e| e.into_inner()) = Some(config.clone());
        Ok(())
    }
}

/// The webhook configuration record and its backend.
///
/// All reads and writes go through one `RwLock`. Writers hold the lock
/// across the backend write, so concurrent updates are serialized and the
/// last one wins.
pub struct ConfigStore {
    backend: Box<dyn ConfigBackend>,
    current: RwLock<WebhookConfig>,
}

impl ConfigStore {
    /// Loads the stored record, falling back to defaults if none exists or
    /// it cannot be read.
    pub fn open(backend: impl ConfigBackend + 'static) -> Self {
        let current = match backend.load() {
            Ok(Some(config)) => {
                tracing::info!(
                    enabled = config.is_enabled(),
                    format = %config.output_format,
                    "loaded webhook configuration"
                );
                config
            }
            Ok(None) => WebhookConfig::default(),
            Err(e) => {
                tracing::error!("failed to load webhook configuration: {}", e);
                WebhookConfig::default()
            }
        };

        Self {
            backend: Box::new(backend),
            current: RwLock::new(current),
        }
    }

    /// Returns the current record. Never fails.
    pub fn get_config(&self) -> WebhookConfig {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Validates and persists a new record, replacing the previous one.
    ///
    /// # Errors
    ///
    /// - [`WebhookError::Validation`] if the URL is neither blank nor an
    ///   absolute http(s) URL, or `output_format` is not `standard`/`flat`.
    /// - [`WebhookError::Persistence`] / [`WebhookError::Encoding`] if the
    ///   backend write fails. The in-memory record is left unchanged.
    pub fn set_config(
        &self,
        webhook_url: &str,
        output_format: &str,
    ) -> Result<WebhookConfig, WebhookError> {
        let output_format: PayloadShape = output_format
            .parse()
            .map_err(|e: dsva_types::UnknownPayloadShape| WebhookError::Validation(e.to_string()))?;
        let config = WebhookConfig::new(validate_url(webhook_url)?, output_format);

        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        self.backend.store(&config)?;
        *current = config.clone();

        tracing::info!(
            enabled = config.is_enabled(),
            format = %config.output_format,
            "webhook configuration updated"
        );
        Ok(config)
    }

    /// Boolean form of [`set_config`](Self::set_config): `false` on any
    /// failure, which is logged.
    pub fn update(&self, webhook_url: &str, output_format: &str) -> bool {
        match self.set_config(webhook_url, output_format) {
            Ok(_) => true,
            Err(e) => {
                tracing::error!("failed to save webhook configuration: {}", e);
                false
            }
        }
    }
}

/// Blank disables the webhook; anything else must be an absolute http(s) URL.
fn validate_url(raw: &str) -> Result<String, WebhookError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(String::new());
    }

    let parsed = url::Url::parse(trimmed)
        .map_err(|e| WebhookError::Validation(format!("invalid webhook URL '{}': {}", trimmed, e)))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(WebhookError::Validation(format!(
            "webhook URL must be an http or https URL: '{}'",
            trimmed
        )));
    }

    Ok(trimmed.to_string())
}
