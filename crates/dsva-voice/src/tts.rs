use crate::config::SynthesizerConfig;
use crate::error::VoiceError;
use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Maximum text input size for TTS (64 KiB). Prevents resource exhaustion from
/// oversized synthesis requests.
const MAX_TTS_INPUT_BYTES: usize = 64 * 1024;

/// Rendered speech stored where the telephony platform can play it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioArtifact {
    /// File on disk, including extension.
    pub path: PathBuf,
    /// Media resource for the play command (`sound:` + path without extension).
    pub media_uri: String,
}

impl AudioArtifact {
    pub fn from_path(path: PathBuf) -> Self {
        let media_uri = format!("sound:{}", path.with_extension("").display());
        Self { path, media_uri }
    }
}

/// Renders text to an audio artifact.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// `name_hint` becomes the file stem of the artifact.
    async fn synthesize(&self, text: &str, name_hint: &str) -> Result<AudioArtifact, VoiceError>;
}

#[derive(Debug, Serialize)]
struct TextToSpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
}

/// Synthesizer backed by the ElevenLabs text-to-speech API.
#[derive(Debug, Clone)]
pub struct ElevenLabsSynthesizer {
    client: reqwest::Client,
    config: SynthesizerConfig,
}

impl ElevenLabsSynthesizer {
    pub fn new(config: SynthesizerConfig) -> Result<Self, VoiceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| VoiceError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    pub fn sounds_dir(&self) -> &Path {
        Path::new(&self.config.sounds_dir)
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/text-to-speech/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.voice_id
        )
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsSynthesizer {
    async fn synthesize(&self, text: &str, name_hint: &str) -> Result<AudioArtifact, VoiceError> {
        if text.trim().is_empty() {
            return Err(VoiceError::InvalidInput("text is empty".to_string()));
        }
        if text.len() > MAX_TTS_INPUT_BYTES {
            return Err(VoiceError::InvalidInput(format!(
                "text exceeds maximum size: {} bytes (limit: {} bytes)",
                text.len(),
                MAX_TTS_INPUT_BYTES
            )));
        }
        if self.config.api_key.is_empty() {
            return Err(VoiceError::Config(
                "ElevenLabs API key is not configured. Set tts.api_key in config \
                 or the ELEVENLABS_API_KEY environment variable."
                    .to_string(),
            ));
        }

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("output_format", self.config.output_format.as_str())])
            .header("xi-api-key", &self.config.api_key)
            .json(&TextToSpeechRequest {
                text,
                model_id: &self.config.model_id,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VoiceError::Upstream(format!(
                "text-to-speech returned {}: {}",
                status, body
            )));
        }

        let audio = response.bytes().await?;
        if audio.is_empty() {
            return Err(VoiceError::Upstream(
                "text-to-speech returned no audio".to_string(),
            ));
        }

        tokio::fs::create_dir_all(self.sounds_dir()).await?;
        let file_name = format!(
            "{}.{}",
            sanitize_file_stem(name_hint),
            audio_extension(&self.config.output_format)
        );
        let path = self.sounds_dir().join(file_name);
        tokio::fs::write(&path, &audio).await?;

        tracing::debug!(path = %path.display(), bytes = audio.len(), "stored synthesized audio");

        Ok(AudioArtifact::from_path(path))
    }
}

/// Maps a vendor output format to the file extension Asterisk expects.
fn audio_extension(output_format: &str) -> &'static str {
    match output_format {
        "ulaw_8000" => "ulaw",
        "alaw_8000" => "alaw",
        "pcm_8000" => "sln",
        "pcm_16000" => "sln16",
        "pcm_24000" => "sln24",
        "pcm_44100" => "sln44",
        "pcm_48000" => "sln48",
        f if f.starts_with("mp3") => "mp3",
        f if f.starts_with("opus") => "opus",
        _ => "raw",
    }
}

fn sanitize_file_stem(hint: &str) -> String {
    let stem: String = hint
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        "speech".to_string()
    } else {
        stem
    }
}
