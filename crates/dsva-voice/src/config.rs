use serde::{Deserialize, Serialize};
use std::fmt;

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    150
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_elevenlabs_base_url() -> String {
    "https://api.elevenlabs.io".to_string()
}

fn default_voice_id() -> String {
    "JBFqnCBsd6RMkjVDRZzb".to_string()
}

fn default_tts_model() -> String {
    "eleven_turbo_v2_5".to_string()
}

fn default_output_format() -> String {
    "ulaw_8000".to_string()
}

fn default_sounds_dir() -> String {
    "/tmp/dsva-sounds".to_string()
}

/// Settings for the chat-completions text generator.
#[derive(Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    #[serde(default, skip_serializing)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Upper bound for one completion request.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Optional file whose contents replace the built-in system prompt.
    #[serde(default)]
    pub system_prompt_path: Option<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            api_key: String::new(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            system_prompt_path: None,
        }
    }
}

impl fmt::Debug for GeneratorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .field("system_prompt_path", &self.system_prompt_path)
            .finish()
    }
}

/// Settings for the text-to-speech synthesizer.
#[derive(Clone, Serialize, Deserialize)]
pub struct SynthesizerConfig {
    #[serde(default = "default_elevenlabs_base_url")]
    pub base_url: String,
    #[serde(default, skip_serializing)]
    pub api_key: String,
    #[serde(default = "default_voice_id")]
    pub voice_id: String,
    #[serde(default = "default_tts_model")]
    pub model_id: String,
    /// Vendor output format, e.g. `ulaw_8000` or `mp3_44100_128`.
    #[serde(default = "default_output_format")]
    pub output_format: String,
    /// Directory the telephony platform can read rendered audio from.
    #[serde(default = "default_sounds_dir")]
    pub sounds_dir: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SynthesizerConfig {
    fn default() -> Self {
        Self {
            base_url: default_elevenlabs_base_url(),
            api_key: String::new(),
            voice_id: default_voice_id(),
            model_id: default_tts_model(),
            output_format: default_output_format(),
            sounds_dir: default_sounds_dir(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl fmt::Debug for SynthesizerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SynthesizerConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("voice_id", &self.voice_id)
            .field("model_id", &self.model_id)
            .field("output_format", &self.output_format)
            .field("sounds_dir", &self.sounds_dir)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}
