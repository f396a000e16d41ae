//! Text and speech generation for the DSVA voice agent.
//!
//! Two stateless leaves sit behind small traits so the call controller and
//! the HTTP API never see a concrete vendor:
//!
//! - [`ResponseGenerator`] turns a conversation transcript into the next
//!   assistant utterance ([`OpenAiGenerator`] talks to any OpenAI-compatible
//!   chat-completions endpoint).
//! - [`SpeechSynthesizer`] renders an utterance to an audio file the
//!   telephony platform can play ([`ElevenLabsSynthesizer`]).

pub mod config;
pub mod error;
pub mod llm;
pub mod prompt;
pub mod tts;

pub use config::{GeneratorConfig, SynthesizerConfig};
pub use error::VoiceError;
pub use llm::{OpenAiGenerator, ResponseGenerator};
pub use prompt::{load_system_prompt, ALEX_SYSTEM_PROMPT};
pub use tts::{AudioArtifact, ElevenLabsSynthesizer, SpeechSynthesizer};
