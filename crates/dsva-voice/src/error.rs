use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("upstream request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("upstream service error: {0}")]
    Upstream(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("failed to store audio: {0}")]
    Io(#[from] std::io::Error),
}
