use thiserror::Error;

#[derive(Error, Debug)]
pub enum WebhookError {
    #[error("invalid webhook configuration: {0}")]
    Validation(String),

    #[error("failed to persist webhook configuration: {0}")]
    Persistence(#[from] std::io::Error),

    #[error("failed to encode webhook configuration: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("webhook delivery failed: {0}")]
    Network(#[from] reqwest::Error),
}
