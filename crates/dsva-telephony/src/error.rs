use thiserror::Error;

#[derive(Error, Debug)]
pub enum TelephonyError {
    #[error("telephony request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("telephony platform rejected {operation} with status {status}: {body}")]
    Rejected {
        operation: &'static str,
        status: u16,
        body: String,
    },

    #[error("event stream error: {0}")]
    EventStream(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("invalid telephony URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("malformed telephony message: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("call {0} already has an active session")]
    DuplicateCall(String),

    #[error("speech recognition failed: {0}")]
    Recognition(String),
}
