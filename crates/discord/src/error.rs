use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DiscordError>;

#[derive(Debug, Error)]
pub enum DiscordError {
    #[error("http error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("json error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("websocket error: {0}")]
    WebSocketError(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("rate limited, retry after {retry_after:?}s")]
    RateLimited { retry_after: Option<f64> },
    #[error("api error {status}: {body}")]
    ApiError { status: StatusCode, body: String },
    #[error("gateway protocol error: {0}")]
    Protocol(String),
}

impl DiscordError {
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }
}
