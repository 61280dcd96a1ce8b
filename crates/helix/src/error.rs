use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, HelixError>;

#[derive(Debug, Error)]
pub enum HelixError {
    #[error("http error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("json error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("api error {status}: {body}")]
    ApiError { status: StatusCode, body: String },
    #[error("token response did not contain an access token")]
    MissingAccessToken,
}
