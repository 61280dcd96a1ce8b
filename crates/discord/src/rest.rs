//! Channel message REST calls.

use std::fmt;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::error::{DiscordError, Result};
use crate::models::{Message, MessagePayload, Snowflake};

const DEFAULT_API_BASE: &str = "https://discord.com/api/v10/";

/// Authenticated client for the Discord HTTP API.
///
/// Requests are not retried; a 429 surfaces as [`DiscordError::RateLimited`].
#[derive(Clone)]
pub struct RestClient {
    client: Client,
    token: String,
    base_url: Url,
}

impl fmt::Debug for RestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl RestClient {
    pub fn new(client: Client, token: impl Into<String>) -> Result<Self> {
        Self::with_base_url(client, token, DEFAULT_API_BASE)
    }

    /// Client rooted at a custom API base. The base must end with a slash.
    pub fn with_base_url(client: Client, token: impl Into<String>, base_url: &str) -> Result<Self> {
        Ok(Self {
            client,
            token: token.into(),
            base_url: Url::parse(base_url)?,
        })
    }

    /// `POST /channels/{channel}/messages`
    pub async fn create_message(
        &self,
        channel_id: Snowflake,
        payload: &MessagePayload,
    ) -> Result<Message> {
        let path = format!("channels/{channel_id}/messages");
        let message: Message = self
            .execute(self.request(Method::POST, &path)?.json(payload))
            .await?;
        debug!(channel = %channel_id, message = %message.id, "Message created");
        Ok(message)
    }

    /// `PATCH /channels/{channel}/messages/{message}`
    pub async fn edit_message(
        &self,
        channel_id: Snowflake,
        message_id: Snowflake,
        payload: &MessagePayload,
    ) -> Result<Message> {
        let path = format!("channels/{channel_id}/messages/{message_id}");
        let message: Message = self
            .execute(self.request(Method::PATCH, &path)?.json(payload))
            .await?;
        debug!(channel = %channel_id, message = %message.id, "Message edited");
        Ok(message)
    }

    /// Most recent message of a channel, if any.
    pub async fn latest_message(&self, channel_id: Snowflake) -> Result<Option<Message>> {
        let path = format!("channels/{channel_id}/messages");
        let messages: Vec<Message> = self
            .execute(self.request(Method::GET, &path)?.query(&[("limit", "1")]))
            .await?;
        Ok(messages.into_iter().next())
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = self.base_url.join(path)?;
        Ok(self
            .client
            .request(method, url)
            .header(reqwest::header::AUTHORIZATION, format!("Bot {}", self.token)))
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        let body = check_status(response).await?.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = parse_retry_after(&response);
        warn!(?retry_after, "Discord rate limit hit");
        return Err(DiscordError::RateLimited { retry_after });
    }

    let body = response.text().await.unwrap_or_default();
    Err(DiscordError::ApiError { status, body })
}

/// Seconds to wait as advertised by a 429 response.
fn parse_retry_after(response: &Response) -> Option<f64> {
    ["Retry-After", "X-RateLimit-Reset-After"]
        .iter()
        .find_map(|name| response.headers().get(*name)?.to_str().ok()?.parse().ok())
}
