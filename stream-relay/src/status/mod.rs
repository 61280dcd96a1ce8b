//! Rolling service-status message.
//!
//! Each tick probes the health URL and keeps a single status embed in the
//! status channel up to date: the bot's previous status message is edited in
//! place, anything else gets a fresh message.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use discord_client::{Message, MessagePayload, Snowflake};
use reqwest::{Client, StatusCode};
use tracing::{debug, error, info, warn};

use crate::notification::ChatSink;
use crate::notification::embeds::{STATUS_TITLE, status_embed};

/// Result of a health probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceStatus {
    Online,
    Offline,
}

impl ServiceStatus {
    pub fn is_online(self) -> bool {
        matches!(self, Self::Online)
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Online => f.write_str("online"),
            Self::Offline => f.write_str("offline"),
        }
    }
}

/// GET `url`; only HTTP 200 counts as online.
pub async fn probe(client: &Client, url: &str) -> ServiceStatus {
    match client.get(url).send().await {
        Ok(response) if response.status() == StatusCode::OK => ServiceStatus::Online,
        Ok(response) => {
            debug!(url, status = %response.status(), "Health check returned non-200");
            ServiceStatus::Offline
        }
        Err(e) => {
            warn!(url, error = %e, "Health check request failed");
            ServiceStatus::Offline
        }
    }
}

/// What a publisher tick did with the status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishAction {
    Edited,
    Sent,
    Failed,
}

pub struct StatusPublisher {
    client: Client,
    url: String,
    channel_id: Snowflake,
    sink: Arc<dyn ChatSink>,
    timezone: Tz,
}

impl StatusPublisher {
    pub fn new(
        client: Client,
        url: impl Into<String>,
        channel_id: Snowflake,
        sink: Arc<dyn ChatSink>,
        timezone: Tz,
    ) -> Self {
        Self {
            client,
            url: url.into(),
            channel_id,
            sink,
            timezone,
        }
    }

    /// Probe the service and publish the result.
    pub async fn tick(
        &self,
        self_id: Option<Snowflake>,
        now: DateTime<Utc>,
    ) -> (ServiceStatus, PublishAction) {
        let status = probe(&self.client, &self.url).await;
        let payload = MessagePayload::embed(status_embed(status.is_online(), now, self.timezone));
        let action = self.publish(self_id, &payload).await;
        info!(%status, ?action, "Service status published");
        (status, action)
    }

    async fn publish(&self, self_id: Option<Snowflake>, payload: &MessagePayload) -> PublishAction {
        let previous = match self.sink.latest_message(self.channel_id).await {
            Ok(message) => message.filter(|m| is_own_status_message(m, self_id)),
            Err(e) => {
                error!(channel = %self.channel_id, error = %e, "Failed to fetch latest status message");
                None
            }
        };

        if let Some(previous) = previous {
            return match self.sink.edit(self.channel_id, previous.id, payload).await {
                Ok(_) => PublishAction::Edited,
                Err(e) => {
                    error!(message = %previous.id, error = %e, "Failed to edit status message");
                    PublishAction::Failed
                }
            };
        }

        match self.sink.send(self.channel_id, payload).await {
            Ok(_) => PublishAction::Sent,
            Err(e) => {
                error!(channel = %self.channel_id, error = %e, "Failed to send status message");
                PublishAction::Failed
            }
        }
    }
}

/// A message the bot posted whose first embed is a status embed.
fn is_own_status_message(message: &Message, self_id: Option<Snowflake>) -> bool {
    self_id.is_some_and(|id| id == message.author.id)
        && message
            .embeds
            .first()
            .and_then(|embed| embed.title.as_deref())
            == Some(STATUS_TITLE)
}
