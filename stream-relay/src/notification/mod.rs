//! Outbound Discord messages.
//!
//! [`ChatSink`] is the seam between the bot logic and the Discord REST API;
//! [`Notifier`] builds the embeds and swallows delivery failures.

pub mod embeds;
pub mod keywords;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use discord_client::{Message, MessagePayload, RestClient, Snowflake};
use helix_client::Clip;
use tracing::{error, info};

pub use keywords::{KEYWORD_REPLIES, KeywordResponder};

/// Channel-message operations the bot relies on.
#[async_trait]
pub trait ChatSink: Send + Sync {
    async fn send(
        &self,
        channel_id: Snowflake,
        payload: &MessagePayload,
    ) -> discord_client::Result<Message>;

    async fn edit(
        &self,
        channel_id: Snowflake,
        message_id: Snowflake,
        payload: &MessagePayload,
    ) -> discord_client::Result<Message>;

    async fn latest_message(&self, channel_id: Snowflake)
    -> discord_client::Result<Option<Message>>;
}

#[async_trait]
impl ChatSink for RestClient {
    async fn send(
        &self,
        channel_id: Snowflake,
        payload: &MessagePayload,
    ) -> discord_client::Result<Message> {
        self.create_message(channel_id, payload).await
    }

    async fn edit(
        &self,
        channel_id: Snowflake,
        message_id: Snowflake,
        payload: &MessagePayload,
    ) -> discord_client::Result<Message> {
        self.edit_message(channel_id, message_id, payload).await
    }

    async fn latest_message(
        &self,
        channel_id: Snowflake,
    ) -> discord_client::Result<Option<Message>> {
        RestClient::latest_message(self, channel_id).await
    }
}

/// Sends live, clip and keyword messages. Never fails: delivery errors are
/// logged and dropped.
#[derive(Clone)]
pub struct Notifier {
    sink: Arc<dyn ChatSink>,
    timezone: Tz,
}

impl Notifier {
    pub fn new(sink: Arc<dyn ChatSink>, timezone: Tz) -> Self {
        Self { sink, timezone }
    }

    pub async fn announce_live(
        &self,
        channel_id: Snowflake,
        display_name: &str,
        login: &str,
        now: DateTime<Utc>,
    ) {
        let embed = embeds::live_embed(display_name, login, now, self.timezone);
        if self
            .deliver(channel_id, MessagePayload::embed(embed), "live announcement")
            .await
        {
            info!(streamer = login, channel = %channel_id, "Live announcement sent");
        }
    }

    pub async fn announce_clip(&self, channel_id: Snowflake, clip: &Clip, now: DateTime<Utc>) {
        let embed = embeds::clip_embed(clip, now, self.timezone);
        if self
            .deliver(channel_id, MessagePayload::embed(embed), "clip announcement")
            .await
        {
            info!(clip = %clip.id, channel = %channel_id, "Clip announcement sent");
        }
    }

    pub async fn send_reply(&self, channel_id: Snowflake, reply: &str) {
        self.deliver(channel_id, MessagePayload::text(reply), "keyword reply")
            .await;
    }

    async fn deliver(&self, channel_id: Snowflake, payload: MessagePayload, what: &str) -> bool {
        match self.sink.send(channel_id, &payload).await {
            Ok(_) => true,
            Err(e) => {
                error!(channel = %channel_id, error = %e, "Failed to send {what}");
                false
            }
        }
    }
}
