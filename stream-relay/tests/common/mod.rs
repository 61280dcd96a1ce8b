#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use discord_client::{DiscordError, Message, MessagePayload, Snowflake, User};
use helix_client::Clip;
use reqwest::StatusCode;
use stream_relay::monitor::StreamPlatform;
use stream_relay::notification::ChatSink;

pub const BOT_ID: Snowflake = Snowflake(900);

/// Platform answering from per-call scripts. An exhausted script repeats its
/// last answer.
#[derive(Default)]
pub struct ScriptedPlatform {
    live: Mutex<VecDeque<bool>>,
    clips: Mutex<VecDeque<Option<Clip>>>,
    broadcaster_id: Mutex<Option<String>>,
    pub resolve_calls: AtomicU64,
}

impl ScriptedPlatform {
    pub fn new(broadcaster_id: Option<&str>) -> Self {
        Self {
            broadcaster_id: Mutex::new(broadcaster_id.map(str::to_string)),
            ..Default::default()
        }
    }

    pub fn push_live(&self, live: impl IntoIterator<Item = bool>) {
        self.live.lock().unwrap().extend(live);
    }

    pub fn push_clips(&self, clips: impl IntoIterator<Item = Option<Clip>>) {
        self.clips.lock().unwrap().extend(clips);
    }

    pub fn set_broadcaster_id(&self, id: Option<&str>) {
        *self.broadcaster_id.lock().unwrap() = id.map(str::to_string);
    }
}

fn next_scripted<T: Clone>(queue: &Mutex<VecDeque<T>>, fallback: T) -> T {
    let mut queue = queue.lock().unwrap();
    if queue.len() > 1 {
        queue.pop_front().unwrap_or(fallback)
    } else {
        queue.front().cloned().unwrap_or(fallback)
    }
}

#[async_trait]
impl StreamPlatform for ScriptedPlatform {
    async fn resolve_broadcaster_id(&self, _login: &str) -> Option<String> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        self.broadcaster_id.lock().unwrap().clone()
    }

    async fn is_live(&self, _login: &str) -> bool {
        next_scripted(&self.live, false)
    }

    async fn fetch_latest_clip(&self, _broadcaster_id: &str) -> Option<Clip> {
        next_scripted(&self.clips, None)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SinkCall {
    Send {
        channel: Snowflake,
        payload: MessagePayload,
    },
    Edit {
        channel: Snowflake,
        message: Snowflake,
        payload: MessagePayload,
    },
}

/// Sink that records every call and remembers the latest message per
/// channel, authored by [`BOT_ID`].
#[derive(Default)]
pub struct RecordingSink {
    calls: Mutex<Vec<SinkCall>>,
    latest: Mutex<HashMap<Snowflake, Message>>,
    next_id: AtomicU64,
    pub fail: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<SinkCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn sends_to(&self, channel: Snowflake) -> Vec<MessagePayload> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                SinkCall::Send { channel: c, payload } if c == channel => Some(payload),
                _ => None,
            })
            .collect()
    }

    /// Pretend someone else posted in `channel`.
    pub fn set_latest(&self, message: Message) {
        self.latest
            .lock()
            .unwrap()
            .insert(message.channel_id, message);
    }

    fn failure(&self) -> Option<DiscordError> {
        self.fail.load(Ordering::SeqCst).then(|| DiscordError::ApiError {
            status: StatusCode::FORBIDDEN,
            body: "Missing Access".to_string(),
        })
    }
}

pub fn message(id: u64, channel: Snowflake, author: Snowflake, payload: &MessagePayload) -> Message {
    Message {
        id: Snowflake(id),
        channel_id: channel,
        guild_id: None,
        author: User {
            id: author,
            username: "author".to_string(),
            global_name: None,
            bot: author == BOT_ID,
        },
        content: payload.content.clone().unwrap_or_default(),
        embeds: payload.embeds.clone(),
    }
}

#[async_trait]
impl ChatSink for RecordingSink {
    async fn send(
        &self,
        channel_id: Snowflake,
        payload: &MessagePayload,
    ) -> discord_client::Result<Message> {
        self.calls.lock().unwrap().push(SinkCall::Send {
            channel: channel_id,
            payload: payload.clone(),
        });
        if let Some(e) = self.failure() {
            return Err(e);
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let sent = message(id, channel_id, BOT_ID, payload);
        self.set_latest(sent.clone());
        Ok(sent)
    }

    async fn edit(
        &self,
        channel_id: Snowflake,
        message_id: Snowflake,
        payload: &MessagePayload,
    ) -> discord_client::Result<Message> {
        self.calls.lock().unwrap().push(SinkCall::Edit {
            channel: channel_id,
            message: message_id,
            payload: payload.clone(),
        });
        if let Some(e) = self.failure() {
            return Err(e);
        }
        let edited = message(message_id.get(), channel_id, BOT_ID, payload);
        self.set_latest(edited.clone());
        Ok(edited)
    }

    async fn latest_message(
        &self,
        channel_id: Snowflake,
    ) -> discord_client::Result<Option<Message>> {
        Ok(self.latest.lock().unwrap().get(&channel_id).cloned())
    }
}
