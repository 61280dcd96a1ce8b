//! Discord API objects, trimmed to the fields a notification bot uses.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Discord snowflake id. Serialized as a string, accepted as string or number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Snowflake(pub u64);

impl Snowflake {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Snowflake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Snowflake {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Snowflake)
    }
}

impl From<u64> for Snowflake {
    fn from(value: u64) -> Self {
        Snowflake(value)
    }
}

impl Serialize for Snowflake {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Snowflake {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Str(String),
            Num(u64),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Str(s) => s.parse().map_err(serde::de::Error::custom),
            Raw::Num(n) => Ok(Snowflake(n)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: Snowflake,
    pub username: String,
    #[serde(default)]
    pub global_name: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmbedFooter {
    pub text: String,
}

/// Rich embed payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Embed {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl Embed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn color(mut self, color: u32) -> Self {
        self.color = Some(color);
        self
    }

    pub fn footer(mut self, text: impl Into<String>) -> Self {
        self.footer = Some(EmbedFooter { text: text.into() });
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    pub author: User,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub embeds: Vec<Embed>,
}

/// Body of a create or edit message request.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct MessagePayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
}

impl MessagePayload {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            embeds: Vec::new(),
        }
    }

    pub fn embed(embed: Embed) -> Self {
        Self {
            content: None,
            embeds: vec![embed],
        }
    }
}

/// Payload of the `READY` dispatch.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadyEvent {
    pub user: User,
    pub session_id: String,
    #[serde(default)]
    pub resume_gateway_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snowflake_accepts_string_and_number() {
        let from_str: Snowflake = serde_json::from_str(r#""175928847299117063""#).unwrap();
        let from_num: Snowflake = serde_json::from_str("175928847299117063").unwrap();
        assert_eq!(from_str, from_num);
        assert_eq!(
            serde_json::to_string(&from_str).unwrap(),
            r#""175928847299117063""#
        );
    }

    #[test]
    fn test_snowflake_rejects_garbage() {
        assert!(serde_json::from_str::<Snowflake>(r#""abc""#).is_err());
        assert!("".parse::<Snowflake>().is_err());
    }

    #[test]
    fn test_embed_skips_empty_fields() {
        let embed = Embed::new().title("hello").color(0x9146FF);
        let json = serde_json::to_value(&embed).unwrap();
        assert_eq!(json["title"], "hello");
        assert_eq!(json["color"], 0x9146FF);
        assert!(json.get("description").is_none());
        assert!(json.get("footer").is_none());
    }

    #[test]
    fn test_decode_message_create() {
        let body = r#"{
            "id": "1100000000000000001",
            "channel_id": "1100000000000000002",
            "guild_id": "1100000000000000003",
            "author": {"id": "1100000000000000004", "username": "fulano", "discriminator": "0"},
            "content": "salve rapaziada",
            "embeds": [],
            "tts": false
        }"#;
        let message: Message = serde_json::from_str(body).unwrap();
        assert_eq!(message.channel_id, Snowflake(1100000000000000002));
        assert_eq!(message.guild_id, Some(Snowflake(1100000000000000003)));
        assert!(!message.author.bot);
        assert_eq!(message.content, "salve rapaziada");
    }

    #[test]
    fn test_payload_serialization() {
        let text = serde_json::to_value(MessagePayload::text("oi")).unwrap();
        assert_eq!(text["content"], "oi");
        assert!(text.get("embeds").is_none());

        let embed = serde_json::to_value(MessagePayload::embed(Embed::new().footer("f"))).unwrap();
        assert!(embed.get("content").is_none());
        assert_eq!(embed["embeds"][0]["footer"]["text"], "f");
    }
}
