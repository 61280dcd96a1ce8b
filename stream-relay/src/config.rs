//! Runtime configuration loaded from environment variables.
//!
//! Required variables fail fast at startup; everything else falls back to the
//! defaults below.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;
use discord_client::Snowflake;

use crate::{Error, Result};

/// Poll interval for both the stream checker and the status publisher.
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// Timezone used for the footers of every embed.
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::America::Sao_Paulo;

const REQUIRED_VARS: &[&str] = &[
    "DISCORD_TOKEN",
    "GUILD_ID",
    "CLIP_CHANNEL_ID",
    "CHAT_CHANNEL_ID",
    "STATUS_CHANNEL_ID",
    "STATUS_URL",
    "TWITCH_CLIENT_ID",
    "TWITCH_CLIENT_SECRET",
    "TWITCH_USERNAME",
];

#[derive(Clone)]
pub struct BotConfig {
    pub discord_token: String,
    pub guild_id: Snowflake,
    pub clip_channel_id: Snowflake,
    pub chat_channel_id: Snowflake,
    pub status_channel_id: Snowflake,
    /// Where "now live" embeds go. Defaults to the status channel.
    pub live_channel_id: Snowflake,
    pub status_url: String,
    pub twitch_client_id: String,
    pub twitch_client_secret: String,
    pub twitch_username: String,
    pub streamer_display_name: String,
    pub check_interval: Duration,
    pub status_interval: Duration,
    pub timezone: Tz,
    /// Zero keeps the HTTP client's default (no timeout).
    pub request_timeout: Duration,
    pub log_dir: Option<PathBuf>,
}

impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotConfig")
            .field("discord_token", &"<redacted>")
            .field("guild_id", &self.guild_id)
            .field("clip_channel_id", &self.clip_channel_id)
            .field("chat_channel_id", &self.chat_channel_id)
            .field("status_channel_id", &self.status_channel_id)
            .field("live_channel_id", &self.live_channel_id)
            .field("status_url", &self.status_url)
            .field("twitch_client_id", &self.twitch_client_id)
            .field("twitch_client_secret", &"<redacted>")
            .field("twitch_username", &self.twitch_username)
            .field("streamer_display_name", &self.streamer_display_name)
            .field("check_interval", &self.check_interval)
            .field("status_interval", &self.status_interval)
            .field("timezone", &self.timezone)
            .field("request_timeout", &self.request_timeout)
            .field("log_dir", &self.log_dir)
            .finish()
    }
}

impl BotConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(env_value)
    }

    /// Load from an arbitrary key lookup. Blank values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| non_blank(lookup(key));

        let missing: Vec<&str> = REQUIRED_VARS
            .iter()
            .copied()
            .filter(|key| get(*key).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(Error::config(format!(
                "missing required environment variables: {}",
                missing.join(", ")
            )));
        }

        let required = |key: &str| get(key).unwrap_or_default();

        let status_url = required("STATUS_URL");
        reqwest::Url::parse(&status_url)
            .map_err(|e| Error::config(format!("STATUS_URL is not a valid URL: {e}")))?;

        let status_channel_id = parse_var("STATUS_CHANNEL_ID", &required("STATUS_CHANNEL_ID"))?;
        let live_channel_id = match get("LIVE_CHANNEL_ID") {
            Some(raw) => parse_var("LIVE_CHANNEL_ID", &raw)?,
            None => status_channel_id,
        };

        let twitch_username = required("TWITCH_USERNAME").to_lowercase();
        let streamer_display_name =
            get("STREAMER_DISPLAY_NAME").unwrap_or_else(|| twitch_username.clone());

        let timezone = match get("TIMEZONE") {
            Some(raw) => raw
                .parse::<Tz>()
                .map_err(|e| Error::config(format!("TIMEZONE '{raw}' is invalid: {e}")))?,
            None => DEFAULT_TIMEZONE,
        };

        Ok(Self {
            discord_token: required("DISCORD_TOKEN"),
            guild_id: parse_var("GUILD_ID", &required("GUILD_ID"))?,
            clip_channel_id: parse_var("CLIP_CHANNEL_ID", &required("CLIP_CHANNEL_ID"))?,
            chat_channel_id: parse_var("CHAT_CHANNEL_ID", &required("CHAT_CHANNEL_ID"))?,
            status_channel_id,
            live_channel_id,
            status_url,
            twitch_client_id: required("TWITCH_CLIENT_ID"),
            twitch_client_secret: required("TWITCH_CLIENT_SECRET"),
            twitch_username,
            streamer_display_name,
            check_interval: interval_var(&get, "CHECK_INTERVAL_SECS")?,
            status_interval: interval_var(&get, "STATUS_INTERVAL_SECS")?,
            timezone,
            request_timeout: Duration::from_secs(
                get("REQUEST_TIMEOUT_SECS")
                    .map(|raw| parse_var::<u64>("REQUEST_TIMEOUT_SECS", &raw))
                    .transpose()?
                    .unwrap_or(0),
            ),
            log_dir: get("LOG_DIR").map(PathBuf::from),
        })
    }
}

/// A single environment variable under the same rules as [`BotConfig`]:
/// trimmed, blank counts as unset.
pub fn env_value(key: &str) -> Option<String> {
    non_blank(std::env::var(key).ok())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.parse()
        .map_err(|e| Error::config(format!("{key} has invalid value '{raw}': {e}")))
}

fn interval_var<F>(get: &F, key: &str) -> Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => {
            let secs: u64 = parse_var(key, &raw)?;
            if secs == 0 {
                return Err(Error::config(format!("{key} must be greater than zero")));
            }
            Ok(Duration::from_secs(secs))
        }
        None => Ok(DEFAULT_CHECK_INTERVAL),
    }
}
