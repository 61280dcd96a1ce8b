//! Streaming platform access used by the poller.
//!
//! Every operation here is fail-closed: errors are logged and turned into
//! "no data" (`None` / `false`) so a bad tick never aborts the poll loop.

use async_trait::async_trait;
use helix_client::{AccessToken, Clip, HelixClient};
use tracing::{debug, error};

/// What the poller needs from the streaming platform.
#[async_trait]
pub trait StreamPlatform: Send + Sync {
    /// Platform id of a login name, `None` if unknown or on failure.
    async fn resolve_broadcaster_id(&self, login: &str) -> Option<String>;

    /// Whether the channel is live. `false` on any failure.
    async fn is_live(&self, login: &str) -> bool;

    /// Most recent clip of a broadcaster, `None` if there is none or on failure.
    async fn fetch_latest_clip(&self, broadcaster_id: &str) -> Option<Clip>;
}

/// Twitch implementation backed by Helix.
///
/// Each call authenticates from scratch; tokens are never cached.
pub struct TwitchPlatform {
    helix: HelixClient,
}

impl TwitchPlatform {
    pub fn new(helix: HelixClient) -> Self {
        Self { helix }
    }

    /// Fetch a fresh app access token.
    pub async fn fetch_access_token(&self) -> Option<AccessToken> {
        match self.helix.fetch_app_token().await {
            Ok(token) => Some(token),
            Err(e) => {
                error!(error = %e, "Failed to fetch Twitch access token");
                None
            }
        }
    }
}

#[async_trait]
impl StreamPlatform for TwitchPlatform {
    async fn resolve_broadcaster_id(&self, login: &str) -> Option<String> {
        let token = self.fetch_access_token().await?;
        match self.helix.get_user_by_login(&token, login).await {
            Ok(Some(user)) => Some(user.id),
            Ok(None) => {
                error!(login, "Twitch user not found");
                None
            }
            Err(e) => {
                error!(login, error = %e, "Failed to resolve broadcaster id");
                None
            }
        }
    }

    async fn is_live(&self, login: &str) -> bool {
        let Some(token) = self.fetch_access_token().await else {
            return false;
        };
        match self.helix.get_streams(&token, login).await {
            Ok(streams) => {
                debug!(login, active = streams.len(), "Fetched stream status");
                !streams.is_empty()
            }
            Err(e) => {
                error!(login, error = %e, "Failed to check live status");
                false
            }
        }
    }

    async fn fetch_latest_clip(&self, broadcaster_id: &str) -> Option<Clip> {
        let token = self.fetch_access_token().await?;
        match self.helix.get_clips(&token, broadcaster_id, 1).await {
            Ok(clips) => clips.into_iter().next(),
            Err(e) => {
                error!(broadcaster_id, error = %e, "Failed to fetch latest clip");
                None
            }
        }
    }
}
