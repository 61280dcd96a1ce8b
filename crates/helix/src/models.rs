//! Helix response payloads.
//!
//! Only the fields the relay reads are required; everything else is
//! defaulted so that additions on Twitch's side never break decoding.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Envelope used by every Helix collection endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct HelixResponse<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

/// Raw body of the OAuth token endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// App access token obtained through the client-credentials grant.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    token: String,
    expires_in: Option<u64>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, expires_in: Option<u64>) -> Self {
        Self {
            token: token.into(),
            expires_in,
        }
    }

    /// The bearer secret, for the `Authorization` header.
    pub fn secret(&self) -> &str {
        &self.token
    }

    /// Lifetime in seconds as reported by the token endpoint.
    pub fn expires_in(&self) -> Option<u64> {
        self.expires_in
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// A Twitch user as returned by `GET /helix/users`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub login: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub profile_image_url: Option<String>,
}

/// An active stream as returned by `GET /helix/streams`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stream {
    pub id: String,
    pub user_id: String,
    pub user_login: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub game_name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub viewer_count: u64,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
}

/// A clip as returned by `GET /helix/clips`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Clip {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub broadcaster_name: String,
    #[serde(default)]
    pub creator_name: String,
    #[serde(default)]
    pub view_count: u64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

impl Clip {
    /// Minimal clip, mostly useful for tests and fakes.
    pub fn new(id: impl Into<String>, url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            title: title.into(),
            broadcaster_name: String::new(),
            creator_name: String::new(),
            view_count: 0,
            created_at: None,
            thumbnail_url: None,
        }
    }
}
