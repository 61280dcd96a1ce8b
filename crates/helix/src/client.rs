//! HTTP client for the Helix endpoints.

use std::fmt;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::error::{HelixError, Result};
use crate::models::{AccessToken, Clip, HelixResponse, Stream, TokenResponse, User};

const DEFAULT_TOKEN_URL: &str = "https://id.twitch.tv/oauth2/token";
const DEFAULT_API_BASE: &str = "https://api.twitch.tv/helix/";

/// Application credentials registered on the Twitch developer console.
#[derive(Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl ClientCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Where the token endpoint and the Helix API live.
#[derive(Debug, Clone)]
pub struct HelixEndpoints {
    pub token_url: Url,
    /// Base URL of the Helix API. Must end with a slash.
    pub api_base: Url,
}

impl Default for HelixEndpoints {
    fn default() -> Self {
        Self {
            token_url: Url::parse(DEFAULT_TOKEN_URL).expect("valid default token url"),
            api_base: Url::parse(DEFAULT_API_BASE).expect("valid default api url"),
        }
    }
}

impl HelixEndpoints {
    /// Endpoints rooted at a custom origin (`{origin}/oauth2/token` and `{origin}/helix/`).
    pub fn with_origin(origin: &str) -> Result<Self> {
        let origin = Url::parse(origin)?;
        Ok(Self {
            token_url: origin.join("/oauth2/token")?,
            api_base: origin.join("/helix/")?,
        })
    }
}

/// Helix API client.
///
/// Calls are single-shot: no retries and no token caching, the caller decides
/// how often to authenticate.
#[derive(Debug, Clone)]
pub struct HelixClient {
    client: Client,
    credentials: ClientCredentials,
    endpoints: HelixEndpoints,
}

impl HelixClient {
    pub fn new(client: Client, credentials: ClientCredentials) -> Self {
        Self::with_endpoints(client, credentials, HelixEndpoints::default())
    }

    pub fn with_endpoints(
        client: Client,
        credentials: ClientCredentials,
        endpoints: HelixEndpoints,
    ) -> Self {
        Self {
            client,
            credentials,
            endpoints,
        }
    }

    /// Request an app access token with the client-credentials grant.
    ///
    /// The secret travels in the query string, so transport errors are
    /// stripped of their URL before they can reach a log line.
    pub async fn fetch_app_token(&self) -> Result<AccessToken> {
        let response = self
            .client
            .post(self.endpoints.token_url.clone())
            .query(&[
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;

        let body = check_status(response)
            .await?
            .text()
            .await
            .map_err(reqwest::Error::without_url)?;
        let token: TokenResponse = serde_json::from_str(&body)?;
        let access_token = token
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or(HelixError::MissingAccessToken)?;

        debug!(expires_in = ?token.expires_in, "Obtained app access token");
        Ok(AccessToken::new(access_token, token.expires_in))
    }

    /// Look up a user by login name.
    pub async fn get_user_by_login(&self, token: &AccessToken, login: &str) -> Result<Option<User>> {
        let users: Vec<User> = self.get(token, "users", &[("login", login)]).await?;
        Ok(users.into_iter().next())
    }

    /// Active streams for a login name. Empty when the channel is offline.
    pub async fn get_streams(&self, token: &AccessToken, user_login: &str) -> Result<Vec<Stream>> {
        self.get(token, "streams", &[("user_login", user_login)]).await
    }

    /// Clips of a broadcaster, at most `first` of them.
    pub async fn get_clips(
        &self,
        token: &AccessToken,
        broadcaster_id: &str,
        first: u8,
    ) -> Result<Vec<Clip>> {
        let first = first.clamp(1, 100).to_string();
        self.get(
            token,
            "clips",
            &[("broadcaster_id", broadcaster_id), ("first", first.as_str())],
        )
        .await
    }

    async fn get<T: DeserializeOwned>(
        &self,
        token: &AccessToken,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>> {
        let url = self.endpoints.api_base.join(endpoint)?;
        trace!(%url, ?query, "Helix request");

        let response = self
            .client
            .get(url)
            .query(query)
            .header("Client-Id", &self.credentials.client_id)
            .bearer_auth(token.secret())
            .send()
            .await?;

        let body = check_status(response).await?.text().await?;
        let envelope: HelixResponse<T> = serde_json::from_str(&body)?;
        Ok(envelope.data)
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(HelixError::ApiError { status, body })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::json;
    use std::collections::HashMap;
    use tokio::net::TcpListener;

    async fn spawn_api(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn authorized(headers: &HeaderMap) -> bool {
        headers.get("client-id").and_then(|v| v.to_str().ok()) == Some("cid")
            && headers.get("authorization").and_then(|v| v.to_str().ok()) == Some("Bearer tok")
    }

    async fn token_handler(Query(params): Query<HashMap<String, String>>) -> impl IntoResponse {
        if params.get("grant_type").map(String::as_str) != Some("client_credentials")
            || params.get("client_secret").map(String::as_str) != Some("secret")
        {
            return (StatusCode::BAD_REQUEST, Json(json!({"message": "bad grant"})));
        }
        (
            StatusCode::OK,
            Json(json!({"access_token": "tok", "expires_in": 3600, "token_type": "bearer"})),
        )
    }

    async fn users_handler(
        headers: HeaderMap,
        Query(params): Query<HashMap<String, String>>,
    ) -> impl IntoResponse {
        if !authorized(&headers) {
            return (StatusCode::UNAUTHORIZED, Json(json!({"message": "invalid token"})));
        }
        let data = match params.get("login").map(String::as_str) {
            Some("golpebaixo") => json!([{"id": "4242", "login": "golpebaixo", "display_name": "GolpeBaixo"}]),
            _ => json!([]),
        };
        (StatusCode::OK, Json(json!({ "data": data })))
    }

    async fn clips_handler(Query(params): Query<HashMap<String, String>>) -> Json<serde_json::Value> {
        assert_eq!(params.get("first").map(String::as_str), Some("1"));
        Json(json!({"data": [{
            "id": "clip-1",
            "url": "https://clips.twitch.tv/clip-1",
            "title": "que lance",
            "broadcaster_id": params.get("broadcaster_id").cloned().unwrap_or_default()
        }]}))
    }

    fn test_client() -> Client {
        // reqwest is built without a default rustls provider
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
        Client::new()
    }

    fn client_for(origin: &str, secret: &str) -> HelixClient {
        HelixClient::with_endpoints(
            test_client(),
            ClientCredentials::new("cid", secret),
            HelixEndpoints::with_origin(origin).unwrap(),
        )
    }

    fn app() -> Router {
        Router::new()
            .route("/oauth2/token", post(token_handler))
            .route("/helix/users", get(users_handler))
            .route("/helix/streams", get(|| async { Json(json!({"data": []})) }))
            .route("/helix/clips", get(clips_handler))
    }

    #[tokio::test]
    async fn test_fetch_app_token() {
        let origin = spawn_api(app()).await;
        let client = client_for(&origin, "secret");

        let token = client.fetch_app_token().await.unwrap();
        assert_eq!(token.secret(), "tok");
        assert_eq!(token.expires_in(), Some(3600));
    }

    #[tokio::test]
    async fn test_fetch_app_token_rejected() {
        let origin = spawn_api(app()).await;
        let client = client_for(&origin, "wrong");

        let err = client.fetch_app_token().await.unwrap_err();
        assert!(matches!(
            err,
            HelixError::ApiError { status, .. } if status == StatusCode::BAD_REQUEST
        ));
    }

    #[tokio::test]
    async fn test_token_transport_error_hides_secret() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let origin = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);
        let client = client_for(&origin, "TOPSECRET");

        let err = client.fetch_app_token().await.unwrap_err();

        assert!(matches!(err, HelixError::HttpError(_)));
        assert!(!err.to_string().contains("TOPSECRET"));
        assert!(!format!("{err:?}").contains("TOPSECRET"));
    }

    #[tokio::test]
    async fn test_token_response_without_access_token() {
        let app = Router::new().route(
            "/oauth2/token",
            post(|| async { Json(json!({"status": 200})) }),
        );
        let origin = spawn_api(app).await;
        let client = client_for(&origin, "secret");

        let err = client.fetch_app_token().await.unwrap_err();
        assert!(matches!(err, HelixError::MissingAccessToken));
    }

    #[tokio::test]
    async fn test_get_user_by_login() {
        let origin = spawn_api(app()).await;
        let client = client_for(&origin, "secret");
        let token = AccessToken::new("tok", None);

        let user = client
            .get_user_by_login(&token, "golpebaixo")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.id, "4242");

        let missing = client.get_user_by_login(&token, "nobody").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_unauthorized_request() {
        let origin = spawn_api(app()).await;
        let client = client_for(&origin, "secret");
        let token = AccessToken::new("expired", None);

        let err = client
            .get_user_by_login(&token, "golpebaixo")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            HelixError::ApiError { status, .. } if status == StatusCode::UNAUTHORIZED
        ));
    }

    #[tokio::test]
    async fn test_get_streams_offline() {
        let origin = spawn_api(app()).await;
        let client = client_for(&origin, "secret");
        let token = AccessToken::new("tok", None);

        let streams = client.get_streams(&token, "golpebaixo").await.unwrap();
        assert!(streams.is_empty());
    }

    #[tokio::test]
    async fn test_get_clips() {
        let origin = spawn_api(app()).await;
        let client = client_for(&origin, "secret");
        let token = AccessToken::new("tok", None);

        let clips = client.get_clips(&token, "4242", 1).await.unwrap();
        assert_eq!(clips.len(), 1);
        assert_eq!(clips[0].id, "clip-1");
        assert_eq!(clips[0].title, "que lance");
    }

    #[test]
    fn test_endpoints_with_origin() {
        let endpoints = HelixEndpoints::with_origin("http://127.0.0.1:9000").unwrap();
        assert_eq!(endpoints.token_url.as_str(), "http://127.0.0.1:9000/oauth2/token");
        assert_eq!(
            endpoints.api_base.join("clips").unwrap().as_str(),
            "http://127.0.0.1:9000/helix/clips"
        );
    }

    #[test]
    fn test_credentials_debug_is_redacted() {
        let creds = ClientCredentials::new("cid", "very-secret");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("cid"));
        assert!(!debug.contains("very-secret"));
    }
}
