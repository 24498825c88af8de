/// Twitch Helix implementations of [`StatusSource`] and [`CredentialProvider`].
///
/// Credentials use the OAuth client-credentials grant (app access token);
/// stream status comes from `GET /helix/streams?user_login=<channel>`, where
/// an empty `data` array means the channel is not live.
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::config::CredentialsConfig;
use crate::credential::{BearerCredential, CredentialError, CredentialProvider, TokenCache};
use crate::model::{ChannelId, StatusSnapshot};
use crate::source::{FetchError, StatusSource};

const TOKEN_URL: &str = "https://id.twitch.tv/oauth2/token";
const STREAMS_URL: &str = "https://api.twitch.tv/helix/streams";
const TOKEN_TIMEOUT_SECS: u64 = 10;
const STREAMS_TIMEOUT_SECS: u64 = 8;

// ── Wire types ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct StreamsResponse {
    #[serde(default)]
    data: Vec<StreamData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StreamData {
    user_login: String,
    user_name: String,
    title: String,
    game_name: String,
    viewer_count: u64,
    started_at: String,
    thumbnail_url: String,
}

/// Maps a Helix streams response to a snapshot. An empty `data` array is the
/// offline snapshot; otherwise the first entry wins. The snapshot always
/// carries the polled channel id; `user_login` only feeds the display name.
fn snapshot_from_streams(channel: &ChannelId, body: StreamsResponse) -> StatusSnapshot {
    let Some(d) = body.data.into_iter().next() else {
        return StatusSnapshot::offline(channel.clone());
    };
    let display_name = [d.user_name, d.user_login]
        .into_iter()
        .find(|s| !s.is_empty())
        .unwrap_or_else(|| channel.as_str().to_string());
    StatusSnapshot {
        channel_id: channel.clone(),
        display_name,
        is_live: true,
        title: d.title,
        category: d.game_name,
        viewer_count: d.viewer_count,
        started_at: DateTime::parse_from_rfc3339(&d.started_at)
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        thumbnail_url: d.thumbnail_url,
    }
}

fn credential_from_token(resp: TokenResponse, now: DateTime<Utc>) -> BearerCredential {
    BearerCredential::new(resp.access_token, now + Duration::seconds(resp.expires_in))
}

fn is_placeholder(value: &str) -> bool {
    value.trim().is_empty() || value.starts_with("YOUR")
}

// ── Credential provider ───────────────────────────────────────────────────────

/// App access token obtained with the client-credentials grant, cached until
/// shortly before it expires.
pub struct AppTokenProvider {
    http: Client,
    client_id: String,
    client_secret: String,
    cache: TokenCache,
}

impl AppTokenProvider {
    pub fn new(http: Client, credentials: &CredentialsConfig) -> Self {
        Self {
            http,
            client_id: credentials.client_id.clone(),
            client_secret: credentials.client_secret.clone(),
            cache: TokenCache::default(),
        }
    }

    async fn request_token(&self) -> Result<BearerCredential, CredentialError> {
        if is_placeholder(&self.client_id) || is_placeholder(&self.client_secret) {
            return Err(CredentialError::PlaceholderCredentials);
        }
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("grant_type", "client_credentials"),
        ];
        let resp = self
            .http
            .post(TOKEN_URL)
            .query(&params)
            .timeout(std::time::Duration::from_secs(TOKEN_TIMEOUT_SECS))
            .send()
            .await
            .map_err(|e| CredentialError::Request(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(CredentialError::Rejected(resp.status().as_u16()));
        }
        let token = resp
            .json::<TokenResponse>()
            .await
            .map_err(|e| CredentialError::Malformed(e.to_string()))?;
        Ok(credential_from_token(token, Utc::now()))
    }
}

#[async_trait]
impl CredentialProvider for AppTokenProvider {
    async fn get_token(&mut self) -> Result<BearerCredential, CredentialError> {
        if let Some(cached) = self.cache.valid_at(Utc::now()) {
            return Ok(cached.clone());
        }
        let fresh = self.request_token().await?;
        tracing::info!("obtained Twitch app access token (expires {})", fresh.expires_at);
        self.cache.store(fresh.clone());
        Ok(fresh)
    }

    fn invalidate(&mut self) {
        self.cache.clear();
    }
}

// ── Status source ─────────────────────────────────────────────────────────────

/// Queries the Helix streams endpoint for one channel at a time.
pub struct HelixStatusSource {
    http: Client,
    client_id: String,
}

impl HelixStatusSource {
    pub fn new(http: Client, credentials: &CredentialsConfig) -> Self {
        Self {
            http,
            client_id: credentials.client_id.clone(),
        }
    }
}

#[async_trait]
impl StatusSource for HelixStatusSource {
    async fn fetch_status(
        &self,
        channel: &ChannelId,
        credential: &BearerCredential,
    ) -> Result<StatusSnapshot, FetchError> {
        let resp = self
            .http
            .get(STREAMS_URL)
            .query(&[("user_login", channel.as_str())])
            .header("Client-ID", &self.client_id)
            .bearer_auth(&credential.token)
            .timeout(std::time::Duration::from_secs(STREAMS_TIMEOUT_SECS))
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        match resp.status() {
            StatusCode::UNAUTHORIZED => return Err(FetchError::Unauthorized),
            s if !s.is_success() => return Err(FetchError::Status(s.as_u16())),
            _ => {}
        }

        let body = resp
            .json::<StreamsResponse>()
            .await
            .map_err(|e| FetchError::Malformed(e.to_string()))?;
        Ok(snapshot_from_streams(channel, body))
    }
}
