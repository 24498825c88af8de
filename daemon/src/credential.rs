/// Bearer credentials for the upstream status API.
///
/// The provider is called only from the poll loop, so implementations take
/// `&mut self` and need no internal locking.
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

/// Credentials are treated as expired this long before their real expiry.
pub const EXPIRY_MARGIN_SECS: i64 = 60;

/// A bearer token together with the instant it stops being accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerCredential {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl BearerCredential {
    pub fn new(token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }

    /// Whether the credential can still be used at `now`, honouring the
    /// early-refresh margin.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_MARGIN_SECS) < self.expires_at
    }
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("token request failed: {0}")]
    Request(String),
    #[error("token endpoint rejected the client credentials (HTTP {0})")]
    Rejected(u16),
    #[error("token response could not be decoded: {0}")]
    Malformed(String),
    #[error("client id and secret are still the placeholder values; edit the config file")]
    PlaceholderCredentials,
}

/// Supplies a currently valid bearer credential on demand.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Returns a cached credential, refreshing it first when missing,
    /// expired or invalidated.
    async fn get_token(&mut self) -> Result<BearerCredential, CredentialError>;

    /// Forgets the cached credential after the upstream rejected it, so the
    /// next [`get_token`](Self::get_token) call refreshes.
    fn invalidate(&mut self);
}

/// Single-slot cache shared by provider implementations.
#[derive(Debug, Default)]
pub struct TokenCache {
    current: Option<BearerCredential>,
}

impl TokenCache {
    /// Returns the cached credential if it is still valid at `now`.
    pub fn valid_at(&self, now: DateTime<Utc>) -> Option<&BearerCredential> {
        self.current.as_ref().filter(|c| c.is_valid_at(now))
    }

    pub fn store(&mut self, credential: BearerCredential) {
        self.current = Some(credential);
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}
