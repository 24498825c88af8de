use async_trait::async_trait;
use thiserror::Error;

use crate::credential::{BearerCredential, CredentialError};
use crate::model::{ChannelId, StatusSnapshot};

/// Why a status fetch produced no information this round. Never fatal.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),
    /// The upstream rejected the bearer credential (HTTP 401).
    #[error("credential rejected by upstream")]
    Unauthorized,
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("no credential available: {0}")]
    Credential(#[from] CredentialError),
}

/// Returns the current status of a channel.
///
/// A channel with no active broadcast is a successful, not-live snapshot
/// (see [`StatusSnapshot::offline`]), not an error.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch_status(
        &self,
        channel: &ChannelId,
        credential: &BearerCredential,
    ) -> Result<StatusSnapshot, FetchError>;
}
