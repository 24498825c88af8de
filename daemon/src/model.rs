/// Channel identity, point-in-time status snapshots and per-channel state.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a monitored channel (the Twitch login name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(String);

impl ChannelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Public watch page for the channel.
    pub fn watch_url(&self) -> String {
        format!("https://twitch.tv/{}", self.0)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChannelId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// The observed status of one channel as of a single poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub channel_id: ChannelId,
    pub display_name: String,
    pub is_live: bool,
    pub title: String,
    pub category: String,
    pub viewer_count: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub thumbnail_url: String,
}

impl StatusSnapshot {
    /// The canonical snapshot for a channel with no active broadcast.
    pub fn offline(channel_id: ChannelId) -> Self {
        Self {
            display_name: channel_id.as_str().to_string(),
            channel_id,
            is_live: false,
            title: String::new(),
            category: String::new(),
            viewer_count: 0,
            started_at: None,
            thumbnail_url: String::new(),
        }
    }
}

/// Last known liveness of a channel. Owned by the poll loop; one per channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelState {
    pub channel_id: ChannelId,
    pub last_known_live: bool,
    pub last_snapshot: Option<StatusSnapshot>,
}

impl ChannelState {
    /// State before the first poll. Every channel starts out offline, so a
    /// channel that is already live at startup reports a fresh transition.
    pub fn initial(channel_id: ChannelId) -> Self {
        Self {
            channel_id,
            last_known_live: false,
            last_snapshot: None,
        }
    }
}
