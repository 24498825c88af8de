use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::model::{ChannelId, StatusSnapshot};

/// A semantic change (or continuation) of a channel's live state, produced at
/// most once per channel per poll round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionEvent {
    /// The channel was offline and is now broadcasting.
    WentLive(StatusSnapshot),
    /// The channel was live and has stopped. Carries the last live snapshot,
    /// if one was seen.
    WentOffline(ChannelId, Option<StatusSnapshot>),
    /// The channel is still live. Informational only: never dispatched to
    /// sinks and never journaled.
    StillLive(StatusSnapshot, Duration),
}

impl TransitionEvent {
    pub fn channel_id(&self) -> &ChannelId {
        match self {
            TransitionEvent::WentLive(s) | TransitionEvent::StillLive(s, _) => &s.channel_id,
            TransitionEvent::WentOffline(id, _) => id,
        }
    }

    /// The persisted kind of an edge event. `None` for `StillLive`.
    pub fn kind(&self) -> Option<EventKind> {
        match self {
            TransitionEvent::WentLive(_) => Some(EventKind::WentLive),
            TransitionEvent::WentOffline(..) => Some(EventKind::WentOffline),
            TransitionEvent::StillLive(..) => None,
        }
    }

    /// Whether the event fires on a live/offline edge (and so should notify).
    pub fn is_edge(&self) -> bool {
        self.kind().is_some()
    }

    /// Display name from the most relevant snapshot, falling back to the id.
    pub fn display_name(&self) -> &str {
        match self {
            TransitionEvent::WentLive(s) | TransitionEvent::StillLive(s, _) => &s.display_name,
            TransitionEvent::WentOffline(id, last) => last
                .as_ref()
                .map(|s| s.display_name.as_str())
                .unwrap_or(id.as_str()),
        }
    }
}

/// Kind tag of a journaled event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    WentLive,
    WentOffline,
}
