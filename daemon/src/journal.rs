/// Bounded, durable per-channel history of went-live / went-offline events.
///
/// Each channel has one pretty-printed JSON array at
/// `<dir>/<channel>_history.json`, oldest record first. Unreadable or corrupt
/// files are treated as empty history. Writes go to a temporary sibling that
/// is renamed over the target, so an interrupted write leaves the previous
/// file intact.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::event::{EventKind, TransitionEvent};
use crate::model::ChannelId;

/// One persisted history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub timestamp: DateTime<Utc>,
    pub channel: ChannelId,
    pub event: EventKind,
    pub title: String,
    pub category: String,
    pub viewers: u64,
}

impl EventRecord {
    /// Builds the record for an edge event. `StillLive` is never journaled
    /// and yields `None`.
    pub fn from_event(event: &TransitionEvent, timestamp: DateTime<Utc>) -> Option<Self> {
        let kind = event.kind()?;
        let snapshot = match event {
            TransitionEvent::WentLive(s) => Some(s),
            TransitionEvent::WentOffline(_, last) => last.as_ref(),
            TransitionEvent::StillLive(..) => None,
        };
        Some(Self {
            timestamp,
            channel: event.channel_id().clone(),
            event: kind,
            title: snapshot.map(|s| s.title.clone()).unwrap_or_default(),
            category: snapshot.map(|s| s.category.clone()).unwrap_or_default(),
            viewers: snapshot.map_or(0, |s| s.viewer_count),
        })
    }
}

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("journal I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize journal: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub struct EventJournal {
    dir: PathBuf,
    capacity: usize,
}

impl EventJournal {
    /// Creates a journal rooted at `dir` keeping at most `capacity` records
    /// per channel (at least one).
    pub fn new(dir: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            dir: dir.into(),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Path of the history file for `channel`.
    pub fn path_for(&self, channel: &ChannelId) -> PathBuf {
        self.dir
            .join(format!("{}_history.json", sanitize_file_stem(channel.as_str())))
    }

    /// Reads the stored history for `channel`, oldest first. Missing or
    /// unreadable files yield an empty history.
    pub fn history(&self, channel: &ChannelId) -> Vec<EventRecord> {
        load_records(&self.path_for(channel))
    }

    /// Appends `record` to `channel`'s history, dropping the oldest entries
    /// beyond capacity.
    pub fn append(&self, channel: &ChannelId, record: EventRecord) -> Result<(), JournalError> {
        let path = self.path_for(channel);
        let mut records = load_records(&path);
        records.push(record);
        if records.len() > self.capacity {
            let excess = records.len() - self.capacity;
            records.drain(..excess);
        }
        self.persist(&path, &records)
    }

    fn persist(&self, path: &Path, records: &[EventRecord]) -> Result<(), JournalError> {
        std::fs::create_dir_all(&self.dir).map_err(io_err(&self.dir))?;

        let content = serde_json::to_string_pretty(records)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, content).map_err(io_err(&tmp))?;
        std::fs::rename(&tmp, path).map_err(io_err(path))
    }
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> JournalError {
    let path = path.to_path_buf();
    move |source| JournalError::Io { path, source }
}

fn load_records(path: &Path) -> Vec<EventRecord> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            tracing::warn!("unreadable journal {}, starting fresh: {e}", path.display());
            return Vec::new();
        }
    };
    serde_json::from_str(&content).unwrap_or_else(|e| {
        tracing::warn!("corrupt journal {}, starting fresh: {e}", path.display());
        Vec::new()
    })
}

/// Replaces characters outside `[A-Za-z0-9_-]` with `_`.
fn sanitize_file_stem(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect()
}
