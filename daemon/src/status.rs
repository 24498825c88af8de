use serde::{Deserialize, Serialize};
use std::path::Path;

/// Lifecycle state of the poll scheduler.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerState {
    /// Polling rounds are being run.
    Running,
    /// Cancelled or failed at startup; no further rounds will run.
    Stopped,
}

/// Runtime status written by the daemon to `<data dir>/status.toml`.
/// External tools read this file to see what the daemon currently observes.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DaemonStatus {
    /// Daemon binary version (set from Cargo.toml at compile time).
    pub version: String,
    pub state: SchedulerState,
    /// Channels that were live as of the last completed round.
    #[serde(default)]
    pub live_channels: Vec<String>,
    /// RFC 3339 timestamp of the last completed round, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_round_at: Option<String>,
    /// Most recent non-fatal error, cleared by a clean round.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DaemonStatus {
    /// Constructs the initial running status on daemon startup.
    pub fn new() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            state: SchedulerState::Running,
            live_channels: Vec::new(),
            last_round_at: None,
            error: None,
        }
    }
}

impl Default for DaemonStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializes `status` to TOML and writes it to `path`.
/// Creates the parent directory if it does not exist.
/// Failures are logged, never propagated: a status write must not stop polling.
pub fn write_status(path: &Path, status: &DaemonStatus) {
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::warn!("failed to create status directory {}: {e}", parent.display());
            return;
        }
    }
    match toml::to_string_pretty(status) {
        Ok(content) => {
            if let Err(e) = std::fs::write(path, content) {
                tracing::warn!("failed to write status file {}: {e}", path.display());
            }
        }
        Err(e) => tracing::warn!("failed to serialize status: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── DaemonStatus::new ─────────────────────────────────────────────────────

    #[test]
    fn new_starts_running() {
        let s = DaemonStatus::new();
        assert_eq!(s.state, SchedulerState::Running);
        assert!(s.live_channels.is_empty());
        assert!(s.last_round_at.is_none());
        assert!(s.error.is_none());
    }

    #[test]
    fn new_version_matches_cargo_pkg() {
        assert_eq!(DaemonStatus::new().version, env!("CARGO_PKG_VERSION"));
    }

    // ── serialization ─────────────────────────────────────────────────────────

    #[test]
    fn state_serializes_to_lowercase() {
        let mut s = DaemonStatus::new();
        assert!(toml::to_string_pretty(&s).unwrap().contains("state = \"running\""));
        s.state = SchedulerState::Stopped;
        assert!(toml::to_string_pretty(&s).unwrap().contains("state = \"stopped\""));
    }

    // ── write_status ──────────────────────────────────────────────────────────

    #[test]
    fn write_status_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("status.toml");
        write_status(&path, &DaemonStatus::new());
        assert!(path.exists());
    }

    #[test]
    fn write_status_content_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("status.toml");

        let mut original = DaemonStatus::new();
        original.live_channels = vec!["kaicenat".to_string()];
        original.last_round_at = Some("2025-03-01T18:00:00+00:00".to_string());
        write_status(&path, &original);

        let parsed: DaemonStatus =
            toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.state, SchedulerState::Running);
        assert_eq!(parsed.live_channels, vec!["kaicenat"]);
        assert_eq!(parsed.last_round_at.as_deref(), Some("2025-03-01T18:00:00+00:00"));
    }

    #[test]
    fn write_status_omits_none_optional_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("status.toml");
        write_status(&path, &DaemonStatus::new());

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(!content.contains("last_round_at"));
        assert!(!content.contains("error"));
    }
}
