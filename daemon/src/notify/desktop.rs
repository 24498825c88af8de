/// Native desktop notifications via the host's notifier program.
///
/// Linux/BSD use `notify-send`; macOS uses `osascript`. Availability is
/// probed once, when the sink is constructed; on hosts without a notifier the
/// sink is never registered.
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;

use super::{Notification, Sink, SinkError};
use crate::event::TransitionEvent;

const APP_NAME: &str = "livewatch";
const EXPIRE_MS: &str = "8000";

// Each platform constructs only its own variant.
#[allow(dead_code)]
#[derive(Debug, Clone, PartialEq, Eq)]
enum Notifier {
    NotifySend(PathBuf),
    Osascript(PathBuf),
}

pub struct DesktopSink {
    notifier: Notifier,
}

impl DesktopSink {
    /// Returns a sink if the host notifier is installed.
    pub fn detect() -> Option<Self> {
        let path = std::env::var_os("PATH")?;
        let dirs: Vec<PathBuf> = std::env::split_paths(&path).collect();
        detect_in(&dirs).map(|notifier| Self { notifier })
    }

    fn command(&self, n: &Notification) -> Command {
        match &self.notifier {
            Notifier::NotifySend(program) => {
                let mut cmd = Command::new(program);
                cmd.args(["--app-name", APP_NAME, "--expire-time", EXPIRE_MS])
                    .arg(&n.title)
                    .arg(&n.body);
                cmd
            }
            Notifier::Osascript(program) => {
                let mut cmd = Command::new(program);
                cmd.arg("-e").arg(applescript(n));
                cmd
            }
        }
    }
}

#[async_trait]
impl Sink for DesktopSink {
    fn name(&self) -> &str {
        "desktop"
    }

    async fn deliver(&self, event: &TransitionEvent) -> Result<(), SinkError> {
        let Some(n) = Notification::for_event(event) else {
            return Ok(());
        };
        let status = self.command(&n).kill_on_drop(true).status().await?;
        if status.success() {
            Ok(())
        } else {
            Err(SinkError::Command(status.to_string()))
        }
    }
}

#[cfg(target_os = "macos")]
fn detect_in(dirs: &[PathBuf]) -> Option<Notifier> {
    find_program(dirs, "osascript").map(Notifier::Osascript)
}

#[cfg(all(unix, not(target_os = "macos")))]
fn detect_in(dirs: &[PathBuf]) -> Option<Notifier> {
    find_program(dirs, "notify-send").map(Notifier::NotifySend)
}

#[cfg(not(unix))]
fn detect_in(_dirs: &[PathBuf]) -> Option<Notifier> {
    None
}

fn find_program(dirs: &[PathBuf], name: &str) -> Option<PathBuf> {
    dirs.iter().map(|d| d.join(name)).find(|p| is_executable(p))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// AppleScript `display notification` statement with quoted strings escaped.
fn applescript(n: &Notification) -> String {
    format!(
        "display notification \"{}\" with title \"{}\"",
        escape_applescript(&n.body),
        escape_applescript(&n.title)
    )
}

fn escape_applescript(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
