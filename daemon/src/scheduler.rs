/// Periodic polling of every configured channel.
///
/// Each round fetches one snapshot per channel in configured order, runs the
/// transition detector against that channel's state, and hands edge events to
/// the notification fanout and the journal. Errors stay local to the channel
/// (fetch, journal) or the sink (notifications); only a missing initial
/// credential stops the scheduler.
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::watch;

use crate::credential::{BearerCredential, CredentialError, CredentialProvider};
use crate::detector::{detect, format_uptime};
use crate::event::TransitionEvent;
use crate::journal::{EventJournal, EventRecord};
use crate::model::{ChannelId, ChannelState, StatusSnapshot};
use crate::notify::NotificationFanout;
use crate::source::{FetchError, StatusSource};
use crate::status::{self, DaemonStatus, SchedulerState};

/// What happened during one [`PollScheduler::run_round`].
#[derive(Debug, Default)]
pub struct RoundSummary {
    /// Channels whose snapshot was fetched and evaluated.
    pub processed: usize,
    /// Channels skipped this round because no snapshot could be obtained.
    pub failed: usize,
    /// Events produced this round, in channel order.
    pub events: Vec<TransitionEvent>,
}

pub struct PollScheduler {
    channels: Vec<ChannelState>,
    credentials: Box<dyn CredentialProvider>,
    source: Box<dyn StatusSource>,
    fanout: NotificationFanout,
    journal: EventJournal,
    interval: Duration,
    status: DaemonStatus,
    status_path: Option<PathBuf>,
}

impl PollScheduler {
    pub fn new(
        channels: impl IntoIterator<Item = ChannelId>,
        credentials: Box<dyn CredentialProvider>,
        source: Box<dyn StatusSource>,
        fanout: NotificationFanout,
        journal: EventJournal,
        interval: Duration,
    ) -> Self {
        Self {
            channels: channels.into_iter().map(ChannelState::initial).collect(),
            credentials,
            source,
            fanout,
            journal,
            interval,
            status: DaemonStatus::new(),
            status_path: None,
        }
    }

    /// Mirrors scheduler status into a TOML file after every round.
    pub fn with_status_file(mut self, path: PathBuf) -> Self {
        self.status_path = Some(path);
        self
    }

    pub fn state(&self) -> SchedulerState {
        self.status.state
    }

    #[cfg(test)]
    pub fn channel_states(&self) -> &[ChannelState] {
        &self.channels
    }

    /// Obtains the initial credential. Failure is unrecoverable: the
    /// scheduler moves to `Stopped` and the error is returned to the caller.
    pub async fn prime(&mut self) -> Result<(), CredentialError> {
        match self.credentials.get_token().await {
            Ok(_) => {
                self.publish_status();
                Ok(())
            }
            Err(e) => {
                self.status.error = Some(format!("startup failed: {e}"));
                self.stop();
                Err(e)
            }
        }
    }

    /// Runs rounds until `stop` flips to `true` (or its sender is dropped),
    /// sleeping `interval` between rounds. Returns the final state.
    pub async fn run(mut self, mut stop: watch::Receiver<bool>) -> SchedulerState {
        if self.state() == SchedulerState::Stopped {
            return SchedulerState::Stopped;
        }
        tracing::info!(
            "watching {} channel(s) every {}s: {}",
            self.channels.len(),
            self.interval.as_secs(),
            self.channels
                .iter()
                .map(|c| c.channel_id.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        tracing::info!("journal keeps the last {} events per channel", self.journal.capacity());
        for channel in &self.channels {
            if let Some(last) = self.journal.history(&channel.channel_id).last() {
                tracing::debug!(
                    "[{}] last journaled event: {:?} at {}",
                    channel.channel_id,
                    last.event,
                    last.timestamp
                );
            }
        }

        loop {
            if *stop.borrow() {
                break;
            }
            let summary = self.run_round(Utc::now()).await;
            tracing::debug!(
                "round complete: {} processed, {} failed, {} event(s)",
                summary.processed,
                summary.failed,
                summary.events.len()
            );

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("poll scheduler stopped");
        self.stop();
        SchedulerState::Stopped
    }

    /// Polls every channel once, evaluating transitions at `now`.
    pub async fn run_round(&mut self, now: DateTime<Utc>) -> RoundSummary {
        let mut summary = RoundSummary::default();

        let mut credential = match self.credentials.get_token().await {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("skipping round, no credential: {e}");
                summary.failed = self.channels.len();
                self.status.error = Some(format!("credential refresh failed: {e}"));
                self.publish_status();
                return summary;
            }
        };

        let mut last_error = None;
        for i in 0..self.channels.len() {
            let channel = self.channels[i].channel_id.clone();
            let mut snapshot = match self.fetch(&channel, &mut credential).await {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!("[{channel}] status fetch failed: {e}");
                    last_error = Some(format!("{channel}: {e}"));
                    summary.failed += 1;
                    continue;
                }
            };

            // Events and journal entries are keyed by the configured channel.
            snapshot.channel_id = channel;
            let (next, event) = detect(&self.channels[i], snapshot, now);
            self.channels[i] = next;
            summary.processed += 1;

            if let Some(event) = event {
                self.react(&event, now).await;
                summary.events.push(event);
            }
        }

        self.status.live_channels = self
            .channels
            .iter()
            .filter(|c| c.last_known_live)
            .map(|c| c.channel_id.to_string())
            .collect();
        self.status.last_round_at = Some(now.to_rfc3339());
        self.status.error = last_error;
        self.publish_status();
        summary
    }

    /// Fetches one snapshot. A rejected credential is refreshed and the fetch
    /// retried once.
    async fn fetch(
        &mut self,
        channel: &ChannelId,
        credential: &mut BearerCredential,
    ) -> Result<StatusSnapshot, FetchError> {
        match self.source.fetch_status(channel, credential).await {
            Err(FetchError::Unauthorized) => {
                tracing::info!("[{channel}] credential rejected, refreshing");
                self.credentials.invalidate();
                *credential = self.credentials.get_token().await?;
                self.source.fetch_status(channel, credential).await
            }
            other => other,
        }
    }

    async fn react(&self, event: &TransitionEvent, now: DateTime<Utc>) {
        match event {
            TransitionEvent::WentLive(s) => {
                tracing::info!("{} is now LIVE ({} viewers)", s.display_name, s.viewer_count);
                tracing::info!("   Title: {}", s.title);
                tracing::info!("   Category: {}", s.category);
            }
            TransitionEvent::WentOffline(..) => {
                tracing::info!("{} went offline", event.display_name());
            }
            TransitionEvent::StillLive(s, uptime) => {
                tracing::info!(
                    "{} live for {} with {} viewers",
                    s.display_name,
                    format_uptime(*uptime),
                    s.viewer_count
                );
                return;
            }
        }

        let report = self.fanout.dispatch(event).await;
        tracing::debug!(
            "[{}] notifications: {} delivered, {} failed",
            event.channel_id(),
            report.delivered,
            report.failed
        );

        if let Some(record) = EventRecord::from_event(event, now) {
            if let Err(e) = self.journal.append(event.channel_id(), record) {
                tracing::warn!("[{}] failed to journal event: {e}", event.channel_id());
            }
        }
    }

    fn stop(&mut self) {
        self.status.state = SchedulerState::Stopped;
        self.publish_status();
    }

    fn publish_status(&self) {
        if let Some(path) = &self.status_path {
            status::write_status(path, &self.status);
        }
    }
}
