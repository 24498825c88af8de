/// Delivery of went-live / went-offline events to notification sinks.
///
/// Every sink is called concurrently and bounded by its own timeout. A sink
/// that fails or times out is logged and skipped; it never affects the other
/// sinks or the caller.
pub mod desktop;
pub mod webhook;

use async_trait::async_trait;
use futures_util::future::join_all;
use std::time::Duration;
use thiserror::Error;

use crate::config::SinksConfig;
use crate::event::TransitionEvent;

pub use desktop::DesktopSink;
pub use webhook::WebhookSink;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to launch notifier: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("notifier exited with {0}")]
    Command(String),
    #[error("request failed: {0}")]
    Request(String),
    #[error("endpoint rejected the notification (HTTP {0})")]
    Rejected(u16),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// A notification target.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Short name used in log lines (e.g. `"desktop"`).
    fn name(&self) -> &str;

    async fn deliver(&self, event: &TransitionEvent) -> Result<(), SinkError>;
}

/// Title and body text shared by the sinks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

impl Notification {
    /// Renders an edge event. `StillLive` has no notification.
    pub fn for_event(event: &TransitionEvent) -> Option<Self> {
        match event {
            TransitionEvent::WentLive(s) => Some(Self {
                title: format!("{} is LIVE!", s.display_name),
                body: format!(
                    "{} ({} viewers)\nPlaying: {}",
                    s.title, s.viewer_count, s.category
                ),
            }),
            TransitionEvent::WentOffline(_, last) => Some(Self {
                title: format!("{} went offline", event.display_name()),
                body: last
                    .as_ref()
                    .map(|s| s.title.clone())
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| "Stream ended".to_string()),
            }),
            TransitionEvent::StillLive(..) => None,
        }
    }
}

/// Outcome counts of one [`NotificationFanout::dispatch`] call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: usize,
}

pub struct NotificationFanout {
    sinks: Vec<Box<dyn Sink>>,
    timeout: Duration,
}

impl NotificationFanout {
    pub fn new(timeout: Duration) -> Self {
        Self {
            sinks: Vec::new(),
            timeout,
        }
    }

    /// Builds the fanout from config. Disabled sinks are not registered, and
    /// the desktop sink is left out when the host has no notifier.
    pub fn from_config(config: &SinksConfig, http: reqwest::Client) -> Self {
        let mut fanout = Self::new(Duration::from_secs(config.sink_timeout_secs.max(1)));

        if config.desktop {
            match DesktopSink::detect() {
                Some(sink) => fanout.add(Box::new(sink)),
                None => tracing::warn!("desktop notifications unavailable on this host; skipping"),
            }
        }
        if let Some(url) = config.webhook.active_url() {
            let request_timeout = Duration::from_secs(config.webhook.timeout_secs.max(1));
            fanout.add(Box::new(WebhookSink::new(http, url, request_timeout)));
        }
        fanout
    }

    pub fn add(&mut self, sink: Box<dyn Sink>) {
        self.sinks.push(sink);
    }

    pub fn sink_names(&self) -> Vec<&str> {
        self.sinks.iter().map(|s| s.name()).collect()
    }

    /// Delivers an edge event to every sink. `StillLive` is ignored.
    pub async fn dispatch(&self, event: &TransitionEvent) -> DispatchReport {
        let mut report = DispatchReport::default();
        if !event.is_edge() {
            return report;
        }

        let deliveries = self.sinks.iter().map(|sink| async move {
            let result = match tokio::time::timeout(self.timeout, sink.deliver(event)).await {
                Ok(r) => r,
                Err(_) => Err(SinkError::Timeout(self.timeout)),
            };
            (sink.name(), result)
        });

        for (name, result) in join_all(deliveries).await {
            match result {
                Ok(()) => {
                    report.delivered += 1;
                    tracing::debug!("[{name}] notified for {}", event.channel_id());
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!("[{name}] notification for {} failed: {e}", event.channel_id());
                }
            }
        }
        report
    }
}
