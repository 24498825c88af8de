/// Discord-compatible webhook notifications.
///
/// Best effort: one POST per event, bounded by a short timeout, no retry.
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

use super::{Sink, SinkError};
use crate::event::TransitionEvent;

/// Twitch brand purple used for the embed accent.
const EMBED_COLOR: u32 = 0x9147FF;

pub struct WebhookSink {
    http: Client,
    url: String,
    timeout: Duration,
}

impl WebhookSink {
    pub fn new(http: Client, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http,
            url: url.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Sink for WebhookSink {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn deliver(&self, event: &TransitionEvent) -> Result<(), SinkError> {
        let Some(body) = payload(event) else {
            return Ok(());
        };
        let resp = self
            .http
            .post(&self.url)
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| SinkError::Request(e.to_string()))?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(SinkError::Rejected(resp.status().as_u16()))
        }
    }
}

/// JSON body for an edge event: a content line plus one embed carrying the
/// stream title, channel link, category and viewer count.
pub fn payload(event: &TransitionEvent) -> Option<Value> {
    let (content, snapshot) = match event {
        TransitionEvent::WentLive(s) => (format!("**{}** just went LIVE!", s.display_name), Some(s)),
        TransitionEvent::WentOffline(_, last) => (
            format!("**{}** went offline", event.display_name()),
            last.as_ref(),
        ),
        TransitionEvent::StillLive(..) => return None,
    };

    let title = snapshot.map(|s| s.title.as_str()).filter(|t| !t.is_empty());
    let category = snapshot.map(|s| s.category.as_str()).filter(|c| !c.is_empty());
    let viewers = snapshot.map_or(0, |s| s.viewer_count);
    let url = event.channel_id().watch_url();

    Some(json!({
        "content": content,
        "embeds": [{
            "title": title.unwrap_or("Live Now!"),
            "url": url,
            "color": EMBED_COLOR,
            "fields": [
                { "name": "Game", "value": category.unwrap_or("Unknown"), "inline": true },
                { "name": "Viewers", "value": viewers.to_string(), "inline": true },
            ],
        }],
    }))
}
