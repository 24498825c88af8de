/// Edge detection over consecutive status snapshots of one channel.
///
/// [`detect`] is a pure function: the caller owns the [`ChannelState`] and
/// supplies the evaluation time, so the same inputs always yield the same
/// output.
use chrono::{DateTime, Duration, Utc};

use crate::event::TransitionEvent;
use crate::model::{ChannelState, StatusSnapshot};

/// Compares `snapshot` against `previous` and returns the next state together
/// with the event the change produced, if any.
pub fn detect(
    previous: &ChannelState,
    snapshot: StatusSnapshot,
    now: DateTime<Utc>,
) -> (ChannelState, Option<TransitionEvent>) {
    let event = match (previous.last_known_live, snapshot.is_live) {
        (false, true) => Some(TransitionEvent::WentLive(snapshot.clone())),
        (true, false) => Some(TransitionEvent::WentOffline(
            previous.channel_id.clone(),
            previous.last_snapshot.clone(),
        )),
        (true, true) => {
            let uptime = uptime(snapshot.started_at, now);
            Some(TransitionEvent::StillLive(snapshot.clone(), uptime))
        }
        (false, false) => return (previous.clone(), None),
    };

    let next = ChannelState {
        channel_id: previous.channel_id.clone(),
        last_known_live: snapshot.is_live,
        last_snapshot: Some(snapshot),
    };
    (next, event)
}

/// Time elapsed since `started_at`, clamped to zero. Absent start time is zero.
pub fn uptime(started_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Duration {
    match started_at {
        Some(start) => (now - start).max(Duration::zero()),
        None => Duration::zero(),
    }
}

/// Renders a duration as `"{h}h {m}m"`, or `"{m}m"` when under an hour.
pub fn format_uptime(uptime: Duration) -> String {
    let minutes = uptime.num_minutes().max(0);
    let (h, m) = (minutes / 60, minutes % 60);
    if h > 0 {
        format!("{h}h {m}m")
    } else {
        format!("{m}m")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ChannelId;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 18, 0, 0).unwrap()
    }

    fn live(started_at: Option<DateTime<Utc>>) -> StatusSnapshot {
        StatusSnapshot {
            channel_id: ChannelId::new("kaicenat"),
            display_name: "KaiCenat".to_string(),
            is_live: true,
            title: "Just Chatting".to_string(),
            category: "Just Chatting".to_string(),
            viewer_count: 500,
            started_at,
            thumbnail_url: String::new(),
        }
    }

    fn offline() -> StatusSnapshot {
        StatusSnapshot::offline(ChannelId::new("kaicenat"))
    }

    fn state(last_known_live: bool) -> ChannelState {
        ChannelState {
            last_known_live,
            ..ChannelState::initial(ChannelId::new("kaicenat"))
        }
    }

    // ── transition rules ──────────────────────────────────────────────────────

    #[test]
    fn offline_to_live_goes_live() {
        let (next, event) = detect(&state(false), live(Some(t0())), t0());
        assert!(next.last_known_live);
        match event {
            Some(TransitionEvent::WentLive(s)) => {
                assert_eq!(s.title, "Just Chatting");
                assert_eq!(s.viewer_count, 500);
            }
            other => panic!("expected WentLive, got {other:?}"),
        }
    }

    #[test]
    fn live_to_offline_goes_offline_with_last_snapshot() {
        let previous = ChannelState {
            last_snapshot: Some(live(Some(t0()))),
            ..state(true)
        };
        let (next, event) = detect(&previous, offline(), t0());
        assert!(!next.last_known_live);
        match event {
            Some(TransitionEvent::WentOffline(id, last)) => {
                assert_eq!(id.as_str(), "kaicenat");
                assert_eq!(last.unwrap().title, "Just Chatting");
            }
            other => panic!("expected WentOffline, got {other:?}"),
        }
    }

    #[test]
    fn live_to_live_reports_uptime() {
        let now = t0() + Duration::minutes(90);
        let (next, event) = detect(&state(true), live(Some(t0())), now);
        assert!(next.last_known_live);
        match event {
            Some(TransitionEvent::StillLive(_, up)) => assert_eq!(format_uptime(up), "1h 30m"),
            other => panic!("expected StillLive, got {other:?}"),
        }
    }

    #[test]
    fn offline_to_offline_is_silent_and_unchanged() {
        let previous = state(false);
        let (next, event) = detect(&previous, offline(), t0());
        assert!(event.is_none());
        assert_eq!(next, previous);
    }

    #[test]
    fn consecutive_live_snapshots_fire_went_live_once() {
        let mut current = state(false);
        let mut went_live = 0;
        let mut still_live = 0;
        for i in 0..4 {
            let (next, event) = detect(&current, live(Some(t0())), t0() + Duration::minutes(i));
            match event {
                Some(TransitionEvent::WentLive(_)) => went_live += 1,
                Some(TransitionEvent::StillLive(..)) => still_live += 1,
                other => panic!("unexpected {other:?}"),
            }
            current = next;
        }
        assert_eq!(went_live, 1);
        assert_eq!(still_live, 3);
    }

    #[test]
    fn detect_is_deterministic() {
        let previous = state(true);
        let snap = live(Some(t0()));
        let now = t0() + Duration::minutes(5);
        assert_eq!(
            detect(&previous, snap.clone(), now),
            detect(&previous, snap, now)
        );
    }

    #[test]
    fn next_state_tracks_latest_snapshot() {
        let (next, _) = detect(&state(false), live(None), t0());
        assert_eq!(next.last_snapshot, Some(live(None)));
    }

    // ── uptime ────────────────────────────────────────────────────────────────

    #[test]
    fn missing_start_time_is_zero_minutes() {
        let (_, event) = detect(&state(true), live(None), t0());
        match event {
            Some(TransitionEvent::StillLive(_, up)) => assert_eq!(format_uptime(up), "0m"),
            other => panic!("expected StillLive, got {other:?}"),
        }
    }

    #[test]
    fn clock_skew_clamps_to_zero() {
        let up = uptime(Some(t0() + Duration::minutes(10)), t0());
        assert_eq!(up, Duration::zero());
        assert_eq!(format_uptime(up), "0m");
    }

    #[test]
    fn format_uptime_minutes_only_under_an_hour() {
        assert_eq!(format_uptime(Duration::minutes(59)), "59m");
        assert_eq!(format_uptime(Duration::seconds(119)), "1m");
    }

    #[test]
    fn format_uptime_whole_hours() {
        assert_eq!(format_uptime(Duration::hours(3)), "3h 0m");
        assert_eq!(format_uptime(Duration::minutes(25 * 60 + 7)), "25h 7m");
    }

    #[test]
    fn format_uptime_negative_renders_zero() {
        assert_eq!(format_uptime(Duration::minutes(-30)), "0m");
    }
}
