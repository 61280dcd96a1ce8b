//! Edge-triggered live detection and clip deduplication.

use chrono::{DateTime, Utc};
use discord_client::Snowflake;
use tracing::{debug, info};

use super::platform::StreamPlatform;
use crate::notification::Notifier;

/// Remembered live state of the monitored channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LiveState {
    #[default]
    Offline,
    /// Live, and the "now live" message has already been sent for this run.
    LiveNotified,
}

impl LiveState {
    /// Next state for a fresh `is_live` observation, plus whether a "now live"
    /// message is due.
    pub fn observe(self, live: bool) -> (Self, bool) {
        match (self, live) {
            (Self::Offline, true) => (Self::LiveNotified, true),
            (Self::Offline, false) => (Self::Offline, false),
            (Self::LiveNotified, true) => (Self::LiveNotified, false),
            (Self::LiveNotified, false) => (Self::Offline, false),
        }
    }
}

/// What a single tick announced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub live_announced: bool,
    pub clip_announced: bool,
}

/// Owns all remembered state for one monitored channel.
#[derive(Debug)]
pub struct StreamPoller {
    login: String,
    display_name: String,
    live_channel_id: Snowflake,
    clip_channel_id: Snowflake,
    live_state: LiveState,
    last_clip_id: Option<String>,
    broadcaster_id: Option<String>,
}

impl StreamPoller {
    pub fn new(
        login: impl Into<String>,
        display_name: impl Into<String>,
        live_channel_id: Snowflake,
        clip_channel_id: Snowflake,
    ) -> Self {
        Self {
            login: login.into(),
            display_name: display_name.into(),
            live_channel_id,
            clip_channel_id,
            live_state: LiveState::Offline,
            last_clip_id: None,
            broadcaster_id: None,
        }
    }

    pub fn login(&self) -> &str {
        &self.login
    }

    pub fn live_state(&self) -> LiveState {
        self.live_state
    }

    pub fn last_clip_id(&self) -> Option<&str> {
        self.last_clip_id.as_deref()
    }

    pub fn broadcaster_id(&self) -> Option<&str> {
        self.broadcaster_id.as_deref()
    }

    /// Run one live check followed by one clip check.
    pub async fn tick(
        &mut self,
        platform: &dyn StreamPlatform,
        notifier: &Notifier,
        now: DateTime<Utc>,
    ) -> TickReport {
        let live_announced = self.check_live(platform, notifier, now).await;
        let clip_announced = self.check_clip(platform, notifier, now).await;
        TickReport {
            live_announced,
            clip_announced,
        }
    }

    async fn check_live(
        &mut self,
        platform: &dyn StreamPlatform,
        notifier: &Notifier,
        now: DateTime<Utc>,
    ) -> bool {
        let live = platform.is_live(&self.login).await;
        let (next, announce) = self.live_state.observe(live);
        if next != self.live_state {
            info!(streamer = %self.login, from = ?self.live_state, to = ?next, "Live state changed");
        }
        // The state advances even if the send below fails.
        self.live_state = next;

        if announce {
            notifier
                .announce_live(self.live_channel_id, &self.display_name, &self.login, now)
                .await;
        }
        announce
    }

    async fn check_clip(
        &mut self,
        platform: &dyn StreamPlatform,
        notifier: &Notifier,
        now: DateTime<Utc>,
    ) -> bool {
        if self.broadcaster_id.is_none() {
            self.broadcaster_id = platform.resolve_broadcaster_id(&self.login).await;
        }
        let Some(broadcaster_id) = self.broadcaster_id.as_deref() else {
            debug!(streamer = %self.login, "Broadcaster id unknown, skipping clip check");
            return false;
        };

        let Some(clip) = platform.fetch_latest_clip(broadcaster_id).await else {
            info!(streamer = %self.login, "No clip found");
            return false;
        };

        if self.last_clip_id.as_deref() == Some(clip.id.as_str()) {
            info!(clip = %clip.id, "No new clip");
            return false;
        }

        notifier.announce_clip(self.clip_channel_id, &clip, now).await;
        self.last_clip_id = Some(clip.id);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(LiveState::Offline, true, LiveState::LiveNotified, true)]
    #[case(LiveState::Offline, false, LiveState::Offline, false)]
    #[case(LiveState::LiveNotified, true, LiveState::LiveNotified, false)]
    #[case(LiveState::LiveNotified, false, LiveState::Offline, false)]
    fn test_observe(
        #[case] from: LiveState,
        #[case] live: bool,
        #[case] to: LiveState,
        #[case] announce: bool,
    ) {
        assert_eq!(from.observe(live), (to, announce));
    }

    #[test]
    fn test_one_announcement_per_live_run() {
        let observations = [false, true, true, true, false, false, true, true, false];
        let mut state = LiveState::default();
        let mut announcements = 0;
        for live in observations {
            let (next, announce) = state.observe(live);
            state = next;
            announcements += usize::from(announce);
        }
        assert_eq!(announcements, 2);
        assert_eq!(state, LiveState::Offline);
    }

    #[test]
    fn test_new_poller_starts_offline() {
        let poller = StreamPoller::new("golpebaixo", "Golpe Baixo", Snowflake(1), Snowflake(2));
        assert_eq!(poller.live_state(), LiveState::Offline);
        assert!(poller.last_clip_id().is_none());
        assert!(poller.broadcaster_id().is_none());
        assert_eq!(poller.login(), "golpebaixo");
    }
}
