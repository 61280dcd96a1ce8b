//! The application task.
//!
//! A single task owns the poller, the status publisher and the bot identity,
//! and multiplexes gateway events, both timers and shutdown with `select!`.
//! Handlers run to completion before the next event is picked, so no state is
//! shared across tasks.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use discord_client::{GatewayConnection, GatewayEvent, Message, Snowflake};
use tokio::sync::mpsc;
use tokio::time::{Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::BotConfig;
use crate::error::{Error, Result};
use crate::monitor::{StreamPlatform, StreamPoller};
use crate::notification::{ChatSink, KeywordResponder, Notifier};
use crate::status::StatusPublisher;

/// Source of gateway events consumed by [`Relay::run`].
#[async_trait]
pub trait EventSource: Send {
    async fn next_event(&mut self) -> Option<GatewayEvent>;
}

#[async_trait]
impl EventSource for GatewayConnection {
    async fn next_event(&mut self) -> Option<GatewayEvent> {
        GatewayConnection::next_event(self).await
    }
}

#[async_trait]
impl EventSource for mpsc::Receiver<GatewayEvent> {
    async fn next_event(&mut self) -> Option<GatewayEvent> {
        self.recv().await
    }
}

pub struct Relay {
    poller: StreamPoller,
    platform: Arc<dyn StreamPlatform>,
    notifier: Notifier,
    status: StatusPublisher,
    responder: KeywordResponder,
    check_interval: Duration,
    status_interval: Duration,
    self_id: Option<Snowflake>,
}

impl Relay {
    pub fn new(
        config: &BotConfig,
        platform: Arc<dyn StreamPlatform>,
        sink: Arc<dyn ChatSink>,
        http_client: reqwest::Client,
    ) -> Self {
        let poller = StreamPoller::new(
            config.twitch_username.clone(),
            config.streamer_display_name.clone(),
            config.live_channel_id,
            config.clip_channel_id,
        );
        let status = StatusPublisher::new(
            http_client,
            config.status_url.clone(),
            config.status_channel_id,
            Arc::clone(&sink),
            config.timezone,
        );

        Self {
            poller,
            platform,
            notifier: Notifier::new(sink, config.timezone),
            status,
            responder: KeywordResponder::new(config.guild_id, config.chat_channel_id),
            check_interval: config.check_interval,
            status_interval: config.status_interval,
            self_id: None,
        }
    }

    /// Run until cancelled or the gateway gives up.
    ///
    /// Timers start at the first READY and are not restarted on reconnects.
    pub async fn run<E>(mut self, events: &mut E, cancel: CancellationToken) -> Result<()>
    where
        E: EventSource + ?Sized,
    {
        let mut poll_timer: Option<Interval> = None;
        let mut status_timer: Option<Interval> = None;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Relay shutting down");
                    return Ok(());
                }
                event = events.next_event() => match event {
                    Some(GatewayEvent::Ready(ready)) => {
                        info!(user = %ready.user.username, id = %ready.user.id, "Connected to Discord");
                        self.self_id = Some(ready.user.id);
                        if poll_timer.is_none() {
                            poll_timer = Some(new_timer(self.check_interval));
                            status_timer = Some(new_timer(self.status_interval));
                        }
                    }
                    Some(GatewayEvent::MessageCreate(message)) => {
                        self.handle_message(&message).await;
                    }
                    Some(GatewayEvent::Fatal { code, reason }) => {
                        return Err(Error::GatewayClosed { code, reason });
                    }
                    None => {
                        warn!("Gateway event stream ended");
                        return Err(Error::Other("gateway event stream ended".to_string()));
                    }
                },
                _ = next_tick(&mut poll_timer) => {
                    let report = self
                        .poller
                        .tick(self.platform.as_ref(), &self.notifier, Utc::now())
                        .await;
                    debug!(?report, "Stream check finished");
                }
                _ = next_tick(&mut status_timer) => {
                    self.status.tick(self.self_id, Utc::now()).await;
                }
            }
        }
    }

    async fn handle_message(&self, message: &Message) {
        if let Some(reply) = self.responder.reply_for(message, self.self_id) {
            debug!(channel = %message.channel_id, author = %message.author.username, "Keyword matched");
            self.notifier.send_reply(message.channel_id, reply).await;
        }
    }
}

fn new_timer(period: Duration) -> Interval {
    let mut timer = tokio::time::interval(period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    timer
}

/// Wait for the next tick, or forever while the timer is not started.
async fn next_tick(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending().await,
    }
}
