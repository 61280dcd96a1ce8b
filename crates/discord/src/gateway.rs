//! Gateway connection.
//!
//! The connection lives in a spawned task so heartbeats keep flowing no matter
//! how long the consumer takes to handle an event. Events reach the consumer
//! over a bounded mpsc channel; dropping the [`GatewayConnection`] or calling
//! [`GatewayConnection::close`] stops the task.

use std::ops::BitOr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::error::{DiscordError, Result};
use crate::models::{Message, ReadyEvent};

pub const DEFAULT_GATEWAY_URL: &str = "wss://gateway.discord.gg/?v=10&encoding=json";

/// How long to wait for `HELLO` after the socket opens.
const HELLO_TIMEOUT: Duration = Duration::from_secs(30);

const EVENT_CHANNEL_CAPACITY: usize = 100;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub mod opcode {
    pub const DISPATCH: u8 = 0;
    pub const HEARTBEAT: u8 = 1;
    pub const IDENTIFY: u8 = 2;
    pub const RECONNECT: u8 = 7;
    pub const INVALID_SESSION: u8 = 9;
    pub const HELLO: u8 = 10;
    pub const HEARTBEAT_ACK: u8 = 11;
}

/// Gateway intents bitfield.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Intents(u64);

impl Intents {
    pub const GUILDS: Intents = Intents(1 << 0);
    pub const GUILD_MESSAGES: Intents = Intents(1 << 9);
    pub const MESSAGE_CONTENT: Intents = Intents(1 << 15);

    pub const fn empty() -> Self {
        Intents(0)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    pub const fn contains(self, other: Intents) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Intents {
    type Output = Intents;

    fn bitor(self, rhs: Self) -> Self::Output {
        Intents(self.0 | rhs.0)
    }
}

/// Raw gateway frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayPayload {
    pub op: u8,
    #[serde(default)]
    pub d: Value,
    #[serde(default)]
    pub s: Option<u64>,
    #[serde(default)]
    pub t: Option<String>,
}

impl GatewayPayload {
    pub fn decode(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Heartbeat interval announced by a `HELLO` frame.
    pub fn heartbeat_interval(&self) -> Option<Duration> {
        if self.op != opcode::HELLO {
            return None;
        }
        self.d
            .get("heartbeat_interval")
            .and_then(Value::as_u64)
            .map(Duration::from_millis)
    }
}

/// Events forwarded to the consumer.
#[derive(Debug, Clone)]
pub enum GatewayEvent {
    /// Session established (sent again after every reconnect).
    Ready(Box<ReadyEvent>),
    /// A message was posted in a channel the bot can see.
    MessageCreate(Box<Message>),
    /// The gateway refused the session for good; the task has stopped.
    Fatal { code: u16, reason: String },
}

impl GatewayEvent {
    /// Decode a dispatch. Unknown dispatch types yield `None`.
    pub fn from_dispatch(event_type: &str, data: Value) -> Result<Option<Self>> {
        let event = match event_type {
            "READY" => Some(GatewayEvent::Ready(Box::new(serde_json::from_value(data)?))),
            "MESSAGE_CREATE" => Some(GatewayEvent::MessageCreate(Box::new(
                serde_json::from_value(data)?,
            ))),
            _ => None,
        };
        Ok(event)
    }
}

/// Close codes after which reconnecting cannot succeed.
pub fn is_fatal_close_code(code: u16) -> bool {
    matches!(code, 4004 | 4010 | 4011 | 4012 | 4013 | 4014)
}

pub fn identify_payload(token: &str, intents: Intents) -> Value {
    json!({
        "op": opcode::IDENTIFY,
        "d": {
            "token": token,
            "intents": intents.bits(),
            "properties": {
                "os": std::env::consts::OS,
                "browser": "discord-client",
                "device": "discord-client"
            }
        }
    })
}

pub fn heartbeat_payload(sequence: Option<u64>) -> Value {
    json!({ "op": opcode::HEARTBEAT, "d": sequence })
}

#[derive(Clone)]
pub struct GatewayConfig {
    pub url: String,
    pub token: String,
    pub intents: Intents,
    pub base_reconnect_delay_ms: u64,
    pub max_reconnect_delay_ms: u64,
}

impl GatewayConfig {
    pub fn new(token: impl Into<String>, intents: Intents) -> Self {
        Self {
            url: DEFAULT_GATEWAY_URL.to_string(),
            token: token.into(),
            intents,
            base_reconnect_delay_ms: 1000,
            max_reconnect_delay_ms: 60000,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("url", &self.url)
            .field("token", &"<redacted>")
            .field("intents", &self.intents)
            .finish()
    }
}

/// Handle to the background gateway task.
pub struct GatewayConnection {
    events: mpsc::Receiver<GatewayEvent>,
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl GatewayConnection {
    /// Spawn the gateway task. Connection errors are handled inside the task.
    pub fn connect(config: GatewayConfig) -> Self {
        let (tx, events) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(run(config, tx, shutdown.clone()));
        Self {
            events,
            shutdown,
            task: Some(task),
        }
    }

    /// Next event, or `None` once the task has stopped.
    pub async fn next_event(&mut self) -> Option<GatewayEvent> {
        self.events.recv().await
    }

    /// Shut down and wait for the task to finish.
    pub async fn close(mut self) {
        self.shutdown.cancel();
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            warn!("Gateway task ended abnormally: {}", e);
        }
    }
}

impl Drop for GatewayConnection {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Why a session ended.
#[derive(Debug)]
enum SessionEnd {
    Shutdown,
    Fatal { code: u16, reason: String },
    Reconnect { identified: bool, reason: String },
}

async fn run(config: GatewayConfig, tx: mpsc::Sender<GatewayEvent>, shutdown: CancellationToken) {
    let mut delay = config.base_reconnect_delay_ms;
    let mut attempt: u32 = 0;

    loop {
        if shutdown.is_cancelled() {
            break;
        }

        match run_session(&config, &tx, &shutdown).await {
            SessionEnd::Shutdown => break,
            SessionEnd::Fatal { code, reason } => {
                error!(code, %reason, "Gateway closed the session permanently");
                let _ = tx.send(GatewayEvent::Fatal { code, reason }).await;
                break;
            }
            SessionEnd::Reconnect { identified, reason } => {
                if identified {
                    attempt = 0;
                    delay = config.base_reconnect_delay_ms;
                }
                attempt += 1;
                warn!(attempt, delay_ms = delay, %reason, "Gateway session lost, reconnecting");

                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_millis(delay)) => {},
                    _ = shutdown.cancelled() => break,
                }
                delay = (delay * 2).min(config.max_reconnect_delay_ms);
            }
        }
    }

    debug!("Gateway task stopped");
}

async fn send_json(stream: &mut WsStream, payload: &Value) -> Result<()> {
    stream
        .send(WsMessage::Text(payload.to_string().into()))
        .await
        .map_err(DiscordError::from)
}

async fn read_hello(stream: &mut WsStream) -> Result<Duration> {
    while let Some(msg) = stream.next().await {
        if let WsMessage::Text(text) = msg? {
            let payload = GatewayPayload::decode(text.as_str())?;
            if let Some(interval) = payload.heartbeat_interval() {
                return Ok(interval);
            }
            trace!(op = payload.op, "Ignoring frame before HELLO");
        }
    }
    Err(DiscordError::protocol("socket closed before HELLO"))
}

async fn wait_for_hello(stream: &mut WsStream) -> Result<Duration> {
    tokio::time::timeout(HELLO_TIMEOUT, read_hello(stream))
        .await
        .map_err(|_| DiscordError::protocol("timed out waiting for HELLO"))?
}

async fn run_session(
    config: &GatewayConfig,
    tx: &mpsc::Sender<GatewayEvent>,
    shutdown: &CancellationToken,
) -> SessionEnd {
    let reconnect = |identified: bool, reason: String| SessionEnd::Reconnect { identified, reason };

    info!("Connecting to gateway: {}", config.url);
    let mut stream = tokio::select! {
        result = connect_async(config.url.as_str()) => match result {
            Ok((stream, _)) => stream,
            Err(e) => return reconnect(false, format!("connect failed: {e}")),
        },
        _ = shutdown.cancelled() => return SessionEnd::Shutdown,
    };

    let interval = match wait_for_hello(&mut stream).await {
        Ok(interval) => interval,
        Err(e) => return reconnect(false, e.to_string()),
    };
    debug!(interval_ms = interval.as_millis() as u64, "Received HELLO");

    if let Err(e) = send_json(&mut stream, &identify_payload(&config.token, config.intents)).await {
        return reconnect(false, format!("identify failed: {e}"));
    }

    let mut heartbeat = tokio::time::interval_at(Instant::now() + interval, interval);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut sequence: Option<u64> = None;
    let mut awaiting_ack = false;
    let mut identified = false;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                let _ = stream.close(None).await;
                return SessionEnd::Shutdown;
            }

            _ = heartbeat.tick() => {
                if awaiting_ack {
                    return reconnect(identified, "heartbeat not acknowledged".to_string());
                }
                if let Err(e) = send_json(&mut stream, &heartbeat_payload(sequence)).await {
                    return reconnect(identified, format!("heartbeat failed: {e}"));
                }
                awaiting_ack = true;
                trace!(?sequence, "Sent heartbeat");
            }

            frame = stream.next() => {
                let text = match frame {
                    Some(Ok(WsMessage::Text(text))) => text,
                    Some(Ok(WsMessage::Close(frame))) => {
                        let (code, reason) = frame
                            .map(|f| (u16::from(f.code), f.reason.as_str().to_string()))
                            .unwrap_or((1000, String::new()));
                        if is_fatal_close_code(code) {
                            return SessionEnd::Fatal { code, reason };
                        }
                        return reconnect(identified, format!("closed with {code}: {reason}"));
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => return reconnect(identified, format!("websocket error: {e}")),
                    None => return reconnect(identified, "websocket stream ended".to_string()),
                };

                let payload = match GatewayPayload::decode(text.as_str()) {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!("Failed to decode gateway frame: {}", e);
                        continue;
                    }
                };

                match payload.op {
                    opcode::DISPATCH => {
                        if payload.s.is_some() {
                            sequence = payload.s;
                        }
                        let Some(event_type) = payload.t.as_deref() else {
                            continue;
                        };
                        match GatewayEvent::from_dispatch(event_type, payload.d) {
                            Ok(Some(event)) => {
                                if matches!(event, GatewayEvent::Ready(_)) {
                                    identified = true;
                                }
                                if tx.send(event).await.is_err() {
                                    let _ = stream.close(None).await;
                                    return SessionEnd::Shutdown;
                                }
                            }
                            Ok(None) => trace!(event_type, "Ignoring dispatch"),
                            Err(e) => warn!(event_type, "Failed to decode dispatch: {}", e),
                        }
                    }
                    opcode::HEARTBEAT => {
                        if let Err(e) = send_json(&mut stream, &heartbeat_payload(sequence)).await {
                            return reconnect(identified, format!("heartbeat failed: {e}"));
                        }
                    }
                    opcode::HEARTBEAT_ACK => awaiting_ack = false,
                    opcode::RECONNECT => {
                        let _ = stream.close(None).await;
                        return reconnect(identified, "server requested reconnect".to_string());
                    }
                    opcode::INVALID_SESSION => {
                        let _ = stream.close(None).await;
                        return reconnect(identified, "session invalidated".to_string());
                    }
                    op => trace!(op, "Ignoring gateway opcode"),
                }
            }
        }
    }
}
