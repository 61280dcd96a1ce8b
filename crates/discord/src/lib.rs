//! Minimal Discord bot client.
//!
//! Two halves:
//! - [`gateway`]: a background WebSocket task that identifies, keeps the
//!   heartbeat going, reconnects on transient failures and forwards the
//!   dispatches a bot cares about (`READY`, `MESSAGE_CREATE`) over a channel.
//! - [`rest`]: channel message create/edit/fetch over the v10 HTTP API.

pub mod error;
pub mod gateway;
pub mod models;
pub mod rest;

pub use error::{DiscordError, Result};
pub use gateway::{GatewayConfig, GatewayConnection, GatewayEvent, Intents};
pub use models::{Embed, EmbedFooter, Message, MessagePayload, ReadyEvent, Snowflake, User};
pub use rest::RestClient;
