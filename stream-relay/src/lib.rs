//! stream-relay library crate.
//!
//! Watches a Twitch channel and relays live and clip announcements, keyword
//! replies and a rolling service-status message into a Discord guild.

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod monitor;
pub mod notification;
pub mod relay;
pub mod status;
pub mod utils;

pub use config::BotConfig;
pub use error::{Error, Result};
pub use relay::{EventSource, Relay};
