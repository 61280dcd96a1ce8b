//! Twitch live and clip monitoring.

pub mod platform;
pub mod poller;

pub use platform::{StreamPlatform, TwitchPlatform};
pub use poller::{LiveState, StreamPoller, TickReport};
