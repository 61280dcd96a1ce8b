//! Twitch Helix API client.
//!
//! Covers the handful of endpoints needed to follow a single broadcaster:
//! app access tokens (client-credentials grant), user lookup, stream lookup
//! and clip lookup.

pub mod client;
pub mod error;
pub mod models;

pub use client::{ClientCredentials, HelixClient, HelixEndpoints};
pub use error::{HelixError, Result};
pub use models::{AccessToken, Clip, HelixResponse, Stream, User};
