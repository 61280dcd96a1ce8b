//! Liveness HTTP endpoint for uptime pingers.

pub mod routes;
pub mod server;

pub use server::{LivenessServer, LivenessServerConfig};
