//! Liveness server setup and configuration.

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::api::routes;
use crate::error::{Error, Result};

pub const DEFAULT_LIVENESS_MESSAGE: &str = "Bot do Golpe Baixo está vivo, manda a cachaça!";

/// Liveness server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LivenessServerConfig {
    /// Server bind address
    pub bind_address: String,
    /// Server port
    pub port: u16,
    /// Body returned by `GET /`
    pub message: String,
}

impl Default for LivenessServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
            message: DEFAULT_LIVENESS_MESSAGE.to_string(),
        }
    }
}

impl LivenessServerConfig {
    /// Load from environment variables, falling back to defaults.
    ///
    /// Supported env vars:
    /// - `LIVENESS_BIND_ADDRESS` (e.g. "0.0.0.0")
    /// - `LIVENESS_PORT` (e.g. "8080")
    /// - `LIVENESS_MESSAGE`
    pub fn from_env_or_default() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(bind_address) = lookup("LIVENESS_BIND_ADDRESS")
            && !bind_address.trim().is_empty()
        {
            config.bind_address = bind_address.trim().to_string();
        }

        if let Some(port) = lookup("LIVENESS_PORT")
            && let Ok(parsed) = port.trim().parse::<u16>()
        {
            config.port = parsed;
        }

        if let Some(message) = lookup("LIVENESS_MESSAGE")
            && !message.trim().is_empty()
        {
            config.message = message;
        }

        config
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.bind_address, self.port)
            .parse()
            .map_err(|e| Error::LivenessServer(format!("Invalid address: {}", e)))
    }
}

/// Standalone HTTP server; shares nothing with the bot but the shutdown token.
pub struct LivenessServer {
    config: LivenessServerConfig,
    cancel_token: CancellationToken,
}

impl LivenessServer {
    pub fn new(config: LivenessServerConfig, cancel_token: CancellationToken) -> Self {
        Self {
            config,
            cancel_token,
        }
    }

    /// Bind the configured address. Failing here is fatal at startup.
    pub async fn bind(&self) -> Result<TcpListener> {
        let addr = self.config.socket_addr()?;
        TcpListener::bind(addr)
            .await
            .map_err(|e| Error::LivenessServer(format!("Failed to bind {}: {}", addr, e)))
    }

    /// Serve on an already bound listener until the token is cancelled.
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        if let Ok(addr) = listener.local_addr() {
            tracing::info!("Liveness server listening on http://{}", addr);
        }

        let router = routes::create_router(self.config.message);
        let cancel_token = self.cancel_token;

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                cancel_token.cancelled().await;
                tracing::info!("Liveness server shutting down...");
            })
            .await
            .map_err(|e| Error::LivenessServer(format!("Server error: {}", e)))
    }
}
