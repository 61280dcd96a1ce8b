use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use discord_client::{GatewayConfig, GatewayConnection, Intents, RestClient};
use helix_client::{ClientCredentials, HelixClient};
use stream_relay::api::{LivenessServer, LivenessServerConfig};
use stream_relay::logging::{init_logging, start_retention_cleanup};
use stream_relay::monitor::TwitchPlatform;
use stream_relay::utils::http_client::build_client;
use stream_relay::config::env_value;
use stream_relay::{BotConfig, Relay};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let log_dir = env_value("LOG_DIR").map(PathBuf::from);
    let _log_guard = init_logging(log_dir.as_deref()).context("failed to initialize logging")?;

    let config = match BotConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };
    info!(streamer = %config.twitch_username, "Starting stream-relay");
    tracing::debug!(?config, "Loaded configuration");

    let cancel = CancellationToken::new();
    if let Some(dir) = &config.log_dir {
        start_retention_cleanup(dir.clone(), cancel.clone());
    }

    let liveness = LivenessServer::new(LivenessServerConfig::from_env_or_default(), cancel.clone());
    let listener = match liveness.bind().await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, "Failed to start liveness server");
            return Err(e.into());
        }
    };
    let liveness_task = tokio::spawn(liveness.serve(listener));

    let http = build_client(config.request_timeout);
    let helix = HelixClient::new(
        http.clone(),
        ClientCredentials::new(&config.twitch_client_id, &config.twitch_client_secret),
    );
    let rest = RestClient::new(http.clone(), &config.discord_token)?;

    let intents = Intents::GUILDS | Intents::GUILD_MESSAGES | Intents::MESSAGE_CONTENT;
    let mut gateway =
        GatewayConnection::connect(GatewayConfig::new(config.discord_token.clone(), intents));

    let relay = Relay::new(
        &config,
        Arc::new(TwitchPlatform::new(helix)),
        Arc::new(rest),
        http,
    );

    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown signal received");
                cancel.cancel();
            }
        }
    });

    let result = relay.run(&mut gateway, cancel.clone()).await;

    cancel.cancel();
    gateway.close().await;
    match liveness_task.await {
        Ok(Err(e)) => error!(error = %e, "Liveness server failed"),
        Err(e) => error!(error = %e, "Liveness server task panicked"),
        Ok(Ok(())) => {}
    }

    if let Err(e) = result {
        error!(error = %e, "Relay stopped");
        return Err(e.into());
    }

    info!("stream-relay stopped");
    Ok(())
}
