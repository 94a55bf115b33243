//! Wikikeeper - Honkai Impact 3rd wiki companion for Discord
//!
//! Serves battlesuit, stigmata and weapon pages from the HI3 wiki as
//! interactive embeds, backed by a Redis content cache and a SQLite
//! alias store for autocomplete.

mod common;
mod config;
mod discord;
mod store;
mod wiki;

use std::sync::Arc;

use anyhow::Result;
use tokio::signal;
use tracing::{error, info, warn};

use config::{env::get_config_path, load_and_validate};
use discord::{build_client, BotState};
use store::AliasStore;
use wiki::cache::{RedisStore, WikiCache};
use wiki::client::WikiClient;
use wiki::orchestrator::Orchestrator;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Wikikeeper v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = get_config_path();
    info!("Loading configuration from {}...", config_path);

    let config = load_and_validate(&config_path).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        error!(
            "Please ensure {} exists and is properly formatted.",
            config_path
        );
        error!("See wikikeeper.conf.example for reference.");
        e
    })?;

    info!("Configuration loaded successfully");
    info!("  Wiki API: {}", config.wiki.api_base);
    info!("  Alias store: {}", config.store.path);

    let aliases = AliasStore::open(&config.store.path)?;
    info!("Alias store ready");

    let redis = RedisStore::connect(&config.cache.url).await.map_err(|e| {
        error!("Failed to connect to redis at {}: {}", config.cache.url, e);
        e
    })?;
    let cache = WikiCache::new(Arc::new(redis));
    info!("Content cache connected");

    let client = Arc::new(WikiClient::new(config.wiki.api_base.clone()));
    let orchestrator = Orchestrator::new(
        cache.clone(),
        client.clone(),
        Arc::new(aliases.clone()),
    );

    let state = Arc::new(BotState {
        orchestrator,
        cache,
        source: client,
        aliases,
        owner_id: config.discord.owner_id,
        guild_id: config.discord.guild_id,
    });

    info!("Starting Discord bot...");
    let mut bot = build_client(&config.discord.token, state).await?;

    let shard_manager = bot.shard_manager.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received - stopping shards...");
        shard_manager.shutdown_all().await;
    });

    if let Err(e) = bot.start().await {
        error!("Discord client error: {}", e);
        return Err(e.into());
    }

    info!("Exiting...");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
