//! Shared bot state and client construction.

use std::sync::Arc;

use anyhow::Result;
use serenity::all::{Client, GatewayIntents};
use serenity::prelude::TypeMapKey;

use crate::discord::handler::Handler;
use crate::store::AliasStore;
use crate::wiki::cache::WikiCache;
use crate::wiki::client::PageSource;
use crate::wiki::orchestrator::Orchestrator;

/// Everything the interaction handlers need, shared through serenity's
/// type map.
pub struct BotState {
    pub orchestrator: Orchestrator,
    pub cache: WikiCache,
    pub source: Arc<dyn PageSource>,
    pub aliases: AliasStore,
    pub owner_id: u64,
    /// When set, commands are registered to this guild only. Global
    /// registration can take up to an hour to propagate.
    pub guild_id: Option<u64>,
}

impl TypeMapKey for BotState {
    type Value = Arc<BotState>;
}

/// Build the serenity client. The bot only speaks through interactions,
/// so no gateway intents are needed.
pub async fn build_client(token: &str, state: Arc<BotState>) -> Result<Client> {
    let client = Client::builder(token, GatewayIntents::empty())
        .event_handler(Handler)
        .await?;

    {
        let mut data = client.data.write().await;
        data.insert::<BotState>(state);
    }

    Ok(client)
}
