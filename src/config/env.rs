//! Environment variable overrides for configuration.
//!
//! Supports overriding config values with environment variables:
//! - `WIKIKEEPER_DISCORD_TOKEN` - Discord bot token
//! - `WIKIKEEPER_DISCORD_GUILD_ID` - Guild for command registration
//! - `WIKIKEEPER_DISCORD_OWNER_ID` - Owner user id
//! - `WIKIKEEPER_WIKI_API_BASE` - MediaWiki API endpoint
//! - `WIKIKEEPER_CACHE_URL` - Redis connection URL
//! - `WIKIKEEPER_STORE_PATH` - SQLite alias database path

use std::env;

use crate::config::types::Config;

/// Environment variable prefix for all config overrides.
const ENV_PREFIX: &str = "WIKIKEEPER";

/// Apply environment variable overrides to a config.
///
/// This allows sensitive values like the bot token to be provided via
/// environment variables instead of the config file.
pub fn apply_env_overrides(mut config: Config) -> Config {
    if let Ok(token) = env::var(format!("{}_DISCORD_TOKEN", ENV_PREFIX)) {
        config.discord.token = token;
    }
    if let Ok(guild_id) = env::var(format!("{}_DISCORD_GUILD_ID", ENV_PREFIX)) {
        if let Ok(id) = guild_id.parse() {
            config.discord.guild_id = Some(id);
        }
    }
    if let Ok(owner_id) = env::var(format!("{}_DISCORD_OWNER_ID", ENV_PREFIX)) {
        if let Ok(id) = owner_id.parse() {
            config.discord.owner_id = id;
        }
    }

    if let Ok(api_base) = env::var(format!("{}_WIKI_API_BASE", ENV_PREFIX)) {
        config.wiki.api_base = api_base;
    }
    if let Ok(url) = env::var(format!("{}_CACHE_URL", ENV_PREFIX)) {
        config.cache.url = url;
    }
    if let Ok(path) = env::var(format!("{}_STORE_PATH", ENV_PREFIX)) {
        config.store.path = path;
    }

    config
}

/// Get the config file path from environment or use default.
///
/// Checks `WIKIKEEPER_CONFIG`, otherwise returns "wikikeeper.conf".
pub fn get_config_path() -> String {
    env::var(format!("{}_CONFIG", ENV_PREFIX)).unwrap_or_else(|_| "wikikeeper.conf".to_string())
}
