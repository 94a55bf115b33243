//! Configuration type definitions.

use serde::Deserialize;

use crate::wiki::constants::DEFAULT_API_BASE;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub discord: DiscordConfig,
    #[serde(default)]
    pub wiki: WikiConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

/// Discord bot configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscordConfig {
    pub token: String,
    /// Guild to register commands in. When unset, commands register
    /// globally (which Discord rolls out slowly).
    pub guild_id: Option<u64>,
    /// User allowed to run owner commands such as the alias refresh.
    pub owner_id: u64,
}

/// Wiki API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WikiConfig {
    pub api_base: String,
}

impl Default for WikiConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }
}

/// Render-cache (Redis) configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub url: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1/".to_string(),
        }
    }
}

/// Alias-store (SQLite) configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: "wikikeeper.db".to_string(),
        }
    }
}
