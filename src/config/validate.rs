//! Configuration validation.
//!
//! Validates configuration values and provides helpful error messages.

use crate::common::error::ConfigError;
use crate::config::types::Config;

/// Validate a configuration and return detailed errors.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    if config.discord.token.is_empty() {
        errors.push("discord.token is required".to_string());
    }
    if config.discord.token == "YOUR_DISCORD_TOKEN_HERE" {
        errors.push("discord.token has not been configured (still using placeholder)".to_string());
    }
    if config.discord.owner_id == 0 {
        errors.push("discord.owner_id must be non-zero".to_string());
    }

    if config.wiki.api_base.is_empty() {
        errors.push("wiki.api_base is required".to_string());
    } else if !config.wiki.api_base.starts_with("http") {
        errors.push(format!(
            "wiki.api_base must be an http(s) URL (got '{}')",
            config.wiki.api_base
        ));
    }

    if !config.cache.url.starts_with("redis://") && !config.cache.url.starts_with("rediss://") {
        errors.push(format!(
            "cache.url must be a redis:// URL (got '{}')",
            config.cache.url
        ));
    }

    if config.store.path.is_empty() {
        errors.push("store.path is required".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError {
            message: errors.join("\n"),
        })
    }
}
