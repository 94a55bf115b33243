//! Configuration file parsing (HOCON format).

use std::path::Path;

use crate::common::error::ConfigError;
use crate::config::types::Config;
use hocon::HoconLoader;

/// Load configuration from a HOCON file.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();

    HoconLoader::new()
        .load_file(path)
        .map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
        })?
        .resolve()
        .map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })
}

/// Load configuration from a HOCON string.
pub fn load_config_str(content: &str) -> Result<Config, ConfigError> {
    HoconLoader::new()
        .load_str(content)
        .map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?
        .resolve()
        .map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_minimal_config() {
        let config = load_config_str(
            r#"
            discord {
                token = "abc123"
                owner_id = 1234
            }
            "#,
        )
        .unwrap();

        assert_eq!(config.discord.token, "abc123");
        assert_eq!(config.discord.owner_id, 1234);
        assert!(config.discord.guild_id.is_none());
        // Sections left out fall back to their defaults.
        assert!(config.wiki.api_base.contains("api.php"));
        assert!(config.cache.url.starts_with("redis://"));
        assert_eq!(config.store.path, "wikikeeper.db");
    }

    #[test]
    fn test_load_full_config() {
        let config = load_config_str(
            r#"
            discord {
                token = "abc123"
                guild_id = 99887766
                owner_id = 1234
            }
            wiki { api_base = "https://example.test/api.php" }
            cache { url = "redis://cache.internal/" }
            store { path = "/var/lib/wikikeeper/aliases.db" }
            "#,
        )
        .unwrap();

        assert_eq!(config.discord.guild_id, Some(99887766));
        assert_eq!(config.wiki.api_base, "https://example.test/api.php");
        assert_eq!(config.cache.url, "redis://cache.internal/");
        assert_eq!(config.store.path, "/var/lib/wikikeeper/aliases.db");
    }

    #[test]
    fn test_missing_discord_section_fails() {
        assert!(load_config_str("wiki { api_base = \"x\" }").is_err());
    }
}
