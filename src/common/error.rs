//! Error types for the application.

use thiserror::Error;

use crate::wiki::constants::{RequestCategory, StigmaSlot};

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {message}")]
    ParseError { message: String },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

/// Errors raised while turning a wiki field mapping into a domain model.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Missing required field '{key}'")]
    MissingField { key: String },

    #[error("Invalid number for field '{key}': '{value}'")]
    InvalidNumber { key: String, value: String },

    #[error("Invalid rarity value {value}")]
    InvalidRarity { value: i64 },

    #[error("Unknown core strength '{value}'")]
    UnknownStrength { value: String },

    #[error("Unknown battlesuit type '{value}'")]
    UnknownType { value: String },

    #[error("Unknown battlesuit rank '{value}'")]
    UnknownRank { value: String },

    #[error("A set cannot have multiple stigmata share the {0} slot")]
    DuplicateSlot(StigmaSlot),

    #[error("A stigmata set must contain between one and three stigmata, got {got}")]
    InvalidSetSize { got: usize },

    #[error("Weapon defines no stat entries")]
    EmptyStats,

    #[error("Field mapping matches no known page kind")]
    UnknownVariant,

    #[error("Incomplete recommendation '{kind}': missing {slot}")]
    IncompleteRecommendation { kind: String, slot: String },
}

/// Cache-store errors. `NotCached` is the clean-miss signal and must stay
/// distinguishable from backend failures.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Could not find cached {field} for key {key}")]
    NotCached { field: String, key: String },

    #[error("Cache backend error: {0}")]
    Backend(#[from] redis::RedisError),

    #[error("Failed to decode cached value: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Unexpected pipeline reply for {command}")]
    UnexpectedReply { command: String },
}

/// Alias-store (SQLite) errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Alias store error: {0}")]
    Backend(#[from] rusqlite::Error),

    #[error("Alias store task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
}

/// Top-level error for one wiki request.
#[derive(Debug, Error)]
pub enum WikiError {
    #[error("Wiki API request to {url} failed with status {status}")]
    Http {
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("Wiki API transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Malformed API response: {message}")]
    MalformedResponse { message: String },

    #[error("No page or revision found for page id {page_id}")]
    PageNotFound { page_id: String },

    #[error(
        "Expected category to be one of {}, got {got}",
        RequestCategory::handled_names()
    )]
    UnknownCategory { got: String },

    #[error("Both cache and wiki page lookup for page id {page_id} failed")]
    Unresolvable { page_id: String },

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type alias for wiki request operations.
pub type WikiResult<T> = std::result::Result<T, WikiError>;

/// Result type alias for cache operations.
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Result type alias for alias-store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
