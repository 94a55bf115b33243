//! Short-lived render cache in front of the wiki API.
//!
//! Rendered pages live in one hash per page id. Every key a batch touches
//! gets its lifetime stamped on execute, so entries expire together no
//! matter which fields were read or written.

use std::sync::Arc;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::common::error::{CacheError, CacheResult};
use crate::wiki::constants::RequestCategory;
use crate::wiki::model::WeaponStats;
use crate::wiki::render::{Document, WikiLinkMap};

pub const CACHE_EXPIRE_SECS: i64 = 300;

pub const FIELD_CATEGORY: &str = "category";
pub const FIELD_CONTENT: &str = "content";
pub const FIELD_WIKILINKS: &str = "wikilinks";
pub const FIELD_STATS: &str = "stats";
pub const FIELD_RARITY: &str = "rarity";
pub const FIELD_MAX_RARITY: &str = "max_rarity";

/// One queued cache command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    HashSet {
        key: String,
        fields: Vec<(String, String)>,
    },
    HashGet {
        key: String,
        fields: Vec<String>,
    },
    Expire {
        key: String,
        seconds: i64,
    },
}

impl Command {
    fn key(&self) -> &str {
        match self {
            Command::HashSet { key, .. } => key,
            Command::HashGet { key, .. } => key,
            Command::Expire { key, .. } => key,
        }
    }
}

/// A batch of cache commands executed as one pipeline.
#[derive(Debug, Default)]
pub struct Batch {
    commands: Vec<Command>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hset(&mut self, key: impl Into<String>, fields: Vec<(String, String)>) -> &mut Self {
        self.commands.push(Command::HashSet {
            key: key.into(),
            fields,
        });
        self
    }

    pub fn hmget(&mut self, key: impl Into<String>, fields: &[&str]) -> &mut Self {
        self.commands.push(Command::HashGet {
            key: key.into(),
            fields: fields.iter().map(|f| (*f).to_owned()).collect(),
        });
        self
    }

    pub fn expire(&mut self, key: impl Into<String>, seconds: i64) -> &mut Self {
        self.commands.push(Command::Expire {
            key: key.into(),
            seconds,
        });
        self
    }

    /// The command list with lifetimes stamped: every touched key gets one
    /// trailing `EXPIRE`, unless the batch already expires it explicitly.
    pub fn finalize(self) -> Vec<Command> {
        let mut commands = self.commands;
        let mut stamped: Vec<String> = commands
            .iter()
            .filter_map(|command| match command {
                Command::Expire { key, .. } => Some(key.clone()),
                _ => None,
            })
            .collect();

        let touched: Vec<String> = commands.iter().map(|c| c.key().to_owned()).collect();
        for key in touched {
            if stamped.contains(&key) {
                continue;
            }
            stamped.push(key.clone());
            commands.push(Command::Expire {
                key,
                seconds: CACHE_EXPIRE_SECS,
            });
        }
        commands
    }
}

/// Executes batches against some hash store. Replies are returned for the
/// read commands only, in order.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn execute(&self, batch: Batch) -> CacheResult<Vec<Vec<Option<String>>>>;
}

/// The production store: one multiplexed Redis connection shared by all
/// tasks.
pub struct RedisStore {
    connection: MultiplexedConnection,
}

impl RedisStore {
    pub async fn connect(url: &str) -> CacheResult<Self> {
        let client = redis::Client::open(url)?;
        let connection = client.get_multiplexed_tokio_connection().await?;
        Ok(Self { connection })
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn execute(&self, batch: Batch) -> CacheResult<Vec<Vec<Option<String>>>> {
        let mut pipe = redis::pipe();
        let mut reads = 0;
        for command in batch.finalize() {
            match command {
                Command::HashSet { key, fields } => {
                    pipe.cmd("HSET").arg(key).arg(fields).ignore();
                }
                Command::HashGet { key, fields } => {
                    pipe.cmd("HMGET").arg(key).arg(fields);
                    reads += 1;
                }
                Command::Expire { key, seconds } => {
                    pipe.cmd("EXPIRE").arg(key).arg(seconds).ignore();
                }
            }
        }

        let mut connection = self.connection.clone();
        let replies: Vec<redis::Value> = pipe.query_async(&mut connection).await?;
        if replies.len() != reads {
            return Err(CacheError::UnexpectedReply {
                command: "HMGET".to_owned(),
            });
        }
        replies
            .into_iter()
            .map(|reply| Ok(redis::from_redis_value(&reply)?))
            .collect()
    }
}

fn dump_json<T: Serialize>(value: &T) -> CacheResult<String> {
    Ok(serde_json::to_string(value)?)
}

fn parse_json<T: DeserializeOwned>(raw: &str) -> CacheResult<T> {
    Ok(serde_json::from_str(raw)?)
}

/// A fully cached weapon page: rendered documents plus the stat table the
/// rarity selector needs.
#[derive(Debug, Clone)]
pub struct CachedWeapon {
    pub documents: Vec<Document>,
    pub wikilinks: WikiLinkMap,
    pub stats: Vec<WeaponStats>,
    pub rarity: u8,
    pub max_rarity: u8,
}

/// Grouped access to rendered pages. A group read either returns every
/// field or counts as a miss; partial entries are never served.
#[derive(Clone)]
pub struct WikiCache {
    store: Arc<dyn KeyValueStore>,
}

impl WikiCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn key(page_id: &str) -> String {
        format!("wiki:{page_id}")
    }

    /// Read one field group. `None` when any field is absent.
    pub async fn read_group(
        &self,
        page_id: &str,
        fields: &[&str],
    ) -> CacheResult<Option<Vec<String>>> {
        let mut batch = Batch::new();
        batch.hmget(Self::key(page_id), fields);
        let mut replies = self.store.execute(batch).await?;

        let reply = replies.pop().ok_or_else(|| CacheError::UnexpectedReply {
            command: "HMGET".to_owned(),
        })?;
        if reply.len() != fields.len() {
            return Err(CacheError::UnexpectedReply {
                command: "HMGET".to_owned(),
            });
        }
        Ok(reply.into_iter().collect())
    }

    /// One field, or `NotCached`.
    pub async fn read_field(&self, page_id: &str, field: &str) -> CacheResult<String> {
        self.read_group(page_id, &[field])
            .await?
            .and_then(|mut values| values.pop())
            .ok_or_else(|| CacheError::NotCached {
                field: field.to_owned(),
                key: Self::key(page_id),
            })
    }

    /// Rendered documents and their wikilinks, for non-weapon pages.
    pub async fn read_documents(
        &self,
        page_id: &str,
    ) -> CacheResult<Option<(Vec<Document>, WikiLinkMap)>> {
        let Some(values) = self
            .read_group(page_id, &[FIELD_CONTENT, FIELD_WIKILINKS])
            .await?
        else {
            return Ok(None);
        };
        Ok(Some((parse_json(&values[0])?, parse_json(&values[1])?)))
    }

    /// The full weapon group, for weapon pages.
    pub async fn read_weapon(&self, page_id: &str) -> CacheResult<Option<CachedWeapon>> {
        let fields = [
            FIELD_CONTENT,
            FIELD_WIKILINKS,
            FIELD_STATS,
            FIELD_RARITY,
            FIELD_MAX_RARITY,
        ];
        let Some(values) = self.read_group(page_id, &fields).await? else {
            return Ok(None);
        };
        Ok(Some(CachedWeapon {
            documents: parse_json(&values[0])?,
            wikilinks: parse_json(&values[1])?,
            stats: parse_json(&values[2])?,
            rarity: parse_json(&values[3])?,
            max_rarity: parse_json(&values[4])?,
        }))
    }

    pub async fn write_documents(
        &self,
        page_id: &str,
        category: RequestCategory,
        documents: &[Document],
        wikilinks: &WikiLinkMap,
    ) -> CacheResult<()> {
        let mut batch = Batch::new();
        batch.hset(Self::key(page_id), content_fields(category, documents, wikilinks)?);
        self.store.execute(batch).await?;
        Ok(())
    }

    pub async fn write_weapon(
        &self,
        page_id: &str,
        documents: &[Document],
        wikilinks: &WikiLinkMap,
        stats: &[WeaponStats],
        rarity: u8,
        max_rarity: u8,
    ) -> CacheResult<()> {
        let mut fields = content_fields(RequestCategory::Weapons, documents, wikilinks)?;
        fields.push((FIELD_STATS.to_owned(), dump_json(&stats)?));
        fields.push((FIELD_RARITY.to_owned(), rarity.to_string()));
        fields.push((FIELD_MAX_RARITY.to_owned(), max_rarity.to_string()));

        let mut batch = Batch::new();
        batch.hset(Self::key(page_id), fields);
        self.store.execute(batch).await?;
        Ok(())
    }
}

fn content_fields(
    category: RequestCategory,
    documents: &[Document],
    wikilinks: &WikiLinkMap,
) -> CacheResult<Vec<(String, String)>> {
    Ok(vec![
        (FIELD_CATEGORY.to_owned(), category.as_str().to_owned()),
        (FIELD_CONTENT.to_owned(), dump_json(&documents)?),
        (FIELD_WIKILINKS.to_owned(), dump_json(wikilinks)?),
    ])
}

#[cfg(test)]
pub(crate) mod memory {
    //! In-memory stand-in for the Redis store, with TTL-stamp counting.

    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    pub struct MemoryStore {
        hashes: Mutex<HashMap<String, HashMap<String, String>>>,
        pub expire_counts: Mutex<HashMap<String, usize>>,
    }

    #[async_trait]
    impl KeyValueStore for MemoryStore {
        async fn execute(&self, batch: Batch) -> CacheResult<Vec<Vec<Option<String>>>> {
            let mut hashes = self.hashes.lock().unwrap();
            let mut replies = Vec::new();
            for command in batch.finalize() {
                match command {
                    Command::HashSet { key, fields } => {
                        hashes.entry(key).or_default().extend(fields);
                    }
                    Command::HashGet { key, fields } => {
                        let hash = hashes.get(&key);
                        replies.push(
                            fields
                                .iter()
                                .map(|f| hash.and_then(|h| h.get(f)).cloned())
                                .collect(),
                        );
                    }
                    Command::Expire { key, .. } => {
                        *self.expire_counts.lock().unwrap().entry(key).or_default() += 1;
                    }
                }
            }
            Ok(replies)
        }
    }
}
