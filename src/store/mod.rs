//! Persistent alias table backed by SQLite.
//!
//! One row per searchable name. Canonical titles point at themselves;
//! redirects point at the canonical title. The table is fed by the
//! refresh sweep (upsert, with an optional full clear beforehand) and
//! queried by autocomplete and by the wikilink resolver.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection};
use similar::TextDiff;
use tracing::info;

use crate::common::error::StoreResult;
use crate::wiki::client::PageAlias;
use crate::wiki::constants::RequestCategory;
use crate::wiki::orchestrator::AliasLookup;

/// Maximum rows a search returns, matching Discord's autocomplete limit.
pub const SEARCH_LIMIT: usize = 25;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS hi3_wiki_pages (
    pageid        INTEGER NOT NULL,
    title         TEXT NOT NULL PRIMARY KEY,
    categories    TEXT NOT NULL,
    main_category TEXT NOT NULL,
    alias_of      TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_hi3_wiki_pages_category
    ON hi3_wiki_pages (main_category);
";

#[derive(Clone)]
pub struct AliasStore {
    connection: Arc<Mutex<Connection>>,
}

impl AliasStore {
    pub fn open(path: &str) -> StoreResult<Self> {
        Self::initialize(Connection::open(path)?)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::initialize(Connection::open_in_memory()?)
    }

    fn initialize(connection: Connection) -> StoreResult<Self> {
        connection.execute_batch(SCHEMA)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    async fn run<T, F>(&self, operation: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let connection = Arc::clone(&self.connection);
        let result = tokio::task::spawn_blocking(move || {
            let guard = connection.lock().unwrap_or_else(|poison| poison.into_inner());
            operation(&guard)
        })
        .await?;
        Ok(result?)
    }

    /// Drop every alias row. Runs before the refresh sweeps when a full
    /// rebuild is requested, so stale aliases disappear.
    pub async fn clear(&self) -> StoreResult<usize> {
        let dropped = self
            .run(|connection| connection.execute("DELETE FROM hi3_wiki_pages", []))
            .await?;
        info!(rows = dropped, "alias tables cleared");
        Ok(dropped)
    }

    /// Insert the alias rows of one category, overwriting rows that share
    /// a title. Rows of other pages are untouched.
    pub async fn upsert_category(
        &self,
        category: RequestCategory,
        rows: Vec<PageAlias>,
    ) -> StoreResult<usize> {
        self.run(move |connection| {
            let mut statement = connection.prepare(
                "INSERT OR REPLACE INTO hi3_wiki_pages
                     (pageid, title, categories, main_category, alias_of)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            let mut inserted = 0;
            for row in &rows {
                inserted += statement.execute(params![
                    row.pageid,
                    row.title,
                    row.categories.join(","),
                    row.main_category.as_str(),
                    row.alias_of,
                ])?;
            }
            Ok(inserted)
        })
        .await
        .map(|inserted| {
            info!(category = category.as_str(), rows = inserted, "alias table refreshed");
            inserted
        })
    }

    /// Exact-title lookup for a batch of names.
    pub async fn lookup(&self, titles: &[String]) -> StoreResult<Vec<PageAlias>> {
        let titles = titles.to_vec();
        self.run(move |connection| {
            let mut rows = Vec::new();
            let mut statement = connection.prepare(
                "SELECT pageid, title, categories, main_category, alias_of
                 FROM hi3_wiki_pages WHERE title = ?1",
            )?;
            for title in &titles {
                let found = statement
                    .query_map(params![title], decode_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows.extend(found);
            }
            Ok(rows)
        })
        .await
    }

    /// Fuzzy search over every alias, one result per canonical page,
    /// ranked by similarity to the query.
    pub async fn search(&self, query: &str) -> StoreResult<Vec<PageAlias>> {
        let query = query.to_lowercase();
        let mut rows = self
            .run(|connection| {
                connection
                    .prepare(
                        "SELECT pageid, title, categories, main_category, alias_of
                         FROM hi3_wiki_pages",
                    )?
                    .query_map([], decode_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()
            })
            .await?;

        let mut scored: Vec<(f32, PageAlias)> = Vec::new();
        for row in rows.drain(..) {
            let score = similarity(&query, &row.title.to_lowercase());
            match scored
                .iter_mut()
                .find(|(_, existing)| existing.alias_of == row.alias_of)
            {
                Some(entry) if entry.0 < score => *entry = (score, row),
                Some(_) => {}
                None => scored.push((score, row)),
            }
        }

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        Ok(scored
            .into_iter()
            .take(SEARCH_LIMIT)
            .map(|(_, row)| row)
            .collect())
    }
}

fn similarity(query: &str, candidate: &str) -> f32 {
    if candidate.starts_with(query) {
        return 1.0;
    }
    TextDiff::from_chars(query, candidate).ratio()
}

fn decode_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PageAlias> {
    let categories: String = row.get(2)?;
    let raw_category: String = row.get(3)?;
    let main_category = RequestCategory::parse(&raw_category).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            format!("unknown category '{raw_category}'").into(),
        )
    })?;

    Ok(PageAlias {
        pageid: row.get(0)?,
        title: row.get(1)?,
        categories: categories
            .split(',')
            .filter(|c| !c.is_empty())
            .map(str::to_owned)
            .collect(),
        main_category,
        alias_of: row.get(4)?,
    })
}

#[async_trait]
impl AliasLookup for AliasStore {
    async fn find_by_titles(&self, titles: &[String]) -> StoreResult<Vec<PageAlias>> {
        self.lookup(titles).await
    }
}

impl std::fmt::Debug for AliasStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AliasStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alias(pageid: i64, title: &str, alias_of: &str, category: RequestCategory) -> PageAlias {
        PageAlias {
            pageid,
            title: title.to_owned(),
            categories: vec!["Category:4-star Weapons".to_owned()],
            main_category: category,
            alias_of: alias_of.to_owned(),
        }
    }

    #[tokio::test]
    async fn test_lookup_round_trip() {
        let store = AliasStore::open_in_memory().unwrap();
        store
            .upsert_category(
                RequestCategory::Weapons,
                vec![
                    alias(7, "Key of Reason", "Key of Reason", RequestCategory::Weapons),
                    alias(7, "KoR", "Key of Reason", RequestCategory::Weapons),
                ],
            )
            .await
            .unwrap();

        let rows = store.lookup(&["KoR".to_owned()]).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].pageid, 7);
        assert_eq!(rows[0].alias_of, "Key of Reason");
        assert_eq!(rows[0].main_category, RequestCategory::Weapons);

        let rows = store.lookup(&["Nothing".to_owned()]).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_upsert_overwrites_rows_sharing_a_title() {
        let store = AliasStore::open_in_memory().unwrap();
        store
            .upsert_category(
                RequestCategory::Weapons,
                vec![alias(1, "Key of Reason", "Key of Reason", RequestCategory::Weapons)],
            )
            .await
            .unwrap();
        store
            .upsert_category(
                RequestCategory::Weapons,
                vec![
                    alias(9, "Key of Reason", "Key of Reason", RequestCategory::Weapons),
                    alias(2, "Blood Dance", "Blood Dance", RequestCategory::Weapons),
                ],
            )
            .await
            .unwrap();

        let rows = store.lookup(&["Key of Reason".to_owned()]).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].pageid, 9);
        assert_eq!(
            store.lookup(&["Blood Dance".to_owned()]).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_upsert_keeps_other_categories() {
        let store = AliasStore::open_in_memory().unwrap();
        store
            .upsert_category(
                RequestCategory::Stigmata,
                vec![alias(2, "Shakespeare", "Shakespeare", RequestCategory::Stigmata)],
            )
            .await
            .unwrap();
        store
            .upsert_category(
                RequestCategory::Weapons,
                vec![alias(1, "Key of Reason", "Key of Reason", RequestCategory::Weapons)],
            )
            .await
            .unwrap();

        assert_eq!(
            store.lookup(&["Shakespeare".to_owned()]).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_clear_drops_every_row() {
        let store = AliasStore::open_in_memory().unwrap();
        store
            .upsert_category(
                RequestCategory::Weapons,
                vec![alias(1, "Old Weapon", "Old Weapon", RequestCategory::Weapons)],
            )
            .await
            .unwrap();
        store
            .upsert_category(
                RequestCategory::Stigmata,
                vec![alias(2, "Shakespeare", "Shakespeare", RequestCategory::Stigmata)],
            )
            .await
            .unwrap();

        assert_eq!(store.clear().await.unwrap(), 2);
        assert!(store
            .lookup(&["Old Weapon".to_owned()])
            .await
            .unwrap()
            .is_empty());
        assert!(store
            .lookup(&["Shakespeare".to_owned()])
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_search_returns_one_row_per_page() {
        let store = AliasStore::open_in_memory().unwrap();
        store
            .upsert_category(
                RequestCategory::Weapons,
                vec![
                    alias(7, "Key of Reason", "Key of Reason", RequestCategory::Weapons),
                    alias(7, "KoR", "Key of Reason", RequestCategory::Weapons),
                    alias(8, "Keys of the Void", "Keys of the Void", RequestCategory::Weapons),
                ],
            )
            .await
            .unwrap();

        let results = store.search("key").await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.alias_of != "KoR"));
    }

    #[tokio::test]
    async fn test_search_prefers_prefix_matches() {
        let store = AliasStore::open_in_memory().unwrap();
        store
            .upsert_category(
                RequestCategory::Weapons,
                vec![
                    alias(1, "Blood Dance", "Blood Dance", RequestCategory::Weapons),
                    alias(2, "Dance of Seulbi", "Dance of Seulbi", RequestCategory::Weapons),
                ],
            )
            .await
            .unwrap();

        let results = store.search("blood").await.unwrap();
        assert_eq!(results[0].title, "Blood Dance");
    }

    #[tokio::test]
    async fn test_search_caps_results() {
        let store = AliasStore::open_in_memory().unwrap();
        let rows = (0..40)
            .map(|i| {
                alias(
                    i,
                    &format!("Weapon {i}"),
                    &format!("Weapon {i}"),
                    RequestCategory::Weapons,
                )
            })
            .collect();
        store
            .upsert_category(RequestCategory::Weapons, rows)
            .await
            .unwrap();

        let results = store.search("weapon").await.unwrap();
        assert_eq!(results.len(), SEARCH_LIMIT);
    }
}
