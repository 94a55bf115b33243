//! MediaWiki API client: paginated queries, alias sweeps and content
//! revisions.

use std::collections::{BTreeMap, VecDeque};
use std::sync::OnceLock;

use async_trait::async_trait;
use fancy_regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::common::error::{WikiError, WikiResult};
use crate::wiki::constants::RequestCategory;

/// Weapon and stigmata pages carry a per-rarity suffix in their canonical
/// titles and redirects. Aliases are stored without it.
fn rarity_suffix_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)/\d-star").unwrap())
}

fn strip_rarity_suffix(title: &str) -> String {
    rarity_suffix_pattern().replace_all(title, "").into_owned()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TitleRef {
    pub title: String,
}

/// One page record from a category sweep, with its redirects.
#[derive(Debug, Clone, Deserialize)]
pub struct PageInfo {
    pub pageid: i64,
    pub title: String,
    #[serde(default)]
    pub categories: Vec<TitleRef>,
    #[serde(default)]
    pub redirects: Vec<TitleRef>,
}

/// One row of the alias table: a searchable name pointing at the canonical
/// page title it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageAlias {
    pub pageid: i64,
    pub title: String,
    pub categories: Vec<String>,
    pub main_category: RequestCategory,
    pub alias_of: String,
}

/// Flatten a page record into alias rows.
///
/// The canonical title comes first and points at itself. Redirects whose
/// normalized form is already contained in the canonical title are noise
/// (per-rarity redirects, partial names) and are dropped, as are exact
/// duplicates.
pub fn unpack_aliases(page: &PageInfo, main_category: RequestCategory) -> Vec<PageAlias> {
    let canonical = strip_rarity_suffix(&page.title);
    let canonical_lower = canonical.to_lowercase();
    let categories: Vec<String> = page
        .categories
        .iter()
        .map(|c| c.title.clone())
        .collect();

    let mut rows = vec![PageAlias {
        pageid: page.pageid,
        title: canonical.clone(),
        categories: categories.clone(),
        main_category,
        alias_of: canonical.clone(),
    }];

    for redirect in &page.redirects {
        let alias = strip_rarity_suffix(&redirect.title);
        if canonical_lower.contains(&alias.to_lowercase()) {
            continue;
        }
        if rows.iter().any(|row| row.title == alias) {
            continue;
        }
        rows.push(PageAlias {
            pageid: page.pageid,
            title: alias,
            categories: categories.clone(),
            main_category,
            alias_of: canonical.clone(),
        });
    }

    rows
}

/// The raw wikitext of a page, with the category the API reports for it.
#[derive(Debug, Clone)]
pub struct PageContent {
    pub pageid: i64,
    pub title: String,
    pub category: Option<RequestCategory>,
    pub wikitext: String,
}

/// Where page data comes from. The orchestrator only sees this seam.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// The latest content revision of one page.
    async fn content_revision(&self, page_id: &str) -> WikiResult<PageContent>;

    /// All pages of one category, with redirects, merged across batches.
    async fn category_pages(&self, category: RequestCategory) -> WikiResult<Vec<PageInfo>>;
}

pub struct WikiClient {
    http: reqwest::Client,
    api_base: String,
}

impl WikiClient {
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.into(),
        }
    }

    /// Start a paginated query yielding records decoded by `decode`.
    fn page_query<'a, T>(
        &'a self,
        params: &[(&str, &str)],
        decode: fn(&Value) -> Vec<T>,
    ) -> PageQuery<'a, T> {
        PageQuery {
            client: self,
            params: params
                .iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                .collect(),
            continuation: Vec::new(),
            buffer: VecDeque::new(),
            decode,
            done: false,
        }
    }

    /// One API round trip with the given continuation parameters.
    async fn fetch(
        &self,
        params: &[(String, String)],
        continuation: &[(String, String)],
    ) -> WikiResult<Value> {
        let request = self
            .http
            .get(&self.api_base)
            .query(&[("action", "query"), ("format", "json")])
            .query(params)
            .query(continuation);

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(WikiError::Http {
                status,
                url: self.api_base.clone(),
            });
        }
        let body: Value = response.json().await?;
        if !body.is_object() {
            return Err(WikiError::MalformedResponse {
                message: "response body is not a JSON object".to_owned(),
            });
        }
        Ok(body)
    }
}

/// A lazily-driven paginated query.
///
/// Records are pulled one at a time with [`next`](Self::next); the next
/// batch is fetched only once every already-delivered record has been
/// consumed, and continuation parameters replace each other between
/// round trips.
pub struct PageQuery<'a, T> {
    client: &'a WikiClient,
    params: Vec<(String, String)>,
    continuation: Vec<(String, String)>,
    buffer: VecDeque<T>,
    decode: fn(&Value) -> Vec<T>,
    done: bool,
}

impl<T> PageQuery<'_, T> {
    /// The next record, or `None` once the final batch is drained.
    pub async fn next(&mut self) -> WikiResult<Option<T>> {
        loop {
            if let Some(record) = self.buffer.pop_front() {
                return Ok(Some(record));
            }
            if self.done {
                return Ok(None);
            }
            let body = self.client.fetch(&self.params, &self.continuation).await?;
            self.absorb(&body);
        }
    }

    /// Feed one response body: buffer its records and advance the
    /// continuation state, marking the query terminal on the last batch.
    fn absorb(&mut self, body: &Value) {
        if let Some(warnings) = body.get("warnings") {
            warn!(%warnings, "wiki API returned warnings");
        }

        if let Some(query) = body.get("query") {
            self.buffer.extend((self.decode)(query));
        }

        if body.get("batchcomplete").is_some() {
            debug!("wiki API batch complete");
            self.done = true;
            return;
        }
        match body.get("continue").and_then(Value::as_object) {
            Some(next) => {
                self.continuation = next
                    .iter()
                    .filter_map(|(key, value)| flatten_param(value).map(|v| (key.clone(), v)))
                    .collect();
            }
            None => self.done = true,
        }
    }
}

/// Continuation values arrive as strings or numbers.
fn flatten_param(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Decode the `pages` member of a query batch. The API keys pages by id in
/// an object; records that fail validation are logged and skipped.
fn decode_pages(query: &Value) -> Vec<PageInfo> {
    let records: Vec<&Value> = match query.get("pages") {
        Some(Value::Object(map)) => map.values().collect(),
        Some(Value::Array(list)) => list.iter().collect(),
        _ => Vec::new(),
    };

    let mut pages = Vec::new();
    for record in records {
        match PageInfo::deserialize(record) {
            Ok(page) => pages.push(page),
            Err(error) => {
                warn!(%error, "skipping malformed page record");
            }
        }
    }
    pages
}

#[async_trait]
impl PageSource for WikiClient {
    async fn content_revision(&self, page_id: &str) -> WikiResult<PageContent> {
        let params = [
            ("prop", "revisions|categories"),
            ("rvprop", "content"),
            ("rvslots", "main"),
            ("cllimit", "max"),
            ("pageids", page_id),
        ];

        let mut query = self.page_query(&params, decode_revision_pages);
        query.next().await?.ok_or_else(|| WikiError::PageNotFound {
            page_id: page_id.to_owned(),
        })
    }

    async fn category_pages(&self, category: RequestCategory) -> WikiResult<Vec<PageInfo>> {
        // Merged by page id: the API splits a page's redirects and
        // categories across continuation batches.
        let mut merged: BTreeMap<i64, PageInfo> = BTreeMap::new();

        for sub_category in category.sub_categories() {
            let params = [
                ("generator", "categorymembers"),
                ("gcmtitle", sub_category.as_str()),
                ("gcmtype", "page"),
                ("gcmlimit", "max"),
                ("prop", "redirects|categories"),
                ("rdlimit", "max"),
                ("cllimit", "max"),
            ];

            let mut query = self.page_query(&params, decode_pages);
            while let Some(page) = query.next().await? {
                match merged.get_mut(&page.pageid) {
                    Some(existing) => {
                        existing.categories.extend(page.categories);
                        existing.redirects.extend(page.redirects);
                    }
                    None => {
                        merged.insert(page.pageid, page);
                    }
                }
            }
        }

        for page in merged.values_mut() {
            page.categories.dedup();
            page.redirects.dedup();
        }
        Ok(merged.into_values().collect())
    }
}

fn decode_revision_pages(query: &Value) -> Vec<PageContent> {
    #[derive(Deserialize)]
    struct MainSlot {
        #[serde(rename = "*")]
        content: String,
    }
    #[derive(Deserialize)]
    struct Slots {
        main: MainSlot,
    }
    #[derive(Deserialize)]
    struct Revision {
        slots: Slots,
    }
    #[derive(Deserialize)]
    struct RevisionPage {
        pageid: i64,
        title: String,
        #[serde(default)]
        categories: Vec<TitleRef>,
        #[serde(default)]
        revisions: Vec<Revision>,
    }

    let records: Vec<&Value> = match query.get("pages") {
        Some(Value::Object(map)) => map.values().collect(),
        Some(Value::Array(list)) => list.iter().collect(),
        _ => Vec::new(),
    };

    let mut pages = Vec::new();
    for record in records {
        let page = match RevisionPage::deserialize(record) {
            Ok(page) => page,
            Err(error) => {
                warn!(%error, "skipping malformed revision record");
                continue;
            }
        };
        let Some(revision) = page.revisions.into_iter().next() else {
            continue;
        };
        pages.push(PageContent {
            pageid: page.pageid,
            title: page.title,
            category: page
                .categories
                .first()
                .and_then(|c| RequestCategory::parse(&c.title)),
            wikitext: revision.slots.main.content,
        });
    }
    pages
}
