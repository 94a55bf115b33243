//! The request pipeline: cache lookup, remote fetch, model building,
//! rendering and the fire-and-forget cache write-back.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::common::error::{ModelError, StoreResult, WikiError, WikiResult};
use crate::wiki::cache::WikiCache;
use crate::wiki::client::{PageAlias, PageContent, PageSource};
use crate::wiki::constants::RequestCategory;
use crate::wiki::markup::{classify_fields, extract_fields, scan_wikilinks, MarkupRenderer, PageKind};
use crate::wiki::model::{Battlesuit, StigmataSet, Weapon, WeaponStats};
use crate::wiki::render::{
    render_battlesuit, render_stigmata, render_weapon, weapon_header_values, Document,
    WikiLinkMap, WikiLinkTarget,
};

/// Where alias rows come from. The orchestrator resolves the names a page
/// mentions into link targets through this seam.
#[async_trait]
pub trait AliasLookup: Send + Sync {
    async fn find_by_titles(&self, titles: &[String]) -> StoreResult<Vec<PageAlias>>;
}

/// Extra data a response carries beyond its documents.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestMeta {
    None,
    Weapon {
        stats: Vec<WeaponStats>,
        min_rarity: u8,
        max_rarity: u8,
    },
}

/// One fully handled wiki request.
#[derive(Debug, Clone)]
pub struct WikiResponse {
    pub documents: Vec<Document>,
    pub wikilinks: WikiLinkMap,
    pub meta: RequestMeta,
}

pub struct Orchestrator {
    cache: WikiCache,
    source: Arc<dyn PageSource>,
    aliases: Arc<dyn AliasLookup>,
    renderer: MarkupRenderer,
}

impl Orchestrator {
    pub fn new(
        cache: WikiCache,
        source: Arc<dyn PageSource>,
        aliases: Arc<dyn AliasLookup>,
    ) -> Self {
        Self {
            cache,
            source,
            aliases,
            renderer: MarkupRenderer::new(),
        }
    }

    /// Serve one page request: cache first, then the live wiki. A page
    /// missing from both is a hard error.
    pub async fn handle_request(&self, category: &str, page_id: &str) -> WikiResult<WikiResponse> {
        let category =
            RequestCategory::parse(category).ok_or_else(|| WikiError::UnknownCategory {
                got: category.to_owned(),
            })?;

        match category {
            RequestCategory::Battlesuits => self.handle_page(category, page_id).await,
            RequestCategory::Stigmata | RequestCategory::EventStigmata => {
                self.handle_page(category, page_id).await
            }
            RequestCategory::Weapons => self.handle_weapon(page_id).await,
            other => Err(WikiError::UnknownCategory {
                got: other.as_str().to_owned(),
            }),
        }
    }

    async fn handle_page(
        &self,
        category: RequestCategory,
        page_id: &str,
    ) -> WikiResult<WikiResponse> {
        match self.cache.read_documents(page_id).await {
            Ok(Some((documents, wikilinks))) => {
                debug!(page_id, "serving page from cache");
                return Ok(WikiResponse {
                    documents,
                    wikilinks,
                    meta: RequestMeta::None,
                });
            }
            Ok(None) => {}
            Err(error) => warn!(page_id, %error, "cache read failed, falling back to wiki"),
        }

        let page = self.fetch_page(page_id).await?;
        if let Some(reported) = page.category {
            if reported != category {
                debug!(
                    page_id,
                    reported = reported.as_str(),
                    requested = category.as_str(),
                    "page category differs from requested category"
                );
            }
        }
        let fields = extract_fields(&page.wikitext);
        let kind = classify_fields(&fields).ok_or(ModelError::UnknownVariant)?;

        let (documents, candidates, meta) = match kind {
            PageKind::Battlesuit => {
                let battlesuit = Battlesuit::parse(&fields)?;
                let candidates = battlesuit_candidates(&battlesuit);
                (
                    render_battlesuit(&battlesuit, &self.renderer),
                    candidates,
                    RequestMeta::None,
                )
            }
            PageKind::StigmataSet => {
                let set = StigmataSet::parse(&fields)?;
                (
                    render_stigmata(&set, &self.renderer),
                    Vec::new(),
                    RequestMeta::None,
                )
            }
            PageKind::Weapon => {
                // A weapon page reached through a stigmata category row;
                // serve it as a weapon anyway.
                return self.build_weapon(page_id, &page).await;
            }
        };

        let wikilinks = self
            .resolve_links(&page.wikitext, candidates)
            .await?;

        self.spawn_write_back(page_id, category, &documents, &wikilinks, None);
        Ok(WikiResponse {
            documents,
            wikilinks,
            meta,
        })
    }

    async fn handle_weapon(&self, page_id: &str) -> WikiResult<WikiResponse> {
        match self.cache.read_weapon(page_id).await {
            Ok(Some(cached)) => {
                debug!(page_id, "serving weapon from cache");
                let mut documents = cached.documents;
                if let (Some(stats), false) = (cached.stats.first(), documents.is_empty()) {
                    documents[0] = documents[0].format(&weapon_header_values(stats, cached.max_rarity));
                }
                return Ok(WikiResponse {
                    documents,
                    wikilinks: cached.wikilinks,
                    meta: RequestMeta::Weapon {
                        stats: cached.stats,
                        min_rarity: cached.rarity,
                        max_rarity: cached.max_rarity,
                    },
                });
            }
            Ok(None) => {}
            Err(error) => warn!(page_id, %error, "cache read failed, falling back to wiki"),
        }

        let page = self.fetch_page(page_id).await?;
        self.build_weapon(page_id, &page).await
    }

    async fn build_weapon(&self, page_id: &str, page: &PageContent) -> WikiResult<WikiResponse> {
        let fields = extract_fields(&page.wikitext);
        let weapon = Weapon::parse(&fields)?;

        let documents = render_weapon(&weapon, &self.renderer);
        let candidates: Vec<String> = weapon
            .pri_arm
            .iter()
            .chain(weapon.pri_arm_base.iter())
            .cloned()
            .collect();
        let wikilinks = self.resolve_links(&page.wikitext, candidates).await?;

        let min_rarity = weapon.rarity.get();
        let max_rarity = weapon.max_rarity().get();
        self.spawn_write_back(
            page_id,
            RequestCategory::Weapons,
            &documents,
            &wikilinks,
            Some((weapon.stats.clone(), min_rarity, max_rarity)),
        );

        let mut documents = documents;
        documents[0] = documents[0].format(&weapon_header_values(&weapon.stats[0], max_rarity));

        Ok(WikiResponse {
            documents,
            wikilinks,
            meta: RequestMeta::Weapon {
                stats: weapon.stats,
                min_rarity,
                max_rarity,
            },
        })
    }

    async fn fetch_page(&self, page_id: &str) -> WikiResult<PageContent> {
        match self.source.content_revision(page_id).await {
            Ok(page) => {
                debug!(pageid = page.pageid, title = %page.title, "fetched page");
                Ok(page)
            }
            Err(WikiError::PageNotFound { .. }) => Err(WikiError::Unresolvable {
                page_id: page_id.to_owned(),
            }),
            Err(error) => Err(error),
        }
    }

    /// Resolve every name the page mentions into alias rows, keyed by the
    /// name as it appears on the page.
    async fn resolve_links(
        &self,
        wikitext: &str,
        extra_candidates: Vec<String>,
    ) -> WikiResult<WikiLinkMap> {
        let mut candidates: BTreeSet<String> = extra_candidates.into_iter().collect();
        for link in scan_wikilinks(wikitext) {
            if link.has_nested || link.target.contains(':') {
                continue;
            }
            candidates.insert(link.target);
        }
        if candidates.is_empty() {
            return Ok(WikiLinkMap::new());
        }

        let titles: Vec<String> = candidates.into_iter().collect();
        let rows = self.aliases.find_by_titles(&titles).await?;

        let mut wikilinks = WikiLinkMap::new();
        for row in rows {
            wikilinks.insert(
                row.pageid.to_string(),
                WikiLinkTarget {
                    title: row.alias_of,
                    category: row.main_category,
                },
            );
        }
        Ok(wikilinks)
    }

    fn spawn_write_back(
        &self,
        page_id: &str,
        category: RequestCategory,
        documents: &[Document],
        wikilinks: &WikiLinkMap,
        weapon_extras: Option<(Vec<WeaponStats>, u8, u8)>,
    ) {
        let cache = self.cache.clone();
        let page_id = page_id.to_owned();
        let documents = documents.to_vec();
        let wikilinks = wikilinks.clone();

        tokio::spawn(async move {
            let result = match weapon_extras {
                Some((stats, rarity, max_rarity)) => {
                    cache
                        .write_weapon(&page_id, &documents, &wikilinks, &stats, rarity, max_rarity)
                        .await
                }
                None => {
                    cache
                        .write_documents(&page_id, category, &documents, &wikilinks)
                        .await
                }
            };
            match result {
                Ok(()) => info!(page_id, "page cached"),
                Err(error) => warn!(page_id, %error, "cache write-back failed"),
            }
        });
    }
}

fn battlesuit_candidates(battlesuit: &Battlesuit) -> Vec<String> {
    let mut candidates = vec![battlesuit.character.clone()];
    candidates.extend(battlesuit.augment.clone());
    candidates.extend(battlesuit.awakening.clone());
    for recommendation in &battlesuit.recommendations {
        for equipment in recommendation.equipment() {
            if equipment.name != "..." {
                candidates.push(equipment.name.clone());
            }
        }
    }
    candidates
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::wiki::cache::memory::MemoryStore;
    use crate::wiki::cache::KeyValueStore;
    use crate::wiki::client::PageInfo;

    struct CountingSource {
        wikitext: String,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PageSource for CountingSource {
        async fn content_revision(&self, page_id: &str) -> WikiResult<PageContent> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.wikitext.is_empty() {
                return Err(WikiError::PageNotFound {
                    page_id: page_id.to_owned(),
                });
            }
            Ok(PageContent {
                pageid: 7,
                title: "Key of Reason".to_owned(),
                category: Some(RequestCategory::Weapons),
                wikitext: self.wikitext.clone(),
            })
        }

        async fn category_pages(&self, _: RequestCategory) -> WikiResult<Vec<PageInfo>> {
            Ok(Vec::new())
        }
    }

    struct NoAliases;

    #[async_trait]
    impl AliasLookup for NoAliases {
        async fn find_by_titles(&self, _: &[String]) -> StoreResult<Vec<PageAlias>> {
            Ok(Vec::new())
        }
    }

    fn weapon_wikitext() -> String {
        "{{weapon\
         |name=Key of Reason|type=Cannons|rarity=3\
         |description=A key that unlocks [[reason]].\
         |ATK=285|CRT=21\
         |ATK_baseRarity=160|CRT_baseRarity=9\
         |ATK_maxRarity=285|CRT_maxRarity=21\
         |s1_name=Icicle Crash|s1_effect=[SP: 25][CD: 18s] Deals heavy ice damage.\
         }}"
            .to_owned()
    }

    fn orchestrator(source: Arc<CountingSource>) -> Orchestrator {
        let store = Arc::new(MemoryStore::default());
        Orchestrator::new(WikiCache::new(store), source, Arc::new(NoAliases))
    }

    #[tokio::test]
    async fn test_second_request_served_from_cache() {
        let source = Arc::new(CountingSource {
            wikitext: weapon_wikitext(),
            calls: AtomicUsize::new(0),
        });
        let orchestrator = orchestrator(source.clone());

        let first = orchestrator
            .handle_request("Category:Weapons", "7")
            .await
            .unwrap();
        assert_eq!(first.documents.len(), 2);

        // Let the fire-and-forget write-back land.
        tokio::time::sleep(Duration::from_millis(20)).await;

        let second = orchestrator
            .handle_request("Category:Weapons", "7")
            .await
            .unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(second.documents, first.documents);
        assert_eq!(second.meta, first.meta);
    }

    #[tokio::test]
    async fn test_weapon_header_formatted_with_lowest_tier() {
        let source = Arc::new(CountingSource {
            wikitext: weapon_wikitext(),
            calls: AtomicUsize::new(0),
        });
        let orchestrator = orchestrator(source);

        let response = orchestrator
            .handle_request("Category:Weapons", "7")
            .await
            .unwrap();

        let description = response.documents[0].description.as_deref().unwrap();
        assert!(description.contains("**ATK**: 160"));
        assert!(!description.contains("%attack"));
        match response.meta {
            RequestMeta::Weapon {
                min_rarity,
                max_rarity,
                ref stats,
            } => {
                assert_eq!(min_rarity, 3);
                assert_eq!(max_rarity, 4);
                assert_eq!(stats.len(), 2);
            }
            RequestMeta::None => panic!("expected weapon meta"),
        }
    }

    #[tokio::test]
    async fn test_missing_everywhere_is_unresolvable() {
        let source = Arc::new(CountingSource {
            wikitext: String::new(),
            calls: AtomicUsize::new(0),
        });
        let orchestrator = orchestrator(source);

        let result = orchestrator.handle_request("Category:Weapons", "404").await;
        assert!(matches!(result, Err(WikiError::Unresolvable { .. })));
    }

    #[tokio::test]
    async fn test_unknown_category_is_rejected() {
        let source = Arc::new(CountingSource {
            wikitext: weapon_wikitext(),
            calls: AtomicUsize::new(0),
        });
        let orchestrator = orchestrator(source);

        let result = orchestrator.handle_request("Category:Outfits", "7").await;
        assert!(matches!(result, Err(WikiError::UnknownCategory { .. })));
        let result = orchestrator.handle_request("Category:ELFs", "7").await;
        assert!(matches!(result, Err(WikiError::UnknownCategory { .. })));
    }

    #[tokio::test]
    async fn test_cached_weapon_write_back_keeps_placeholders() {
        let source = Arc::new(CountingSource {
            wikitext: weapon_wikitext(),
            calls: AtomicUsize::new(0),
        });
        let store = Arc::new(MemoryStore::default());
        let cache = WikiCache::new(store.clone() as Arc<dyn KeyValueStore>);
        let orchestrator = Orchestrator::new(cache.clone(), source, Arc::new(NoAliases));

        orchestrator
            .handle_request("Category:Weapons", "7")
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let cached = cache.read_weapon("7").await.unwrap().unwrap();
        let description = cached.documents[0].description.as_deref().unwrap();
        assert!(description.contains("%display_rarity"));
        assert!(description.contains("%attack"));
    }
}
