//! Search orchestration: cache, predicate building, concurrent fetch and
//! count, vehicle fallback, and relevance ranking.

use std::sync::Arc;

use time::Duration;
use tracing::{debug, info, instrument, warn};

use super::cache::{cache_key, SearchCache, DEFAULT_TTL};
use super::compatibility::CompatibilityGenerator;
use super::compatibility_worker::CompatibilityRefresher;
use super::parser::QueryParser;
use super::predicate::{CatalogQuery, Pagination, PredicateSet, SortOrder};
use super::scoring::{rank, score_in_place};
use super::suggestions::suggest;
use super::traits::{CatalogStore, Result};
use super::types::{
    CatalogItem, ItemId, ParsedQuery, RefreshStats, SearchFilters, SearchResponse, SortBy,
};
use crate::domain::clock::Clock;

/// Configuration for the search service.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Page size when the caller gives none
    pub default_limit: u32,
    /// Largest page size a caller may request
    pub max_limit: u32,
    pub cache_ttl: Duration,
    /// Items per page when walking the catalog for a compatibility refresh
    pub refresh_batch_size: i64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: 50,
            max_limit: 200,
            cache_ttl: DEFAULT_TTL,
            refresh_batch_size: 100,
        }
    }
}

/// Search service over a catalog store.
///
/// # Examples
///
/// ```ignore
/// let service = CatalogSearchService::with_defaults(store, Arc::new(SystemClock));
/// let response = service.search(filters).await?;
/// ```
pub struct CatalogSearchService<S: CatalogStore> {
    store: S,
    cache: SearchCache<SearchResponse>,
    clock: Arc<dyn Clock>,
    config: SearchConfig,
}

impl<S: CatalogStore> CatalogSearchService<S> {
    pub fn new(store: S, clock: Arc<dyn Clock>, config: SearchConfig) -> Self {
        let cache = SearchCache::new(config.cache_ttl, Arc::clone(&clock));
        Self {
            store,
            cache,
            clock,
            config,
        }
    }

    /// Create a search service with default configuration.
    #[cfg(test)]
    pub fn with_defaults(store: S, clock: Arc<dyn Clock>) -> Self {
        Self::new(store, clock, SearchConfig::default())
    }

    pub fn cache(&self) -> &SearchCache<SearchResponse> {
        &self.cache
    }

    /// Parser bound to the current year.
    pub fn parser(&self) -> QueryParser {
        QueryParser::from_clock(self.clock.as_ref())
    }

    /// Run a search, serving from the cache when possible.
    ///
    /// Successful responses are cached under the canonical key of `filters`,
    /// including empty ones. Degraded responses are not cached. A hit stored
    /// under differently spaced or cased text echoes this caller's text.
    #[instrument(skip_all, fields(search = ?filters.search))]
    pub async fn search(&self, filters: SearchFilters) -> Result<Arc<SearchResponse>> {
        let key = cache_key(&filters);
        if let Some(hit) = key.as_deref().and_then(|key| self.cache.get(key)) {
            debug!("Search cache hit");
            return Ok(echo_search_text(hit, &filters));
        }

        let response = self.execute(&filters).await?;

        match key {
            Some(key) if !response.degraded => Ok(self.cache.set(key, response)),
            _ => Ok(Arc::new(response)),
        }
    }

    async fn execute(&self, filters: &SearchFilters) -> Result<SearchResponse> {
        let parsed = filters.search_text().map(|text| self.parser().parse(text));

        let sort_by = filters.sort_by.unwrap_or(if parsed.is_some() {
            SortBy::Relevance
        } else {
            SortBy::Newest
        });
        let limit = filters
            .limit
            .unwrap_or(self.config.default_limit)
            .clamp(1, self.config.max_limit.max(1));
        let applied = SearchFilters {
            sort_by: Some(sort_by),
            limit: Some(limit),
            ..filters.clone()
        };

        let primary_query = build_query(&applied, parsed.as_ref(), sort_by, limit)?;
        let primary = self.fetch(&primary_query).await;

        let primary_empty = !matches!(&primary, Ok((items, _)) if !items.is_empty());
        if primary_empty && applied.vehicle_filter().is_some() && parsed.is_some() {
            let relaxed = applied.without_vehicle();
            let fallback_query = build_query(&relaxed, parsed.as_ref(), sort_by, limit)?;

            match self.fetch(&fallback_query).await {
                Ok((items, total)) if !items.is_empty() => {
                    let degraded = primary.is_err();
                    if let Err(e) = &primary {
                        warn!(error = %e, "Primary catalog fetch failed, serving fallback results");
                    }
                    info!(
                        count = items.len(),
                        "No items matched the vehicle filter, using results without it"
                    );
                    return Ok(respond(items, total, relaxed, parsed, sort_by, true, degraded));
                }
                Ok(_) => debug!("Fallback search returned no items"),
                Err(e) => warn!(error = %e, "Fallback search failed"),
            }
        }

        let (items, total) = primary?;
        Ok(respond(items, total, applied, parsed, sort_by, false, false))
    }

    /// Fetch a page and the total count concurrently. Both must succeed.
    async fn fetch(&self, query: &CatalogQuery) -> Result<(Vec<CatalogItem>, i64)> {
        let (items, total) = tokio::join!(
            self.store.fetch_items(query),
            self.store.count_items(&query.predicates)
        );
        Ok((items?, total?))
    }

    /// Suggestions for a partially typed query.
    pub fn suggestions(&self, partial: &str, limit: usize) -> Vec<String> {
        suggest(&self.parser(), partial, limit)
    }

    /// Drop cached responses that contain `item_id`. Returns how many.
    pub fn invalidate(&self, item_id: ItemId) -> usize {
        let removed = self
            .cache
            .invalidate_if(|_, response| response.contains_item(item_id));
        debug!(item_id = %item_id, removed, "Invalidated cached searches for item");
        removed
    }

    /// Drop cached responses whose filter key contains `needle`, such as a
    /// brand or category value. Returns how many.
    pub fn invalidate_matching(&self, needle: &str) -> usize {
        let removed = self.cache.clear_by_substring(needle);
        debug!(needle, removed, "Invalidated cached searches by key");
        removed
    }

    pub fn invalidate_all(&self) {
        self.cache.clear();
        debug!("Cleared search cache");
    }
}

impl<S: CatalogStore + Clone> CatalogSearchService<S> {
    fn refresher(&self) -> CompatibilityRefresher<S> {
        CompatibilityRefresher::new(
            self.store.clone(),
            CompatibilityGenerator::from_clock(self.clock.as_ref()),
            self.config.refresh_batch_size,
        )
    }

    /// Regenerate compatibility for the whole catalog.
    ///
    /// Clears the cache if any item changed.
    pub async fn refresh_compatibility(&self) -> Result<RefreshStats> {
        let stats = self.refresher().refresh().await?;
        if stats.updated > 0 {
            self.invalidate_all();
        }
        Ok(stats)
    }

    /// Regenerate compatibility for one item. Returns whether it changed.
    pub async fn refresh_item_compatibility(&self, item_id: ItemId) -> Result<bool> {
        let changed = self.refresher().refresh_item(item_id).await?;
        if changed {
            self.invalidate_all();
        }
        Ok(changed)
    }
}

fn build_query(
    filters: &SearchFilters,
    parsed: Option<&ParsedQuery>,
    sort_by: SortBy,
    limit: u32,
) -> Result<CatalogQuery> {
    Ok(CatalogQuery {
        predicates: PredicateSet::from_filters(filters, parsed)?,
        sort: SortOrder::for_sort(sort_by),
        pagination: Pagination::new(filters.page, limit),
    })
}

/// Copy of a cached response carrying the caller's own search text.
fn echo_search_text(hit: Arc<SearchResponse>, filters: &SearchFilters) -> Arc<SearchResponse> {
    if hit.applied_filters.search == filters.search {
        return hit;
    }

    let mut response = SearchResponse::clone(&hit);
    response.applied_filters.search = filters.search.clone();
    if let (Some(parsed), Some(text)) = (response.parsed_query.as_mut(), filters.search_text()) {
        parsed.original_query = text.to_string();
    }
    Arc::new(response)
}

fn respond(
    items: Vec<CatalogItem>,
    total_count: i64,
    applied_filters: SearchFilters,
    parsed_query: Option<ParsedQuery>,
    sort_by: SortBy,
    fallback_applied: bool,
    degraded: bool,
) -> SearchResponse {
    let items = match (&parsed_query, sort_by) {
        (Some(parsed), SortBy::Relevance) => rank(items, parsed),
        (parsed, _) => score_in_place(items, parsed.as_ref()),
    };

    SearchResponse {
        items,
        total_count,
        applied_filters,
        parsed_query,
        fallback_applied,
        degraded,
    }
}
