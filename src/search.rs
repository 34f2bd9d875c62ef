use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::SearchConfig;
use crate::error::{Result, TriageError};
use crate::filter::FeedbackFilters;
use crate::models::{FeedbackItem, SearchMethod, SearchParams, SearchResponse};
use crate::relevance::RelevanceSearch;
use crate::semantic::{IndexHit, SemanticIndex};
use crate::store::FeedbackCache;

/// Items produced by one retrieval path, in ranking order
#[derive(Debug, Clone)]
pub struct Retrieval {
    pub method: SearchMethod,
    pub items: Vec<FeedbackItem>,
}

/// Join index references against the loaded collection.
///
/// References that do not resolve to a known id are dropped; repeated
/// references keep their first position.
pub fn resolve_hits(collection: &[FeedbackItem], hits: &[IndexHit]) -> Vec<FeedbackItem> {
    let by_id: HashMap<&str, &FeedbackItem> = collection
        .iter()
        .rev()
        .map(|item| (item.id.as_str(), item))
        .collect();

    let mut emitted = HashSet::new();
    let resolved: Vec<FeedbackItem> = hits
        .iter()
        .filter_map(|hit| by_id.get(hit.feedback_id()).copied())
        .filter(|item| emitted.insert(item.id.as_str()))
        .cloned()
        .collect();

    let unresolved = hits.len() - resolved.len();
    if unresolved > 0 {
        debug!(
            unresolved,
            "Dropped index references without a matching feedback item"
        );
    }
    resolved
}

/// Retrieval, filtering and truncation shared by search, summarize and the agent tools
pub struct FeedbackSearch {
    cache: Arc<FeedbackCache>,
    index: Arc<dyn SemanticIndex>,
    relevance: RelevanceSearch,
    config: SearchConfig,
    semantic_max_results: usize,
}

impl FeedbackSearch {
    pub fn new(
        cache: Arc<FeedbackCache>,
        index: Arc<dyn SemanticIndex>,
        config: SearchConfig,
        semantic_max_results: usize,
    ) -> Self {
        Self {
            relevance: RelevanceSearch::new(config.token_policy()),
            cache,
            index,
            config,
            semantic_max_results,
        }
    }

    /// The full feedback collection
    pub async fn collection(&self) -> Result<Arc<Vec<FeedbackItem>>> {
        self.cache.get_or_load().await
    }

    pub fn index(&self) -> &Arc<dyn SemanticIndex> {
        &self.index
    }

    pub fn relevance(&self) -> &RelevanceSearch {
        &self.relevance
    }

    /// Requested or default limit, within `1..=max_limit`. A zero maximum counts as 1.
    pub fn clamp_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.config.default_limit)
            .clamp(1, self.config.max_limit.max(1))
    }

    pub fn clamp_max_items(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.config.default_max_items)
            .clamp(1, self.config.max_max_items.max(1))
    }

    /// Semantic lookup with a transparent fallback to text relevance
    pub async fn retrieve(&self, query: &str) -> Result<Retrieval> {
        let collection = self.collection().await?;

        match self.index.search(query, self.semantic_max_results).await {
            Ok(hits) => {
                let items = resolve_hits(&collection, &hits);
                debug!(
                    query,
                    hits = hits.len(),
                    resolved = items.len(),
                    "Semantic retrieval complete"
                );
                Ok(Retrieval {
                    method: SearchMethod::Semantic,
                    items,
                })
            }
            Err(e) => {
                warn!(error = %e, "Semantic search unavailable, falling back to text search");
                Ok(Retrieval {
                    method: SearchMethod::Text,
                    items: self.relevance.search(&collection, query),
                })
            }
        }
    }

    /// Retrieve, filter, and keep at most `cap` items
    pub async fn retrieve_filtered(
        &self,
        query: &str,
        filters: &FeedbackFilters,
        cap: usize,
    ) -> Result<Retrieval> {
        if query.trim().is_empty() {
            return Err(TriageError::InvalidInput("Query is required".to_string()));
        }

        let Retrieval { method, items } = self.retrieve(query).await?;
        let mut items = filters.apply(items);
        items.truncate(cap);

        Ok(Retrieval { method, items })
    }

    pub async fn search(&self, params: SearchParams) -> Result<SearchResponse> {
        let limit = self.clamp_limit(params.limit);
        let Retrieval { method, items } = self
            .retrieve_filtered(&params.query, &params.filters, limit)
            .await?;

        info!(
            query = %params.query,
            method = ?method,
            results = items.len(),
            limit,
            "Search complete"
        );

        Ok(SearchResponse {
            search_method: method,
            total_results: items.len(),
            filters: params.filters,
            results: items,
        })
    }
}
