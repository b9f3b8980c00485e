//! Search service: request validation, query embedding, and retrieval
//! against the currently published [`Generation`].
//!
//! The service holds one shared [`EmbeddingProvider`] and at most one
//! published generation. Publishing replaces the whole generation in a
//! single `Arc` swap; every search pins the generation it started with,
//! so a concurrent reload is never observed halfway.
//!
//! # Request Pipeline
//!
//! 1. Trim the query; empty → [`SearchError::InvalidQuery`].
//! 2. Parse the granularity label → [`SearchError::InvalidGranularity`].
//! 3. Check the date range; start after end → `InvalidQuery`.
//! 4. Resolve `k`: absent → `default_k`, zero → `InvalidQuery`,
//!    above `max_k` → clamped.
//! 5. Pin the current generation → [`SearchError::IndexUnavailable`].
//! 6. Embed the query, then scan the matching [`GranularityIndex`] on the
//!    blocking pool so a caller-side timeout can abandon the request.
//!
//! Validation failures never reach the embedder.
//!
//! [`GranularityIndex`]: crate::index::GranularityIndex

use std::sync::{Arc, RwLock};

use chrono::NaiveDate;

use crate::embedding::{embed_query, EmbeddingProvider};
use crate::error::{Result, SearchError};
use crate::generation::Generation;
use crate::models::{DateRange, Granularity, SearchResult};

/// Default number of results when the caller does not ask for a count.
pub const DEFAULT_K: usize = 10;

/// Upper bound on results per request.
pub const MAX_K: usize = 100;

/// Retrieval limits, decoupled from application config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchParams {
    /// Results returned when the request does not specify `k`.
    pub default_k: usize,
    /// Requests above this are clamped, not rejected.
    pub max_k: usize,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            default_k: DEFAULT_K,
            max_k: MAX_K,
        }
    }
}

/// Shared, thread-safe search entry point.
pub struct SearchService {
    provider: Arc<dyn EmbeddingProvider>,
    params: SearchParams,
    current: RwLock<Option<Arc<Generation>>>,
}

impl SearchService {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, params: SearchParams) -> Self {
        let params = SearchParams {
            max_k: params.max_k.max(1),
            default_k: params.default_k.clamp(1, params.max_k.max(1)),
        };
        Self {
            provider,
            params,
            current: RwLock::new(None),
        }
    }

    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    pub fn params(&self) -> SearchParams {
        self.params
    }

    /// Make `generation` the one every subsequent search sees.
    ///
    /// A generation built with a different model configuration than the
    /// service's provider is rejected with [`SearchError::ModelMismatch`]
    /// and the previous generation stays published.
    pub fn publish(&self, generation: Generation) -> Result<Arc<Generation>> {
        let expected = self.provider.model_id();
        if generation.model_id() != expected {
            return Err(SearchError::ModelMismatch(format!(
                "generation was built with '{}' but the service embeds queries with '{}'",
                generation.model_id(),
                expected
            )));
        }

        let generation = Arc::new(generation);
        let previous = {
            let mut slot = self
                .current
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            slot.replace(Arc::clone(&generation))
        };

        tracing::info!(
            generation = %generation.id(),
            previous = ?previous.map(|p| p.id()),
            entries = generation.entries().len(),
            "published index generation"
        );
        Ok(generation)
    }

    /// The published generation, if any.
    pub fn current(&self) -> Option<Arc<Generation>> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// The published generation, or [`SearchError::IndexUnavailable`].
    pub fn generation(&self) -> Result<Arc<Generation>> {
        self.current().ok_or(SearchError::IndexUnavailable)
    }

    /// Apply the default and the upper bound to a requested result count.
    pub fn resolve_k(&self, k: Option<usize>) -> Result<usize> {
        match k {
            None => Ok(self.params.default_k),
            Some(0) => Err(SearchError::InvalidQuery(
                "k must be a positive integer".to_string(),
            )),
            Some(k) => Ok(k.min(self.params.max_k)),
        }
    }

    /// Search with a granularity given as text (`"paragraphs"`,
    /// `"sentence"`, ...), as it arrives from the HTTP or CLI layer.
    pub async fn search(
        &self,
        query: &str,
        granularity: &str,
        k: Option<usize>,
    ) -> Result<Vec<SearchResult>> {
        self.search_between(query, granularity, k, None, None).await
    }

    /// [`search`](Self::search) limited to entries dated between `start`
    /// and `end`, both inclusive and both optional.
    pub async fn search_between(
        &self,
        query: &str,
        granularity: &str,
        k: Option<usize>,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<SearchResult>> {
        let query = validate_query(query)?;
        let granularity: Granularity = granularity.parse()?;
        let range = DateRange::new(start, end)?;
        self.search_in(query, granularity, k, range).await
    }

    /// Search one granularity's index.
    pub async fn search_in(
        &self,
        query: &str,
        granularity: Granularity,
        k: Option<usize>,
        range: DateRange,
    ) -> Result<Vec<SearchResult>> {
        let query = validate_query(query)?;
        let k = self.resolve_k(k)?;
        let generation = self.generation()?;

        let embedding = embed_query(self.provider.as_ref(), query).await?;
        let results = tokio::task::spawn_blocking(move || {
            scan(&generation, granularity, &embedding, k, &range)
        })
        .await
        .map_err(|e| SearchError::TaskFailed(e.to_string()))??;

        Ok(results)
    }
}

fn scan(
    generation: &Generation,
    granularity: Granularity,
    embedding: &[f32],
    k: usize,
    range: &DateRange,
) -> Result<Vec<SearchResult>> {
    let hits = generation
        .index(granularity)
        .search_within(embedding, k, range)?;

    tracing::debug!(
        generation = %generation.id(),
        %granularity,
        k,
        start = ?range.start(),
        end = ?range.end(),
        hits = hits.len(),
        "search complete"
    );

    Ok(hits
        .into_iter()
        .map(|hit| SearchResult {
            date: hit.chunk.date,
            text: hit.chunk.text.clone(),
            similarity: hit.similarity,
            entry_id: hit.chunk.entry_id.clone(),
            chunk_id: hit.chunk.id.clone(),
            granularity,
        })
        .collect())
}

impl std::fmt::Debug for SearchService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchService")
            .field("model", &self.provider.model_id())
            .field("params", &self.params)
            .field("generation", &self.current().map(|g| g.id()))
            .finish()
    }
}

fn validate_query(query: &str) -> Result<&str> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(SearchError::InvalidQuery(
            "query must not be empty".to_string(),
        ));
    }
    Ok(trimmed)
}
