//! Engine assembly and corpus reload.
//!
//! [`Engine`] ties the configuration, the embedding provider, and the
//! [`SearchService`] together. [`Engine::reload`] builds a complete new
//! generation off to the side and publishes it in one swap:
//!
//! 1. Load the corpus (blocking I/O on the blocking pool).
//! 2. Chunk all entries and fingerprint the result.
//! 3. Reuse cached vectors when the fingerprint and model match,
//!    otherwise embed every chunk and refresh the cache.
//! 4. Publish.
//!
//! The cache is an optimization: if it cannot be opened, read, or written
//! the reload logs a warning, embeds from scratch, and still publishes.
//! Any other failure leaves the previously published generation serving.
//! Reloads are serialized; a second caller waits for the first.

use anyhow::{Context, Result};
use journal_search_core::embedding::EmbeddingProvider;
use journal_search_core::generation::{GenerationSummary, PreparedCorpus};
use journal_search_core::search::SearchService;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

use crate::cache::IndexCache;
use crate::config::Config;
use crate::corpus;
use crate::embedding::create_provider;

/// Options for a single reload.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReloadOptions {
    /// Ignore (and overwrite) any cached vectors.
    pub rebuild: bool,
}

/// Where a generation's vectors came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    /// No `[cache]` path configured.
    Disabled,
    /// Vectors were read from the cache.
    Hit,
    /// Vectors were computed and written to the cache.
    Miss,
    /// `rebuild` was requested; vectors were recomputed.
    Rebuilt,
    /// The cache could not be opened, read, or written; vectors were
    /// computed and the generation was published uncached.
    Failed,
}

/// Outcome of a successful reload.
#[derive(Debug, Clone, Serialize)]
pub struct ReloadReport {
    pub generation: GenerationSummary,
    pub cache: CacheStatus,
    pub elapsed_ms: u128,
}

pub struct Engine {
    config: Arc<Config>,
    service: Arc<SearchService>,
    reload_lock: Mutex<()>,
}

impl Engine {
    /// Build an engine with the provider named in `config.embedding`.
    pub fn new(config: Config) -> Result<Self> {
        let provider = create_provider(&config.embedding)?;
        Ok(Self::with_provider(config, provider))
    }

    /// Build an engine around an existing provider.
    pub fn with_provider(config: Config, provider: Arc<dyn EmbeddingProvider>) -> Self {
        let service = SearchService::new(provider, config.retrieval.params());
        Self {
            config: Arc::new(config),
            service: Arc::new(service),
            reload_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    pub fn service(&self) -> &Arc<SearchService> {
        &self.service
    }

    /// Load, index, and publish the configured corpus.
    pub async fn reload(&self, options: ReloadOptions) -> Result<ReloadReport> {
        let _guard = self.reload_lock.lock().await;
        let started = Instant::now();

        let corpus_config = self.config.corpus.clone();
        let entries = tokio::task::spawn_blocking(move || corpus::load_corpus(&corpus_config))
            .await
            .context("corpus loader panicked")??;

        let chunker = self.config.chunking.chunker();
        let prepared = PreparedCorpus::new(entries, &chunker)?;

        let provider = Arc::clone(self.service.provider());
        let model_id = provider.model_id();
        let dims = provider.dims();

        let mut cache_failed = false;
        let cache = match &self.config.cache.path {
            Some(path) => match IndexCache::open(path).await {
                Ok(cache) => Some(cache),
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %format!("{:#}", e),
                        "index cache unavailable; embedding without it"
                    );
                    cache_failed = true;
                    None
                }
            },
            None => None,
        };

        let cached = match &cache {
            Some(cache) if !options.rebuild => match cache.load(&prepared, &model_id, dims).await {
                Ok(vectors) => vectors,
                Err(e) => {
                    tracing::warn!(
                        error = %format!("{:#}", e),
                        "failed to read index cache; embedding corpus"
                    );
                    cache_failed = true;
                    None
                }
            },
            _ => None,
        };

        let (generation, status) = match cached {
            Some(vectors) => (
                prepared.with_embeddings(model_id, dims, vectors)?,
                CacheStatus::Hit,
            ),
            None => {
                tracing::info!(
                    model = %model_id,
                    paragraphs = prepared.chunks().paragraph.len(),
                    sentences = prepared.chunks().sentence.len(),
                    journals = prepared.chunks().journal.len(),
                    "embedding corpus"
                );
                let generation = prepared
                    .embed(provider.as_ref(), self.config.embedding.batch_size)
                    .await?;
                if let Some(cache) = &cache {
                    if let Err(e) = cache.store(&generation).await {
                        tracing::warn!(
                            error = %format!("{:#}", e),
                            "failed to write index cache; publishing uncached generation"
                        );
                        cache_failed = true;
                    }
                }
                let status = if cache_failed {
                    CacheStatus::Failed
                } else if cache.is_none() {
                    CacheStatus::Disabled
                } else if options.rebuild {
                    CacheStatus::Rebuilt
                } else {
                    CacheStatus::Miss
                };
                (generation, status)
            }
        };

        if let Some(cache) = cache {
            cache.close().await;
        }

        let published = self.service.publish(generation)?;
        let report = ReloadReport {
            generation: published.summary(),
            cache: status,
            elapsed_ms: started.elapsed().as_millis(),
        };

        tracing::info!(
            generation = %report.generation.id,
            entries = report.generation.entries,
            cache = ?report.cache,
            elapsed_ms = report.elapsed_ms as u64,
            "reload complete"
        );
        Ok(report)
    }
}
