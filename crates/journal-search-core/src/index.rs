//! Per-granularity similarity index.
//!
//! A [`GranularityIndex`] owns every chunk of one granularity together with
//! its embedding and precomputed L2 norm. Search is an exhaustive cosine
//! scan, which is also the reference ranking any faster structure would
//! have to reproduce.
//!
//! # Ranking
//!
//! 1. Cosine similarity, descending.
//! 2. Chunk date, most recent first.
//! 3. Position in the index (corpus order), ascending.
//!
//! The order is total, so identical inputs always produce identical
//! result lists. Chunks whose embedding has zero or non-finite norm are
//! kept for bookkeeping but never returned.
//!
//! A [`DateRange`] is applied during the scan, before top-k selection, so a
//! bounded search still returns up to `k` in-range chunks.

use std::cmp::Ordering;

use crate::embedding::{dot, l2_norm};
use crate::error::{Result, SearchError};
use crate::models::{Chunk, DateRange, Granularity};

struct IndexedChunk {
    chunk: Chunk,
    embedding: Vec<f32>,
    norm: f32,
}

impl IndexedChunk {
    fn eligible(&self) -> bool {
        self.norm.is_finite() && self.norm > 0.0
    }
}

/// A chunk and its similarity to the query.
#[derive(Debug, Clone, Copy)]
pub struct ScoredChunk<'a> {
    pub chunk: &'a Chunk,
    pub similarity: f32,
}

/// Immutable chunk + embedding store for one granularity.
pub struct GranularityIndex {
    granularity: Granularity,
    dims: usize,
    items: Vec<IndexedChunk>,
}

impl GranularityIndex {
    /// Assemble an index from chunks and their embeddings (same order).
    ///
    /// Fails with [`SearchError::ModelMismatch`] if any embedding does not
    /// have `dims` components, and with [`SearchError::InvalidGranularity`]
    /// if a chunk belongs to another granularity.
    pub fn build(
        granularity: Granularity,
        dims: usize,
        chunks: Vec<Chunk>,
        embeddings: Vec<Vec<f32>>,
    ) -> Result<Self> {
        if chunks.len() != embeddings.len() {
            return Err(SearchError::Embedding(format!(
                "{} chunks but {} embeddings for the {} index",
                chunks.len(),
                embeddings.len(),
                granularity
            )));
        }

        let mut items = Vec::with_capacity(chunks.len());
        for (chunk, embedding) in chunks.into_iter().zip(embeddings) {
            if chunk.granularity != granularity {
                return Err(SearchError::InvalidGranularity(format!(
                    "chunk {} is a {} chunk, not {}",
                    chunk.id, chunk.granularity, granularity
                )));
            }
            if embedding.len() != dims {
                return Err(SearchError::ModelMismatch(format!(
                    "chunk {} has a {}-dimensional embedding, index expects {}",
                    chunk.id,
                    embedding.len(),
                    dims
                )));
            }
            let norm = l2_norm(&embedding);
            items.push(IndexedChunk {
                chunk,
                embedding,
                norm,
            });
        }

        Ok(Self {
            granularity,
            dims,
            items,
        })
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Number of chunks stored, eligible or not.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of chunks a search can return.
    pub fn eligible_len(&self) -> usize {
        self.items.iter().filter(|i| i.eligible()).count()
    }

    /// Stored chunks with their embeddings, in index order.
    pub fn iter(&self) -> impl Iterator<Item = (&Chunk, &[f32])> {
        self.items
            .iter()
            .map(|i| (&i.chunk, i.embedding.as_slice()))
    }

    /// Return up to `k` chunks ranked by cosine similarity to `query`.
    ///
    /// An empty index answers with an empty list. A query whose length
    /// differs from the index dimensionality fails with
    /// [`SearchError::ModelMismatch`]; a zero-norm query fails with
    /// [`SearchError::Embedding`].
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk<'_>>> {
        self.search_within(query, k, &DateRange::ALL)
    }

    /// Like [`search`](Self::search), restricted to chunks dated inside
    /// `range`.
    pub fn search_within(
        &self,
        query: &[f32],
        k: usize,
        range: &DateRange,
    ) -> Result<Vec<ScoredChunk<'_>>> {
        if self.items.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dims {
            return Err(SearchError::ModelMismatch(format!(
                "query has {} dimensions, {} index has {}",
                query.len(),
                self.granularity,
                self.dims
            )));
        }
        let query_norm = l2_norm(query);
        if !query_norm.is_finite() || query_norm == 0.0 {
            return Err(SearchError::Embedding(
                "query embedding has zero norm".to_string(),
            ));
        }

        let mut scored: Vec<(usize, f32)> = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.eligible())
            .filter(|(_, item)| range.contains(item.chunk.date))
            .filter_map(|(pos, item)| {
                let sim = dot(query, &item.embedding) / (query_norm * item.norm);
                sim.is_finite().then(|| (pos, sim.clamp(-1.0, 1.0)))
            })
            .collect();

        if scored.len() > k {
            scored.select_nth_unstable_by(k - 1, |a, b| self.rank(a, b));
            scored.truncate(k);
        }
        scored.sort_by(|a, b| self.rank(a, b));

        Ok(scored
            .into_iter()
            .map(|(pos, similarity)| ScoredChunk {
                chunk: &self.items[pos].chunk,
                similarity,
            })
            .collect())
    }

    fn rank(&self, a: &(usize, f32), b: &(usize, f32)) -> Ordering {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.items[b.0].chunk.date.cmp(&self.items[a.0].chunk.date))
            .then_with(|| a.0.cmp(&b.0))
    }
}

impl std::fmt::Debug for GranularityIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GranularityIndex")
            .field("granularity", &self.granularity)
            .field("dims", &self.dims)
            .field("len", &self.items.len())
            .finish()
    }
}
