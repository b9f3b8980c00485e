//! Index generations.
//!
//! A [`Generation`] is one complete, self-consistent snapshot: the loaded
//! entries plus the paragraph, sentence, and journal indexes built from
//! exactly those entries with one embedding model. Generations are built
//! entirely off to the side and then handed to
//! [`SearchService::publish`](crate::search::SearchService::publish), which
//! swaps them in as a single `Arc`.
//!
//! Building is split in two so the caller can substitute cached vectors:
//!
//! 1. [`PreparedCorpus::new`] validates entries, chunks them at all three
//!    granularities, and computes the corpus fingerprint.
//! 2. Either [`PreparedCorpus::embed`] (run the provider) or
//!    [`PreparedCorpus::with_embeddings`] (precomputed vectors) produces
//!    the [`Generation`].

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use uuid::Uuid;

use crate::chunk::Chunker;
use crate::embedding::{embed_chunks, EmbeddingProvider};
use crate::error::{Result, SearchError};
use crate::index::GranularityIndex;
use crate::models::{Chunk, Granularity, JournalEntry};

/// One value per granularity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PerGranularity<T> {
    pub paragraph: T,
    pub sentence: T,
    pub journal: T,
}

impl<T> PerGranularity<T> {
    pub fn get(&self, granularity: Granularity) -> &T {
        match granularity {
            Granularity::Paragraph => &self.paragraph,
            Granularity::Sentence => &self.sentence,
            Granularity::Journal => &self.journal,
        }
    }

    pub fn get_mut(&mut self, granularity: Granularity) -> &mut T {
        match granularity {
            Granularity::Paragraph => &mut self.paragraph,
            Granularity::Sentence => &mut self.sentence,
            Granularity::Journal => &mut self.journal,
        }
    }
}

/// Chunk sets for all three granularities.
pub type ChunkSets = PerGranularity<Vec<Chunk>>;

/// Embedding sets aligned with a [`ChunkSets`].
pub type EmbeddingSets = PerGranularity<Vec<Vec<f32>>>;

/// Entries that have been validated and chunked but not yet embedded.
#[derive(Debug, Clone)]
pub struct PreparedCorpus {
    entries: Vec<JournalEntry>,
    chunks: ChunkSets,
    fingerprint: String,
}

impl PreparedCorpus {
    /// Validate and chunk `entries`.
    ///
    /// Entry ids must be unique; duplicates fail with
    /// [`SearchError::CorpusFormat`].
    pub fn new(entries: Vec<JournalEntry>, chunker: &Chunker) -> Result<Self> {
        let mut seen = HashSet::new();
        for entry in &entries {
            if !seen.insert(entry.id.as_str()) {
                return Err(SearchError::CorpusFormat(format!(
                    "duplicate entry id: {}",
                    entry.id
                )));
            }
        }

        let chunks = ChunkSets {
            paragraph: chunker.chunk_all(&entries, Granularity::Paragraph),
            sentence: chunker.chunk_all(&entries, Granularity::Sentence),
            journal: chunker.chunk_all(&entries, Granularity::Journal),
        };
        let fingerprint = corpus_fingerprint(&entries, chunker);

        Ok(Self {
            entries,
            chunks,
            fingerprint,
        })
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    pub fn chunks(&self) -> &ChunkSets {
        &self.chunks
    }

    /// Content fingerprint of the entries and chunker configuration.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Embed every chunk with `provider` and assemble the generation.
    pub async fn embed(
        self,
        provider: &dyn EmbeddingProvider,
        batch_size: usize,
    ) -> Result<Generation> {
        let mut vectors = EmbeddingSets::default();
        for g in Granularity::ALL {
            *vectors.get_mut(g) = embed_chunks(provider, self.chunks.get(g), batch_size).await?;
        }
        self.with_embeddings(provider.model_id(), provider.dims(), vectors)
    }

    /// Assemble the generation from precomputed vectors.
    pub fn with_embeddings(
        self,
        model_id: String,
        dims: usize,
        vectors: EmbeddingSets,
    ) -> Result<Generation> {
        let PerGranularity {
            paragraph,
            sentence,
            journal,
        } = self.chunks;

        let indexes = PerGranularity {
            paragraph: GranularityIndex::build(
                Granularity::Paragraph,
                dims,
                paragraph,
                vectors.paragraph,
            )?,
            sentence: GranularityIndex::build(
                Granularity::Sentence,
                dims,
                sentence,
                vectors.sentence,
            )?,
            journal: GranularityIndex::build(Granularity::Journal, dims, journal, vectors.journal)?,
        };

        let generation = Generation {
            id: Uuid::new_v4(),
            fingerprint: self.fingerprint,
            model_id,
            dims,
            built_at: Utc::now(),
            entries: self.entries,
            indexes,
        };

        tracing::debug!(
            generation = %generation.id,
            entries = generation.entries.len(),
            paragraphs = generation.indexes.paragraph.len(),
            sentences = generation.indexes.sentence.len(),
            journals = generation.indexes.journal.len(),
            "assembled index generation"
        );

        Ok(generation)
    }
}

/// Chunk, embed, and index `entries` in one step.
pub async fn build_generation(
    entries: Vec<JournalEntry>,
    chunker: &Chunker,
    provider: &dyn EmbeddingProvider,
    batch_size: usize,
) -> Result<Generation> {
    PreparedCorpus::new(entries, chunker)?
        .embed(provider, batch_size)
        .await
}

/// One immutable corpus + index snapshot.
pub struct Generation {
    id: Uuid,
    fingerprint: String,
    model_id: String,
    dims: usize,
    built_at: DateTime<Utc>,
    entries: Vec<JournalEntry>,
    indexes: PerGranularity<GranularityIndex>,
}

impl Generation {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// The embedding model configuration every index was built with.
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    pub fn entry(&self, id: &str) -> Option<&JournalEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn index(&self, granularity: Granularity) -> &GranularityIndex {
        self.indexes.get(granularity)
    }

    pub fn summary(&self) -> GenerationSummary {
        GenerationSummary {
            id: self.id.to_string(),
            fingerprint: self.fingerprint.clone(),
            model: self.model_id.clone(),
            built_at: self.built_at.to_rfc3339(),
            entries: self.entries.len(),
            paragraphs: self.indexes.paragraph.len(),
            sentences: self.indexes.sentence.len(),
            journals: self.indexes.journal.len(),
        }
    }
}

impl std::fmt::Debug for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generation")
            .field("id", &self.id)
            .field("model_id", &self.model_id)
            .field("entries", &self.entries.len())
            .finish()
    }
}

/// Counts and identity of a generation, for logs and `/health`.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationSummary {
    pub id: String,
    pub fingerprint: String,
    pub model: String,
    pub built_at: String,
    pub entries: usize,
    pub paragraphs: usize,
    pub sentences: usize,
    pub journals: usize,
}

/// SHA-256 over every entry's id, date, and text, plus the chunker's
/// abbreviation list. Any change that could alter chunks changes it.
pub fn corpus_fingerprint(entries: &[JournalEntry], chunker: &Chunker) -> String {
    let mut hasher = Sha256::new();
    for entry in entries {
        let date = entry.date.to_string();
        for field in [entry.id.as_str(), date.as_str(), entry.text.as_str()] {
            hasher.update((field.len() as u64).to_le_bytes());
            hasher.update(field.as_bytes());
        }
    }
    hasher.update(b"abbreviations");
    for abbreviation in chunker.abbreviations() {
        hasher.update((abbreviation.len() as u64).to_le_bytes());
        hasher.update(abbreviation.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbedder;
    use chrono::NaiveDate;

    fn entries() -> Vec<JournalEntry> {
        vec![
            JournalEntry::new(
                "2024-01-01",
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                "I went for a walk. It rained later.\n\nThen tea.",
            ),
            JournalEntry::new("2024-01-02", NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), ""),
        ]
    }

    #[tokio::test]
    async fn test_build_generation_counts() {
        let provider = HashEmbedder::new(64);
        let generation = build_generation(entries(), &Chunker::new(), &provider, 8)
            .await
            .unwrap();

        let summary = generation.summary();
        assert_eq!(summary.entries, 2);
        assert_eq!(summary.paragraphs, 2);
        assert_eq!(summary.sentences, 3);
        assert_eq!(summary.journals, 2);
        assert_eq!(generation.model_id(), "hash-v1/64");
        // The empty entry's journal chunk is stored but never searchable.
        assert_eq!(generation.index(Granularity::Journal).eligible_len(), 1);
        assert!(generation.entry("2024-01-02").is_some());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut e = entries();
        e[1].id = e[0].id.clone();
        let err = PreparedCorpus::new(e, &Chunker::new()).unwrap_err();
        assert!(matches!(err, SearchError::CorpusFormat(_)));
    }

    #[test]
    fn test_fingerprint_tracks_content_and_chunker() {
        let chunker = Chunker::new();
        let a = corpus_fingerprint(&entries(), &chunker);
        assert_eq!(a, corpus_fingerprint(&entries(), &chunker));

        let mut changed = entries();
        changed[1].text = "new".to_string();
        assert_ne!(a, corpus_fingerprint(&changed, &chunker));

        let other = Chunker::with_abbreviations(["mr"]);
        assert_ne!(a, corpus_fingerprint(&entries(), &other));
    }

    #[test]
    fn test_with_embeddings_rejects_mismatched_vectors() {
        let prepared = PreparedCorpus::new(entries(), &Chunker::new()).unwrap();
        let mut vectors = EmbeddingSets::default();
        for g in Granularity::ALL {
            *vectors.get_mut(g) = vec![vec![1.0, 0.0]; prepared.chunks().get(g).len()];
        }
        vectors.sentence[0] = vec![1.0];
        let err = prepared
            .with_embeddings("m/2".to_string(), 2, vectors)
            .unwrap_err();
        assert!(matches!(err, SearchError::ModelMismatch(_)));
    }
}
