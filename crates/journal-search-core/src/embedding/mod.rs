//! Embedding provider trait and vector utilities.
//!
//! Defines the [`EmbeddingProvider`] trait that all embedding backends
//! implement, the helpers that drive a provider over queries and chunk
//! sets, and pure functions for vector serialization and similarity.
//!
//! The offline [`HashEmbedder`] lives here because it needs no I/O.
//! Remote and local model providers (OpenAI, Ollama, fastembed) live in
//! the `journal-search` app crate.

mod hash;

pub use hash::HashEmbedder;

use async_trait::async_trait;

use crate::error::{Result, SearchError};
use crate::models::Chunk;

/// Trait for embedding providers.
///
/// Implementations must be safe to call from many tasks at once. Backends
/// whose model cannot run concurrent inference serialize internally.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"text-embedding-3-small"`).
    fn model_name(&self) -> &str;

    /// Returns the embedding vector dimensionality (e.g. `1536`).
    fn dims(&self) -> usize;

    /// Identity of the full model configuration. Embeddings are only
    /// comparable when this value matches.
    fn model_id(&self) -> String {
        format!("{}/{}", self.model_name(), self.dims())
    }

    /// Longest input, in characters, the backend embeds before cutting the
    /// text short. `None` means inputs are never truncated.
    fn max_input_chars(&self) -> Option<usize> {
        None
    }

    /// Embed a batch of non-empty texts, returning one vector per text in
    /// input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Embed a single query text.
///
/// The text is trimmed first; empty or whitespace-only input fails with
/// [`SearchError::Embedding`] without reaching the backend.
pub async fn embed_query(provider: &dyn EmbeddingProvider, text: &str) -> Result<Vec<f32>> {
    let normalized = text.trim();
    if normalized.is_empty() {
        return Err(SearchError::Embedding("cannot embed empty text".to_string()));
    }

    let mut vectors = provider.embed_batch(&[normalized.to_string()]).await?;
    if vectors.len() != 1 {
        return Err(SearchError::Embedding(format!(
            "provider returned {} vectors for 1 query",
            vectors.len()
        )));
    }
    let vector = vectors.remove(0);
    check_dims(provider, &vector)?;
    Ok(vector)
}

/// Embed every chunk in `chunks`, `batch_size` texts per backend call.
///
/// Chunks whose text is empty or whitespace-only (the empty-entry journal
/// chunk) get an all-zero vector without a backend call; zero-norm vectors
/// are never returned by an index search. Chunks longer than the
/// provider's input limit are logged by id before the backend truncates
/// them.
pub async fn embed_chunks(
    provider: &dyn EmbeddingProvider,
    chunks: &[Chunk],
    batch_size: usize,
) -> Result<Vec<Vec<f32>>> {
    if let Some(max) = provider.max_input_chars() {
        let oversized = oversized_chunks(chunks, max);
        for (id, chars) in &oversized {
            tracing::debug!(
                chunk = %id,
                chars,
                max,
                "chunk text exceeds model input limit; truncating"
            );
        }
        if !oversized.is_empty() {
            tracing::info!(
                count = oversized.len(),
                max,
                model = provider.model_name(),
                "chunks truncated to the model input limit"
            );
        }
    }

    let dims = provider.dims();
    let mut vectors = vec![Vec::new(); chunks.len()];
    let mut pending = Vec::with_capacity(chunks.len());
    for (i, c) in chunks.iter().enumerate() {
        if c.text.trim().is_empty() {
            vectors[i] = vec![0.0; dims];
        } else {
            pending.push(i);
        }
    }

    for batch in pending.chunks(batch_size.max(1)) {
        let texts: Vec<String> = batch.iter().map(|&i| chunks[i].text.clone()).collect();
        let embedded = provider.embed_batch(&texts).await?;
        if embedded.len() != batch.len() {
            return Err(SearchError::Embedding(format!(
                "provider returned {} vectors for {} texts",
                embedded.len(),
                batch.len()
            )));
        }
        for (&i, vector) in batch.iter().zip(embedded) {
            check_dims(provider, &vector)?;
            vectors[i] = vector;
        }
    }

    Ok(vectors)
}

/// Ids and character counts of chunks longer than `max_chars`.
fn oversized_chunks(chunks: &[Chunk], max_chars: usize) -> Vec<(&str, usize)> {
    chunks
        .iter()
        .filter_map(|c| {
            let chars = c.text.chars().count();
            (chars > max_chars).then(|| (c.id.as_str(), chars))
        })
        .collect()
}

fn check_dims(provider: &dyn EmbeddingProvider, vector: &[f32]) -> Result<()> {
    if vector.len() != provider.dims() {
        return Err(SearchError::ModelMismatch(format!(
            "model '{}' is configured for {} dimensions but returned {}",
            provider.model_name(),
            provider.dims(),
            vector.len()
        )));
    }
    Ok(())
}

/// Encode a float vector as a BLOB (little-endian f32 bytes).
///
/// # Example
///
/// ```rust
/// use journal_search_core::embedding::{vec_to_blob, blob_to_vec};
///
/// let v = vec![1.0f32, -2.5, 3.125];
/// let blob = vec_to_blob(&v);
/// assert_eq!(blob.len(), 12); // 3 × 4 bytes
/// assert_eq!(blob_to_vec(&blob), v);
/// ```
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Euclidean length of `v`.
pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Dot product of two equal-length vectors.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`, or `None` when the vectors differ in
/// length, are empty, or either has zero (or non-finite) norm.
///
/// ```text
///            a · b
/// cos(θ) = ─────────
///          ‖a‖ × ‖b‖
/// ```
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }
    let denom = l2_norm(a) * l2_norm(b);
    if !denom.is_finite() || denom < f32::EPSILON {
        return None;
    }
    Some((dot(a, b) / denom).clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Granularity, JournalEntry};
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts backend calls and returns `[len, 1.0]` per text.
    struct CountingProvider {
        calls: AtomicUsize,
        dims: usize,
    }

    #[async_trait]
    impl EmbeddingProvider for CountingProvider {
        fn model_name(&self) -> &str {
            "counting"
        }
        fn dims(&self) -> usize {
            self.dims
        }
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        }
    }

    fn counting(dims: usize) -> CountingProvider {
        CountingProvider {
            calls: AtomicUsize::new(0),
            dims,
        }
    }

    #[test]
    fn test_vec_blob_roundtrip() {
        let vec = vec![1.0f32, -2.5, 3.125, 0.0, -0.001];
        assert_eq!(blob_to_vec(&vec_to_blob(&vec)), vec);
    }

    #[test]
    fn test_cosine_identical() {
        let v = vec![1.0, 2.0, 3.0];
        let sim = cosine_similarity(&v, &v).unwrap();
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal_and_opposite() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap().abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]).unwrap() + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_degenerate() {
        assert_eq!(cosine_similarity(&[], &[]), None);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), None);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), None);
    }

    #[tokio::test]
    async fn test_embed_query_rejects_blank() {
        let provider = counting(2);
        let err = embed_query(&provider, "  \n ").await.unwrap_err();
        assert!(matches!(err, SearchError::Embedding(_)));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_embed_query_trims() {
        let provider = counting(2);
        let v = embed_query(&provider, "  rain ").await.unwrap();
        assert_eq!(v, vec![4.0, 1.0]);
    }

    #[tokio::test]
    async fn test_embed_query_dimension_mismatch() {
        let provider = counting(3);
        let err = embed_query(&provider, "rain").await.unwrap_err();
        assert!(matches!(err, SearchError::ModelMismatch(_)));
    }

    #[tokio::test]
    async fn test_embed_chunks_batches_and_skips_empty() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let entries = vec![
            JournalEntry::new("a", date, "one"),
            JournalEntry::new("b", date, ""),
            JournalEntry::new("c", date, "three"),
            JournalEntry::new("d", date, "four!"),
        ];
        let chunks = crate::chunk::Chunker::new().chunk_all(&entries, Granularity::Journal);
        let provider = counting(2);

        let vectors = embed_chunks(&provider, &chunks, 2).await.unwrap();
        assert_eq!(vectors.len(), 4);
        assert_eq!(vectors[0], vec![3.0, 1.0]);
        assert_eq!(vectors[1], vec![0.0, 0.0]);
        assert_eq!(vectors[3], vec![5.0, 1.0]);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_oversized_chunks_counted_in_chars() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let entries = vec![
            JournalEntry::new("short", date, "rain"),
            JournalEntry::new("accents", date, "ééééé"),
            JournalEntry::new("long", date, "a long walk by the river"),
        ];
        let chunks = crate::chunk::Chunker::new().chunk_all(&entries, Granularity::Journal);

        // Five two-byte characters stay within a five-character limit.
        let oversized = oversized_chunks(&chunks, 5);
        assert_eq!(oversized, vec![(chunks[2].id.as_str(), 24)]);
        assert!(oversized_chunks(&chunks, 100).is_empty());
    }

    #[tokio::test]
    async fn test_embed_chunks_passes_oversized_text_through() {
        struct Limited(CountingProvider);

        #[async_trait]
        impl EmbeddingProvider for Limited {
            fn model_name(&self) -> &str {
                "limited"
            }
            fn dims(&self) -> usize {
                2
            }
            fn max_input_chars(&self) -> Option<usize> {
                Some(3)
            }
            async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
                self.0.embed_batch(texts).await
            }
        }

        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let entries = vec![JournalEntry::new("a", date, "thunder")];
        let chunks = crate::chunk::Chunker::new().chunk_all(&entries, Granularity::Journal);
        let provider = Limited(counting(2));

        // Truncation belongs to the backend; the full text is handed over.
        let vectors = embed_chunks(&provider, &chunks, 8).await.unwrap();
        assert_eq!(vectors, vec![vec![7.0, 1.0]]);
        assert_eq!(provider.max_input_chars(), Some(3));
    }
}
