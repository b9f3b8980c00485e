//! Offline, deterministic feature-hashing embedder.
//!
//! Each text is reduced to lowercase word features plus character
//! trigrams of every word (padded with `^` and `$`), and each feature is
//! hashed into one of `dims` buckets with a hash-derived sign. The result
//! is L2-normalized. Texts sharing words or word stems ("rain" /
//! "rained") land close together; it is a lexical model, not a semantic
//! one, but it needs no network or model download and is stable across
//! platforms and releases.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::EmbeddingProvider;
use crate::error::{Result, SearchError};

/// Default dimensionality for [`HashEmbedder`].
pub const DEFAULT_HASH_DIMS: usize = 384;

#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dims: usize,
}

impl HashEmbedder {
    pub fn new(dims: usize) -> Self {
        Self { dims: dims.max(1) }
    }

    /// Embed one text synchronously.
    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dims];

        for token in text.split_whitespace() {
            let lower = token.to_lowercase();
            let trimmed = lower.trim_matches(|c: char| !c.is_alphanumeric());
            // Punctuation-only tokens still contribute so no non-empty text maps to zero.
            let word = if trimmed.is_empty() { lower.as_str() } else { trimmed };

            self.add_feature(&mut v, "w", word);

            let padded: Vec<char> = std::iter::once('^')
                .chain(word.chars())
                .chain(std::iter::once('$'))
                .collect();
            for tri in padded.windows(3) {
                let tri: String = tri.iter().collect();
                self.add_feature(&mut v, "t", &tri);
            }
        }

        let norm = super::l2_norm(&v);
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        }
        v
    }

    fn add_feature(&self, v: &mut [f32], kind: &str, feature: &str) {
        let mut hasher = Sha256::new();
        hasher.update(kind.as_bytes());
        hasher.update([0u8]);
        hasher.update(feature.as_bytes());
        let digest = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        let h = u64::from_le_bytes(bytes);

        let bucket = (h % self.dims as u64) as usize;
        let sign = if h >> 63 == 0 { 1.0 } else { -1.0 };
        v[bucket] += sign;
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_DIMS)
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    fn model_name(&self) -> &str {
        "hash-v1"
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts
            .iter()
            .map(|t| {
                if t.trim().is_empty() {
                    Err(SearchError::Embedding("cannot embed empty text".to_string()))
                } else {
                    Ok(self.embed_one(t))
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{cosine_similarity, l2_norm};

    #[test]
    fn test_deterministic_and_normalized() {
        let e = HashEmbedder::default();
        let a = e.embed_one("It rained later.");
        let b = e.embed_one("It rained later.");
        assert_eq!(a, b);
        assert_eq!(a.len(), DEFAULT_HASH_DIMS);
        assert!((l2_norm(&a) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_shared_stem_is_closer() {
        let e = HashEmbedder::default();
        let q = e.embed_one("rain");
        let rained = cosine_similarity(&q, &e.embed_one("It rained later.")).unwrap();
        let walk = cosine_similarity(&q, &e.embed_one("I went for a walk.")).unwrap();
        assert!(rained > walk, "rained={} walk={}", rained, walk);
    }

    #[test]
    fn test_case_and_punctuation_insensitive() {
        let e = HashEmbedder::default();
        assert_eq!(e.embed_one("Rain!"), e.embed_one("rain"));
    }

    #[test]
    fn test_punctuation_only_is_nonzero() {
        let e = HashEmbedder::new(16);
        assert!(l2_norm(&e.embed_one("?!")) > 0.0);
    }

    #[tokio::test]
    async fn test_embed_batch_rejects_empty() {
        let e = HashEmbedder::new(8);
        assert!(e.embed_batch(&["  ".to_string()]).await.is_err());
        assert_eq!(e.model_id(), "hash-v1/8");
    }
}
