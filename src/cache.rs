//! On-disk cache of chunk embeddings.
//!
//! Holds the vectors of the most recently built generation in SQLite so a
//! restart over an unchanged corpus skips re-embedding. The cache is keyed
//! by the corpus fingerprint plus the embedding model id; either changing
//! makes the cache stale.
//!
//! Chunks themselves are not trusted from disk. On a lookup they are
//! re-derived from the freshly loaded entries and every cached row must
//! match the derived chunk's id and content hash, in order.

use anyhow::Result;
use journal_search_core::embedding::{blob_to_vec, vec_to_blob};
use journal_search_core::generation::{EmbeddingSets, Generation, PreparedCorpus};
use journal_search_core::Granularity;
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::{db, migrate};

pub struct IndexCache {
    pool: SqlitePool,
    path: PathBuf,
}

struct CachedRow {
    chunk_id: String,
    hash: String,
    embedding: Vec<u8>,
}

impl IndexCache {
    /// Open the cache file, creating the schema if needed.
    pub async fn open(path: &Path) -> Result<Self> {
        let pool = db::connect(path).await?;
        migrate::run_migrations(&pool).await?;
        Ok(Self {
            pool,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Cached vectors for `prepared`, or `None` when the cache is empty or
    /// was built from a different corpus or model.
    pub async fn load(
        &self,
        prepared: &PreparedCorpus,
        model_id: &str,
        dims: usize,
    ) -> Result<Option<EmbeddingSets>> {
        let meta = sqlx::query("SELECT fingerprint, model, dims FROM cache_meta WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?;

        let Some(meta) = meta else {
            tracing::debug!(cache = %self.path.display(), "index cache is empty");
            return Ok(None);
        };

        let fingerprint: String = meta.get("fingerprint");
        let model: String = meta.get("model");
        let cached_dims: i64 = meta.get("dims");

        if fingerprint != prepared.fingerprint() {
            tracing::info!("index cache is stale: corpus changed");
            return Ok(None);
        }
        if model != model_id || cached_dims != dims as i64 {
            tracing::info!(cached = %model, current = %model_id, "index cache is stale: model changed");
            return Ok(None);
        }

        let rows = sqlx::query(
            "SELECT granularity, chunk_id, hash, embedding FROM chunk_vectors ORDER BY granularity, ordinal",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut by_granularity: HashMap<String, Vec<CachedRow>> = HashMap::new();
        for row in rows {
            by_granularity
                .entry(row.get("granularity"))
                .or_default()
                .push(CachedRow {
                    chunk_id: row.get("chunk_id"),
                    hash: row.get("hash"),
                    embedding: row.get("embedding"),
                });
        }

        let mut vectors = EmbeddingSets::default();
        for g in Granularity::ALL {
            let chunks = prepared.chunks().get(g);
            let cached = by_granularity.remove(g.as_str()).unwrap_or_default();
            if cached.len() != chunks.len() {
                tracing::warn!(granularity = %g, "index cache is stale: chunk count differs");
                return Ok(None);
            }

            let mut set = Vec::with_capacity(cached.len());
            for (row, chunk) in cached.into_iter().zip(chunks) {
                if row.chunk_id != chunk.id || row.hash != chunk.hash {
                    tracing::warn!(chunk = %chunk.id, "index cache is stale: chunk differs");
                    return Ok(None);
                }
                let vector = blob_to_vec(&row.embedding);
                if vector.len() != dims {
                    tracing::warn!(chunk = %chunk.id, "index cache is corrupt: wrong vector size");
                    return Ok(None);
                }
                set.push(vector);
            }
            *vectors.get_mut(g) = set;
        }

        Ok(Some(vectors))
    }

    /// Replace the cache contents with `generation`'s vectors.
    pub async fn store(&self, generation: &Generation) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM chunk_vectors")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM cache_meta").execute(&mut *tx).await?;

        sqlx::query(
            "INSERT INTO cache_meta (id, fingerprint, model, dims, built_at) VALUES (1, ?, ?, ?, ?)",
        )
        .bind(generation.fingerprint())
        .bind(generation.model_id())
        .bind(generation.dims() as i64)
        .bind(generation.built_at().to_rfc3339())
        .execute(&mut *tx)
        .await?;

        for g in Granularity::ALL {
            for (ordinal, (chunk, embedding)) in generation.index(g).iter().enumerate() {
                sqlx::query(
                    "INSERT INTO chunk_vectors (granularity, ordinal, chunk_id, hash, embedding) VALUES (?, ?, ?, ?, ?)",
                )
                .bind(g.as_str())
                .bind(ordinal as i64)
                .bind(&chunk.id)
                .bind(&chunk.hash)
                .bind(vec_to_blob(embedding))
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        tracing::debug!(cache = %self.path.display(), "stored index cache");
        Ok(())
    }

    /// Remove every cached vector.
    pub async fn clear(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM chunk_vectors")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM cache_meta").execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}
