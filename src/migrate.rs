use anyhow::Result;
use sqlx::SqlitePool;

/// Create the index cache schema. Idempotent.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    // Single-row table describing the cached generation
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS cache_meta (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            fingerprint TEXT NOT NULL,
            model TEXT NOT NULL,
            dims INTEGER NOT NULL,
            built_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // One row per chunk, per granularity, in index order
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chunk_vectors (
            granularity TEXT NOT NULL,
            ordinal INTEGER NOT NULL,
            chunk_id TEXT NOT NULL,
            hash TEXT NOT NULL,
            embedding BLOB NOT NULL,
            PRIMARY KEY (granularity, ordinal)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
