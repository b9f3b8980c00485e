use anyhow::{bail, Result};

use crate::cache::IndexCache;
use crate::config::Config;
use crate::reload::{CacheStatus, Engine, ReloadOptions};

/// Load the corpus and build all three indexes, refreshing the cache.
pub async fn run_index(config: &Config, rebuild: bool) -> Result<()> {
    let engine = Engine::new(config.clone())?;
    let report = engine.reload(ReloadOptions { rebuild }).await?;
    let summary = &report.generation;

    println!("index");
    println!("  entries: {}", summary.entries);
    println!("  paragraphs: {}", summary.paragraphs);
    println!("  sentences: {}", summary.sentences);
    println!("  journals: {}", summary.journals);
    println!("  model: {}", summary.model);
    println!("  cache: {}", cache_label(report.cache));
    println!("  elapsed: {}ms", report.elapsed_ms);

    Ok(())
}

/// Drop every cached vector. The next load re-embeds the corpus.
pub async fn run_clear(config: &Config) -> Result<()> {
    let Some(path) = &config.cache.path else {
        bail!("No index cache configured. Set [cache] path in config.");
    };

    let cache = IndexCache::open(path).await?;
    cache.clear().await?;
    println!("index cache cleared: {}", cache.path().display());
    cache.close().await;
    Ok(())
}

fn cache_label(status: CacheStatus) -> &'static str {
    match status {
        CacheStatus::Disabled => "disabled",
        CacheStatus::Hit => "hit",
        CacheStatus::Miss => "miss",
        CacheStatus::Rebuilt => "rebuilt",
        CacheStatus::Failed => "failed",
    }
}
