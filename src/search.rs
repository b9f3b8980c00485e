//! `jsearch search`: one-shot search from the command line.
//!
//! Builds an engine, loads the corpus (reusing the index cache when one is
//! configured), runs a single query, and prints ranked results.

use anyhow::Result;
use chrono::NaiveDate;
use journal_search_core::SearchResult;

use crate::config::Config;
use crate::reload::{Engine, ReloadOptions};

/// Run one query against a freshly loaded corpus, optionally limited to
/// entries dated between `since` and `until` (inclusive).
pub async fn search_once(
    config: &Config,
    query: &str,
    granularity: &str,
    limit: Option<usize>,
    since: Option<NaiveDate>,
    until: Option<NaiveDate>,
) -> Result<Vec<SearchResult>> {
    let engine = Engine::new(config.clone())?;
    engine.reload(ReloadOptions::default()).await?;
    Ok(engine
        .service()
        .search_between(query, granularity, limit, since, until)
        .await?)
}

/// CLI entry point: search and print to stdout.
pub async fn run_search(
    config: &Config,
    query: &str,
    granularity: &str,
    limit: Option<usize>,
    since: Option<NaiveDate>,
    until: Option<NaiveDate>,
) -> Result<()> {
    let results = search_once(config, query, granularity, limit, since, until).await?;

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (rank, result) in results.iter().enumerate() {
        println!(
            "{}. [{}] similarity: {:.1}%  {}",
            rank + 1,
            result.date,
            result.similarity * 100.0,
            result.chunk_id
        );
        for line in result.text.lines() {
            println!("    {}", line);
        }
        println!();
    }

    Ok(())
}
