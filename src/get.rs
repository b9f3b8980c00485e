//! Entry retrieval by id.
//!
//! Loads the corpus and returns one entry together with its chunks, so the
//! chunker's output for a real entry can be inspected without embedding
//! anything. Used by the `jsearch get` command.

use anyhow::{bail, Result};
use journal_search_core::{Granularity, JournalEntry};
use serde::Serialize;

use crate::config::Config;
use crate::corpus;

#[derive(Debug, Clone, Serialize)]
pub struct EntryResponse {
    pub id: String,
    pub date: String,
    pub text: String,
    pub chunks: Vec<ChunkResponse>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChunkResponse {
    pub id: String,
    pub granularity: Granularity,
    pub index: usize,
    pub offset: usize,
    pub text: String,
}

/// Look up `id` and chunk it at `granularities`.
pub fn get_entry(
    config: &Config,
    id: &str,
    granularities: &[Granularity],
) -> Result<EntryResponse> {
    let entries = corpus::load_corpus(&config.corpus)?;
    let Some(entry) = entries.into_iter().find(|e| e.id == id) else {
        bail!("entry not found: {}", id);
    };
    Ok(describe(config, entry, granularities))
}

fn describe(config: &Config, entry: JournalEntry, granularities: &[Granularity]) -> EntryResponse {
    let chunker = config.chunking.chunker();
    let chunks = granularities
        .iter()
        .flat_map(|&g| chunker.chunk(&entry, g))
        .map(|c| ChunkResponse {
            id: c.id,
            granularity: c.granularity,
            index: c.index,
            offset: c.offset,
            text: c.text,
        })
        .collect();

    EntryResponse {
        id: entry.id,
        date: entry.date.to_string(),
        text: entry.text,
        chunks,
    }
}

/// CLI entry point: print the entry and its chunks to stdout.
pub async fn run_get(config: &Config, id: &str, granularity: Option<&str>) -> Result<()> {
    let granularities = match granularity {
        Some(g) => vec![g.parse::<Granularity>()?],
        None => vec![Granularity::Paragraph, Granularity::Sentence],
    };

    let config = config.clone();
    let id = id.to_string();
    let entry =
        tokio::task::spawn_blocking(move || get_entry(&config, &id, &granularities)).await??;

    println!("--- Entry ---");
    println!("id:     {}", entry.id);
    println!("date:   {}", entry.date);
    println!();

    println!("--- Text ---");
    println!("{}", entry.text);
    println!();

    println!("--- Chunks ({}) ---", entry.chunks.len());
    for chunk in &entry.chunks {
        println!("[{} {}] {}", chunk.granularity, chunk.index, chunk.id);
        println!("{}", chunk.text);
        println!();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_get_entry_chunks() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("2024-01-01.md"),
            "I went for a walk. It rained later.\n\nTea.",
        )
        .unwrap();
        let config = parse_config(&format!("[corpus]\npath = {:?}\n", tmp.path())).unwrap();

        let entry = get_entry(&config, "2024-01-01.md", &[Granularity::Sentence]).unwrap();
        assert_eq!(entry.date, "2024-01-01");
        let texts: Vec<&str> = entry.chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["I went for a walk.", "It rained later.", "Tea."]);

        let err = get_entry(&config, "nope.md", &[Granularity::Journal]).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
