//! Corpus loading.
//!
//! Reads the configured corpus location and produces dated
//! [`JournalEntry`] records ordered by `(date, id)`. Two layouts are
//! understood:
//!
//! - **markdown**: a directory tree of `.md` files, one entry per file,
//!   dated by the first `YYYY-MM-DD` in the file name ([`markdown`]).
//! - **json**: a single file holding an array of `{date, text}` objects
//!   ([`json`]).
//!
//! Loading is blocking file I/O; async callers run it on
//! `tokio::task::spawn_blocking`.
//!
//! # Errors
//!
//! A missing or unreadable location is [`SearchError::CorpusUnavailable`].
//! An entry without a date or text is [`SearchError::CorpusFormat`] unless
//! `corpus.skip_invalid` is set, in which case it is logged and skipped.

pub mod json;
pub mod markdown;

use journal_search_core::{JournalEntry, Result, SearchError};
use std::path::Path;

use crate::config::{CorpusConfig, CorpusFormat};

/// Load every entry under `config.path`.
pub fn load_corpus(config: &CorpusConfig) -> Result<Vec<JournalEntry>> {
    let path = &config.path;
    let metadata = std::fs::metadata(path).map_err(|e| {
        SearchError::CorpusUnavailable(format!("{}: {}", path.display(), e))
    })?;

    let format = resolve_format(config.format, path, metadata.is_dir());
    let mut entries = match format {
        CorpusFormat::Json => {
            if metadata.is_dir() {
                return Err(SearchError::CorpusUnavailable(format!(
                    "{} is a directory, expected a JSON file",
                    path.display()
                )));
            }
            json::load_json(path, config.skip_invalid)?
        }
        _ => {
            if !metadata.is_dir() {
                return Err(SearchError::CorpusUnavailable(format!(
                    "{} is not a directory",
                    path.display()
                )));
            }
            markdown::load_markdown(config)?
        }
    };

    entries.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));

    tracing::info!(
        path = %path.display(),
        format = ?format,
        entries = entries.len(),
        "loaded corpus"
    );
    Ok(entries)
}

fn resolve_format(format: CorpusFormat, path: &Path, is_dir: bool) -> CorpusFormat {
    match format {
        CorpusFormat::Auto => {
            let is_json = path
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case("json"))
                .unwrap_or(false);
            if !is_dir && is_json {
                CorpusFormat::Json
            } else {
                CorpusFormat::Markdown
            }
        }
        explicit => explicit,
    }
}

/// Report an invalid entry: skip it (with a warning) or fail the load.
pub(crate) fn reject(skip_invalid: bool, message: String) -> Result<()> {
    if skip_invalid {
        tracing::warn!("skipping corpus entry: {}", message);
        Ok(())
    } else {
        Err(SearchError::CorpusFormat(message))
    }
}
