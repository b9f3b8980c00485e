//! Markdown journal directories.
//!
//! Walks the corpus root, keeps files matching `include_globs` and not
//! matching `exclude_globs`, and turns each file into one entry:
//!
//! - **id**: path relative to the root, `/`-separated.
//! - **date**: the first valid `YYYY-MM-DD` in the file name
//!   (`2024-01-01.md`, `Journal 2024-01-01.md`).
//! - **text**: the body with YAML front matter removed and, by default,
//!   task lines (`- [ ] ...`) and heading lines dropped. Blank lines are
//!   kept so paragraph boundaries survive.

use chrono::NaiveDate;
use globset::{Glob, GlobSet, GlobSetBuilder};
use journal_search_core::{JournalEntry, Result, SearchError};
use regex::Regex;
use std::path::Path;
use walkdir::WalkDir;

use crate::config::CorpusConfig;

/// Always excluded, in addition to `exclude_globs`.
const DEFAULT_EXCLUDES: &[&str] = &["**/.git/**", "**/.obsidian/**", "**/.trash/**"];

/// What to strip from a markdown body.
#[derive(Debug, Clone, Copy)]
pub struct BodyOptions {
    pub strip_tasks: bool,
    pub strip_headings: bool,
}

pub fn load_markdown(config: &CorpusConfig) -> Result<Vec<JournalEntry>> {
    let root = &config.path;
    let include_set = build_globset(config.include_globs.iter().map(String::as_str))?;
    let exclude_set = build_globset(
        DEFAULT_EXCLUDES
            .iter()
            .copied()
            .chain(config.exclude_globs.iter().map(String::as_str)),
    )?;
    let date_pattern = date_pattern()?;
    let options = BodyOptions {
        strip_tasks: config.strip_tasks,
        strip_headings: config.strip_headings,
    };

    let mut entries = Vec::new();

    let walker = WalkDir::new(root).follow_links(config.follow_symlinks);
    for entry in walker {
        let entry = entry.map_err(|e| {
            SearchError::CorpusUnavailable(format!("{}: {}", root.display(), e))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
            continue;
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let date = match date_from_file_name(&date_pattern, &file_name) {
            Some(date) => date,
            None => {
                super::reject(
                    config.skip_invalid,
                    format!("{}: no YYYY-MM-DD date in file name", rel_str),
                )?;
                continue;
            }
        };

        let raw = match read_file(path) {
            Ok(raw) => raw,
            Err(e) => {
                super::reject(config.skip_invalid, format!("{}: {}", rel_str, e))?;
                continue;
            }
        };

        entries.push(JournalEntry::new(rel_str, date, extract_body(&raw, options)));
    }

    Ok(entries)
}

fn read_file(path: &Path) -> std::result::Result<String, String> {
    let bytes = std::fs::read(path).map_err(|e| e.to_string())?;
    String::from_utf8(bytes).map_err(|_| "file is not valid UTF-8".to_string())
}

fn build_globset<'a>(patterns: impl IntoIterator<Item = &'a str>) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .map_err(|e| SearchError::CorpusFormat(format!("invalid glob '{}': {}", pattern, e)))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| SearchError::CorpusFormat(format!("invalid glob set: {}", e)))
}

fn date_pattern() -> Result<Regex> {
    Regex::new(r"\d{4}-\d{2}-\d{2}")
        .map_err(|e| SearchError::CorpusFormat(format!("date pattern: {}", e)))
}

/// First calendar-valid `YYYY-MM-DD` in `file_name`.
pub fn date_from_file_name(pattern: &Regex, file_name: &str) -> Option<NaiveDate> {
    pattern
        .find_iter(file_name)
        .find_map(|m| NaiveDate::parse_from_str(m.as_str(), "%Y-%m-%d").ok())
}

/// Entry text from a raw markdown file.
pub fn extract_body(raw: &str, options: BodyOptions) -> String {
    let body = strip_front_matter(raw);

    let kept: Vec<&str> = body
        .lines()
        .filter(|line| {
            let trimmed = line.trim_start();
            !(options.strip_tasks && is_task_line(trimmed)
                || options.strip_headings && is_heading_line(trimmed))
        })
        .map(|line| line.trim_end())
        .collect();

    kept.join("\n").trim().to_string()
}

fn strip_front_matter(raw: &str) -> &str {
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    let Some(rest) = raw
        .strip_prefix("---\n")
        .or_else(|| raw.strip_prefix("---\r\n"))
    else {
        return raw;
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        offset += line.len();
        if line.trim_end() == "---" {
            return &rest[offset..];
        }
    }
    // Unterminated front matter is treated as body text.
    raw
}

fn is_task_line(trimmed: &str) -> bool {
    ["- [", "* [", "+ ["]
        .iter()
        .any(|p| trimmed.starts_with(p))
        && trimmed.get(4..5) == Some("]")
}

fn is_heading_line(trimmed: &str) -> bool {
    let hashes = trimmed.chars().take_while(|&c| c == '#').count();
    (1..=6).contains(&hashes)
        && trimmed[hashes..]
            .chars()
            .next()
            .map_or(true, char::is_whitespace)
}
