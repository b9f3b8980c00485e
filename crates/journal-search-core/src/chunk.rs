//! Granularity-aware text chunker.
//!
//! Splits a [`JournalEntry`] into [`Chunk`]s at one of three levels:
//!
//! | Granularity | Rule |
//! |-------------|------|
//! | `journal`   | one chunk, the full entry text verbatim (even when empty) |
//! | `paragraph` | split on blank lines; runs of blank lines collapse; trimmed; empties dropped |
//! | `sentence`  | each paragraph split after `.`, `!`, `?` followed by whitespace or end of text |
//!
//! Every chunk records the byte offset of its text inside the entry, so
//! `&entry.text[chunk.offset..][..chunk.text.len()] == chunk.text` always holds.
//! Chunk ids are deterministic (`{entry_id}#{p|s|j}{index}`) and each chunk
//! carries a SHA-256 hash of its text for cache validation.
//!
//! # Sentence boundaries
//!
//! Sentence splitting is a heuristic, not a parser. A period does not end a
//! sentence when the word before it is:
//!
//! - a run of uppercase initials other than `I` (`J.`, `U.S.`), or
//! - a known abbreviation (`Mr.`, `Dr.`, `e.g.`, …; see [`DEFAULT_ABBREVIATIONS`]).
//!
//! Known failure modes: an abbreviation that really does end a sentence
//! (`… and so on etc. Then`) is not split, and a sentence ending in an
//! unlisted abbreviation-like token is split too early.
//!
//! # Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use journal_search_core::chunk::Chunker;
//! use journal_search_core::models::{Granularity, JournalEntry};
//!
//! let entry = JournalEntry::new(
//!     "2024-01-01",
//!     NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
//!     "I went for a walk. It rained later.",
//! );
//! let chunks = Chunker::new().chunk(&entry, Granularity::Sentence);
//! assert_eq!(chunks.len(), 2);
//! assert_eq!(chunks[1].text, "It rained later.");
//! ```

use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

use crate::models::{Chunk, Granularity, JournalEntry};

/// Abbreviations whose trailing period never ends a sentence.
///
/// Stored lowercase without the final period; internal periods are kept
/// (`e.g`, `p.m`).
pub const DEFAULT_ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "mx", "dr", "prof", "sr", "jr", "st", "vs", "etc", "e.g", "i.e", "cf",
    "a.m", "p.m", "approx", "dept", "fig", "inc", "ltd", "vol", "mt", "ave", "jan", "feb",
    "mar", "apr", "jun", "jul", "aug", "sep", "sept", "oct", "nov", "dec",
];

/// Splits entries into chunks. Cheap to clone; pure and deterministic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunker {
    abbreviations: BTreeSet<String>,
}

impl Default for Chunker {
    fn default() -> Self {
        Self::with_abbreviations(DEFAULT_ABBREVIATIONS.iter().copied())
    }
}

impl Chunker {
    /// Chunker with the [`DEFAULT_ABBREVIATIONS`] guard list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Chunker with a custom abbreviation list (replaces the defaults).
    ///
    /// Entries are normalized to lowercase with any trailing `.` removed,
    /// so `"Dr."` and `"dr"` are equivalent.
    pub fn with_abbreviations<I, S>(abbreviations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let abbreviations = abbreviations
            .into_iter()
            .map(|a| a.as_ref().trim().trim_end_matches('.').to_lowercase())
            .filter(|a| !a.is_empty())
            .collect();
        Self { abbreviations }
    }

    /// The abbreviation list in sorted order.
    pub fn abbreviations(&self) -> impl Iterator<Item = &str> {
        self.abbreviations.iter().map(String::as_str)
    }

    /// Chunk one entry at one granularity, in source order.
    pub fn chunk(&self, entry: &JournalEntry, granularity: Granularity) -> Vec<Chunk> {
        let spans = match granularity {
            Granularity::Journal => vec![(0, entry.text.len())],
            Granularity::Paragraph => paragraph_spans(&entry.text),
            Granularity::Sentence => self.sentence_spans(&entry.text),
        };

        spans
            .into_iter()
            .enumerate()
            .map(|(index, (start, end))| make_chunk(entry, granularity, index, start, end))
            .collect()
    }

    /// Chunk every entry at one granularity, preserving entry order.
    pub fn chunk_all(&self, entries: &[JournalEntry], granularity: Granularity) -> Vec<Chunk> {
        entries
            .iter()
            .flat_map(|entry| self.chunk(entry, granularity))
            .collect()
    }

    /// Byte ranges of the sentences in `text`. Sentences never cross
    /// paragraph boundaries.
    pub fn sentence_spans(&self, text: &str) -> Vec<(usize, usize)> {
        paragraph_spans(text)
            .into_iter()
            .flat_map(|(start, end)| {
                self.split_sentences(&text[start..end])
                    .into_iter()
                    .map(move |(s, e)| (start + s, start + e))
            })
            .collect()
    }

    fn split_sentences(&self, para: &str) -> Vec<(usize, usize)> {
        let chars: Vec<(usize, char)> = para.char_indices().collect();
        let mut spans = Vec::new();
        let mut start = 0;
        let mut i = 0;

        while i < chars.len() {
            let (pos, c) = chars[i];
            if !is_terminal(c) {
                i += 1;
                continue;
            }

            // Swallow runs like `?!`, `...` and trailing quotes or brackets.
            let mut j = i + 1;
            while j < chars.len() && (is_terminal(chars[j].1) || is_closing(chars[j].1)) {
                j += 1;
            }

            let end = chars.get(j).map(|&(p, _)| p).unwrap_or(para.len());
            let at_boundary = j == chars.len() || chars[j].1.is_whitespace();
            let lone_period = c == '.' && !chars[i + 1..j].iter().any(|&(_, ch)| is_terminal(ch));

            if at_boundary && !(lone_period && self.is_abbreviation(&para[start..pos])) {
                push_trimmed(&mut spans, para, start, end);
                start = end;
            }
            i = j;
        }

        push_trimmed(&mut spans, para, start, para.len());
        spans
    }

    /// Whether the word ending `preceding` suppresses a sentence break.
    fn is_abbreviation(&self, preceding: &str) -> bool {
        let word = preceding.rsplit(char::is_whitespace).next().unwrap_or("");
        let word = word.trim_start_matches(|c: char| !c.is_alphanumeric());
        if word.is_empty() {
            return false;
        }

        let initials = word.split('.').all(|part| {
            let mut cs = part.chars();
            matches!((cs.next(), cs.next()), (Some(c), None) if c.is_uppercase() && c != 'I')
        });

        initials || self.abbreviations.contains(&word.to_lowercase())
    }
}

/// Byte ranges of the paragraphs in `text`, trimmed, blank lines collapsed.
pub fn paragraph_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut current: Option<(usize, usize)> = None;
    let mut line_start = 0;

    for line in text.split_inclusive('\n') {
        let line_end = line_start + line.len();
        if line.trim().is_empty() {
            if let Some((s, e)) = current.take() {
                push_trimmed(&mut spans, text, s, e);
            }
        } else {
            let s = current.map(|(s, _)| s).unwrap_or(line_start);
            current = Some((s, line_end));
        }
        line_start = line_end;
    }

    if let Some((s, e)) = current {
        push_trimmed(&mut spans, text, s, e);
    }

    spans
}

fn is_terminal(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

fn is_closing(c: char) -> bool {
    matches!(c, '"' | '\'' | ')' | ']' | '»' | '”' | '’')
}

fn push_trimmed(spans: &mut Vec<(usize, usize)>, text: &str, start: usize, end: usize) {
    let slice = &text[start..end];
    let trimmed = slice.trim();
    if trimmed.is_empty() {
        return;
    }
    let lead = slice.len() - slice.trim_start().len();
    spans.push((start + lead, start + lead + trimmed.len()));
}

fn make_chunk(
    entry: &JournalEntry,
    granularity: Granularity,
    index: usize,
    start: usize,
    end: usize,
) -> Chunk {
    let text = &entry.text[start..end];
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    Chunk {
        id: format!("{}#{}{}", entry.id, granularity.tag(), index),
        entry_id: entry.id.clone(),
        granularity,
        index,
        offset: start,
        text: text.to_string(),
        date: entry.date,
        hash,
    }
}
