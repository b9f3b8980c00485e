//! Core data models used throughout Journal Search.
//!
//! These types represent the journal entries, chunks, and search results
//! that flow through the indexing and retrieval pipeline.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SearchError;

/// The chunking level a search operates at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Paragraph,
    Sentence,
    Journal,
}

impl Granularity {
    /// All granularities, in index-build order.
    pub const ALL: [Granularity; 3] = [
        Granularity::Paragraph,
        Granularity::Sentence,
        Granularity::Journal,
    ];

    /// Internal (singular) name: `paragraph`, `sentence`, `journal`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Paragraph => "paragraph",
            Granularity::Sentence => "sentence",
            Granularity::Journal => "journal",
        }
    }

    /// Single-letter tag used inside chunk ids.
    pub(crate) fn tag(&self) -> char {
        match self {
            Granularity::Paragraph => 'p',
            Granularity::Sentence => 's',
            Granularity::Journal => 'j',
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = SearchError;

    /// Accepts both the plural UI labels and the singular internal names,
    /// case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "paragraph" | "paragraphs" => Ok(Granularity::Paragraph),
            "sentence" | "sentences" => Ok(Granularity::Sentence),
            "journal" | "journals" => Ok(Granularity::Journal),
            _ => Err(SearchError::InvalidGranularity(s.to_string())),
        }
    }
}

/// One dated journal entry, immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Stable identifier (relative path or JSON id).
    pub id: String,
    /// The day the entry was written.
    pub date: NaiveDate,
    /// Full entry text.
    pub text: String,
}

impl JournalEntry {
    pub fn new(id: impl Into<String>, date: NaiveDate, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            date,
            text: text.into(),
        }
    }
}

/// A unit of entry text at one granularity.
///
/// `text` is always `entry.text[offset..offset + text.len()]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    /// Unique within its granularity: `{entry_id}#{tag}{index}`.
    pub id: String,
    /// Owning entry. Used for lookup only.
    pub entry_id: String,
    pub granularity: Granularity,
    /// Position within the entry's chunks of this granularity.
    pub index: usize,
    /// Byte offset of `text` inside the entry text.
    pub offset: usize,
    pub text: String,
    /// Copied from the owning entry for display.
    pub date: NaiveDate,
    /// SHA-256 of `text`, hex encoded.
    pub hash: String,
}

/// Inclusive bounds on the entry date of search results. Either end may
/// be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
}

impl DateRange {
    /// No bounds; every date matches.
    pub const ALL: DateRange = DateRange {
        start: None,
        end: None,
    };

    /// Fails with [`SearchError::InvalidQuery`] when `start` is after `end`.
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<Self, SearchError> {
        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err(SearchError::InvalidQuery(format!(
                    "start date {} is after end date {}",
                    s, e
                )));
            }
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> Option<NaiveDate> {
        self.start
    }

    pub fn end(&self) -> Option<NaiveDate> {
        self.end
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }
}

/// One ranked search hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub date: NaiveDate,
    pub text: String,
    /// Cosine similarity in `[-1.0, 1.0]`; higher is more relevant.
    pub similarity: f32,
    pub entry_id: String,
    pub chunk_id: String,
    pub granularity: Granularity,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_granularity_parses_labels_and_names() {
        assert_eq!("paragraphs".parse::<Granularity>().unwrap(), Granularity::Paragraph);
        assert_eq!("sentence".parse::<Granularity>().unwrap(), Granularity::Sentence);
        assert_eq!(" Journals ".parse::<Granularity>().unwrap(), Granularity::Journal);
    }

    #[test]
    fn test_granularity_rejects_unknown() {
        let err = "words".parse::<Granularity>().unwrap_err();
        assert!(matches!(err, SearchError::InvalidGranularity(ref v) if v == "words"));
        assert!("".parse::<Granularity>().is_err());
    }

    #[test]
    fn test_date_range_is_inclusive() {
        let d = |day| NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
        let range = DateRange::new(Some(d(2)), Some(d(4))).unwrap();
        assert!(!range.contains(d(1)));
        assert!(range.contains(d(2)));
        assert!(range.contains(d(4)));
        assert!(!range.contains(d(5)));

        let open_start = DateRange::new(None, Some(d(2))).unwrap();
        assert!(open_start.contains(d(1)));
        assert!(!open_start.contains(d(3)));
        assert!(DateRange::ALL.contains(d(31)));
        assert!(DateRange::ALL.is_unbounded());

        assert!(DateRange::new(Some(d(3)), Some(d(3))).is_ok());
        let err = DateRange::new(Some(d(4)), Some(d(2))).unwrap_err();
        assert!(matches!(err, SearchError::InvalidQuery(ref m) if m.contains("after")));
    }

    #[test]
    fn test_search_result_serializes_date_as_iso() {
        let result = SearchResult {
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            text: "It rained later.".to_string(),
            similarity: 0.5,
            entry_id: "2024-01-01".to_string(),
            chunk_id: "2024-01-01#s1".to_string(),
            granularity: Granularity::Sentence,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["date"], "2024-01-01");
        assert_eq!(json["granularity"], "sentence");
    }
}
