//! JSON journal exports.
//!
//! The file holds an array of objects. Recognized fields:
//!
//! | Field | Meaning |
//! |-------|---------|
//! | `date` | `YYYY-MM-DD`, or an RFC 3339 timestamp (its date is used) |
//! | `text` | Entry text; `emotional_content` and `content` are fallbacks, in that order |
//! | `id` | Optional string or number; defaults to the date, with `#2`, `#3`, ... for repeated dates |
//!
//! Any other fields are ignored.

use chrono::{DateTime, NaiveDate};
use journal_search_core::{JournalEntry, Result, SearchError};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

const TEXT_FIELDS: &[&str] = &["text", "emotional_content", "content"];

pub fn load_json(path: &Path, skip_invalid: bool) -> Result<Vec<JournalEntry>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| SearchError::CorpusUnavailable(format!("{}: {}", path.display(), e)))?;
    parse_entries(&content, skip_invalid)
}

/// Parse a JSON export into entries, in file order.
pub fn parse_entries(content: &str, skip_invalid: bool) -> Result<Vec<JournalEntry>> {
    let value: Value = serde_json::from_str(content)
        .map_err(|e| SearchError::CorpusFormat(format!("invalid JSON: {}", e)))?;
    let items = value.as_array().ok_or_else(|| {
        SearchError::CorpusFormat("expected a JSON array of entries".to_string())
    })?;

    let mut entries = Vec::with_capacity(items.len());
    let mut seen_dates: HashMap<NaiveDate, usize> = HashMap::new();

    for (position, item) in items.iter().enumerate() {
        let Some(object) = item.as_object() else {
            super::reject(skip_invalid, format!("entry {}: not an object", position))?;
            continue;
        };

        let date = match object.get("date").and_then(Value::as_str).and_then(parse_date) {
            Some(date) => date,
            None => {
                super::reject(
                    skip_invalid,
                    format!("entry {}: missing or invalid date", position),
                )?;
                continue;
            }
        };

        let text = match TEXT_FIELDS
            .iter()
            .find_map(|field| object.get(*field).and_then(Value::as_str))
        {
            Some(text) => text,
            None => {
                super::reject(skip_invalid, format!("entry {} ({}): missing text", position, date))?;
                continue;
            }
        };

        let id = match object.get("id") {
            Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => {
                let seen = seen_dates.entry(date).or_insert(0);
                *seen += 1;
                if *seen == 1 {
                    date.to_string()
                } else {
                    format!("{}#{}", date, seen)
                }
            }
        };

        entries.push(JournalEntry::new(id, date, text));
    }

    Ok(entries)
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_fields_and_fallbacks() {
        let entries = parse_entries(
            r#"[
                {"date": "2024-01-01", "text": "plain"},
                {"date": "2024-01-02", "emotional_content": "felt calm", "content": "raw", "tasks": []},
                {"date": "2024-01-03T21:15:00+02:00", "content": "late", "id": 7}
            ]"#,
            false,
        )
        .unwrap();

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].id, "2024-01-01");
        assert_eq!(entries[1].text, "felt calm");
        assert_eq!(entries[2].id, "7");
        assert_eq!(entries[2].date.to_string(), "2024-01-03");
    }

    #[test]
    fn test_repeated_dates_get_suffixes() {
        let entries = parse_entries(
            r#"[{"date": "2024-01-01", "text": "a"}, {"date": "2024-01-01", "text": "b"}]"#,
            false,
        )
        .unwrap();
        assert_eq!(entries[0].id, "2024-01-01");
        assert_eq!(entries[1].id, "2024-01-01#2");
    }

    #[test]
    fn test_missing_date_or_text() {
        for doc in [
            r#"[{"text": "no date"}]"#,
            r#"[{"date": null, "text": "null date"}]"#,
            r#"[{"date": "2024-01-01"}]"#,
            r#"[{"date": "2024-01-01", "text": null}]"#,
        ] {
            let err = parse_entries(doc, false).unwrap_err();
            assert!(matches!(err, SearchError::CorpusFormat(_)), "{}", doc);
            assert!(parse_entries(doc, true).unwrap().is_empty(), "{}", doc);
        }
    }

    #[test]
    fn test_empty_text_is_kept() {
        let entries = parse_entries(r#"[{"date": "2024-01-01", "text": ""}]"#, false).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].text, "");
    }

    #[test]
    fn test_rejects_non_array() {
        assert!(matches!(
            parse_entries(r#"{"date": "2024-01-01"}"#, true).unwrap_err(),
            SearchError::CorpusFormat(_)
        ));
        assert!(parse_entries("not json", false).is_err());
    }
}
