//! Error taxonomy shared by every layer of Journal Search.
//!
//! Each variant is a distinct failure class so that callers (the HTTP
//! layer in particular) can map errors to responses by kind instead of
//! by message text.

use thiserror::Error;

/// Errors produced while loading, indexing, or searching a journal corpus.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The corpus location could not be read.
    #[error("corpus unavailable: {0}")]
    CorpusUnavailable(String),

    /// An entry in the corpus is missing its date or text, or is malformed.
    #[error("corpus format error: {0}")]
    CorpusFormat(String),

    /// The embedding backend failed, or was handed empty text.
    #[error("embedding error: {0}")]
    Embedding(String),

    /// The query text is empty or the request parameters are out of range.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The requested granularity is not one of paragraphs, sentences, journals.
    #[error("invalid granularity: '{0}' (expected paragraphs, sentences, or journals)")]
    InvalidGranularity(String),

    /// A search arrived before the first generation was published.
    #[error("index unavailable: no index generation has been built yet")]
    IndexUnavailable,

    /// Embeddings from different model configurations were mixed.
    #[error("model mismatch: {0}")]
    ModelMismatch(String),

    /// A search task on the blocking pool panicked or was cancelled.
    #[error("search task failed: {0}")]
    TaskFailed(String),
}

impl SearchError {
    /// True for errors caused by the request itself rather than the backend.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            SearchError::InvalidQuery(_) | SearchError::InvalidGranularity(_)
        )
    }
}

pub type Result<T, E = SearchError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors() {
        assert!(SearchError::InvalidQuery("empty".into()).is_client_error());
        assert!(SearchError::InvalidGranularity("words".into()).is_client_error());
        assert!(!SearchError::IndexUnavailable.is_client_error());
        assert!(!SearchError::Embedding("down".into()).is_client_error());
    }

    #[test]
    fn test_granularity_message_names_value() {
        let msg = SearchError::InvalidGranularity("words".into()).to_string();
        assert!(msg.contains("'words'"));
        assert!(msg.contains("paragraphs"));
    }
}
