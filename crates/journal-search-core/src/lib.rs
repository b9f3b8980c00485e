//! # Journal Search Core
//!
//! Shared, I/O-free logic for Journal Search: data models, chunking,
//! the embedding provider trait, per-granularity similarity indexes,
//! immutable index generations, and the search service.
//!
//! This crate contains no sqlx, filesystem, or network code; tokio is used
//! only to move similarity scans onto the blocking pool. Loading a corpus
//! from disk, remote embedding providers, the index cache, and the HTTP
//! layer live in the `journal-search` app crate.
//!
//! ```text
//! entries ──▶ Chunker ──▶ EmbeddingProvider ──▶ GranularityIndex ×3
//!                                                     │
//!                                  Generation (published atomically)
//!                                                     │
//!                 query ──▶ SearchService ◀───────────┘
//! ```

pub mod chunk;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod index;
pub mod models;
pub mod search;

pub use error::{Result, SearchError};
pub use models::{Chunk, DateRange, Granularity, JournalEntry, SearchResult};
