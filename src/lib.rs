//! # Journal Search
//!
//! Semantic search over a personal journal corpus.
//!
//! Entries are loaded from a directory of dated Markdown files or a JSON
//! export, split into paragraphs, sentences, and whole journals, embedded,
//! and held in memory as three independent indexes. Queries are answered by
//! exhaustive cosine similarity from the CLI or over HTTP.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌──────────────┐
//! │   Corpus    │──▶│ Chunk+Embed  │──▶│  Generation   │
//! │  MD / JSON  │   │ (+ cache)    │   │ 3 indexes     │
//! └─────────────┘   └──────────────┘   └──────┬───────┘
//!                                            │
//!                       ┌────────────────────┤
//!                       ▼                    ▼
//!                  ┌──────────┐        ┌──────────┐
//!                  │   CLI    │        │   HTTP   │
//!                  │(jsearch) │        │ /search  │
//!                  └──────────┘        └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! jsearch index                               # build (and cache) the indexes
//! jsearch search "rain" --granularity sentences
//! jsearch get 2024-01-01.md
//! jsearch serve                               # start the HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`corpus`] | Markdown and JSON corpus loading |
//! | [`embedding`] | Embedding provider construction |
//! | [`cache`] | SQLite cache of chunk vectors |
//! | [`reload`] | Engine assembly and generation publishing |
//! | [`index_cmd`] | `jsearch index` |
//! | [`search`] | `jsearch search` |
//! | [`get`] | `jsearch get` |
//! | [`server`] | HTTP server |
//! | [`db`] | Database connection |
//! | [`migrate`] | Cache schema |

pub mod cache;
pub mod config;
pub mod corpus;
pub mod db;
pub mod embedding;
pub mod get;
pub mod index_cmd;
pub mod migrate;
pub mod reload;
pub mod search;
pub mod server;
