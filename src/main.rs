//! # Journal Search CLI (`jsearch`)
//!
//! The `jsearch` binary indexes a journal corpus, answers one-off queries,
//! prints individual entries, and starts the HTTP search server.
//!
//! ## Usage
//!
//! ```bash
//! jsearch --config ./config/jsearch.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `jsearch index` | Load, chunk, and embed the corpus; refresh the cache |
//! | `jsearch index --rebuild` | Ignore the cache and re-embed everything |
//! | `jsearch index --clear` | Empty the index cache |
//! | `jsearch search "<query>"` | Search at one granularity |
//! | `jsearch search "<query>" --since 2024-01-01 --until 2024-01-31` | Search within a date range |
//! | `jsearch get <id>` | Print an entry and its chunks |
//! | `jsearch serve` | Start the HTTP server |
//!
//! Logs go to stderr and are filtered with `RUST_LOG`
//! (default `journal_search=info,journal_search_core=info`).

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use journal_search::{config, get, index_cmd, search, server};

/// Journal Search CLI: semantic search over a personal journal at
/// paragraph, sentence, and whole-journal granularity.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/jsearch.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "jsearch",
    about = "Semantic search over a personal journal",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/jsearch.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the paragraph, sentence, and journal indexes.
    ///
    /// Reuses cached vectors when the corpus and model are unchanged.
    Index {
        /// Ignore cached vectors and re-embed every chunk.
        #[arg(long)]
        rebuild: bool,

        /// Empty the index cache and exit.
        #[arg(long, conflicts_with = "rebuild")]
        clear: bool,
    },

    /// Search the journal.
    Search {
        /// The search query string.
        query: String,

        /// `paragraphs`, `sentences`, or `journals`.
        #[arg(long, short, default_value = "paragraphs")]
        granularity: String,

        /// Maximum number of results to return.
        #[arg(long)]
        limit: Option<usize>,

        /// Only entries dated on or after this day (YYYY-MM-DD).
        #[arg(long)]
        since: Option<NaiveDate>,

        /// Only entries dated on or before this day (YYYY-MM-DD).
        #[arg(long)]
        until: Option<NaiveDate>,
    },

    /// Print an entry and how it is chunked.
    Get {
        /// Entry id: the file path relative to the corpus root, or the JSON id.
        id: String,

        /// Only show chunks at this granularity.
        #[arg(long, short)]
        granularity: Option<String>,
    },

    /// Start the HTTP search server.
    ///
    /// Binds to the address configured in `[server].bind`.
    Serve,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "journal_search=info,journal_search_core=info".into()),
        )
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Index { rebuild, clear } => {
            if clear {
                index_cmd::run_clear(&cfg).await?;
            } else {
                index_cmd::run_index(&cfg, rebuild).await?;
            }
        }
        Commands::Search {
            query,
            granularity,
            limit,
            since,
            until,
        } => {
            search::run_search(&cfg, &query, &granularity, limit, since, until).await?;
        }
        Commands::Get { id, granularity } => {
            get::run_get(&cfg, &id, granularity.as_deref()).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
