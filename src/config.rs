//! TOML configuration.
//!
//! Every section except `[corpus]` is optional and falls back to the
//! defaults below. [`load_config`] parses the file and validates it; a
//! config that loads successfully can build an engine without further
//! checks.
//!
//! ```toml
//! [corpus]
//! path = "./journal"
//!
//! [embedding]
//! provider = "hash"
//!
//! [cache]
//! path = "./data/index.sqlite"
//! ```

use anyhow::{bail, Context, Result};
use globset::Glob;
use journal_search_core::chunk::Chunker;
use journal_search_core::search::{SearchParams, DEFAULT_K, MAX_K};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// How the corpus at `corpus.path` is stored.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CorpusFormat {
    /// `.json` file → JSON, directory → markdown.
    #[default]
    Auto,
    Markdown,
    Json,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorpusConfig {
    pub path: PathBuf,
    #[serde(default)]
    pub format: CorpusFormat,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
    /// Skip (and log) undated or text-less entries instead of failing the load.
    #[serde(default)]
    pub skip_invalid: bool,
    #[serde(default = "default_true")]
    pub strip_tasks: bool,
    #[serde(default = "default_true")]
    pub strip_headings: bool,
}

fn default_include_globs() -> Vec<String> {
    vec!["**/*.md".to_string()]
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ChunkingConfig {
    /// Replaces the built-in abbreviation list when set.
    #[serde(default)]
    pub abbreviations: Option<Vec<String>>,
}

impl ChunkingConfig {
    pub fn chunker(&self) -> Chunker {
        match &self.abbreviations {
            Some(list) => Chunker::with_abbreviations(list),
            None => Chunker::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub url: Option<String>,
    /// Longer inputs are cut at a char boundary before reaching a model.
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,
    /// Pending requests allowed in front of a local model.
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            batch_size: default_batch_size(),
            max_retries: 0,
            timeout_secs: default_timeout_secs(),
            url: None,
            max_input_chars: default_max_input_chars(),
            queue_depth: default_queue_depth(),
        }
    }
}

fn default_provider() -> String {
    "hash".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_input_chars() -> usize {
    8000
}
fn default_queue_depth() -> usize {
    64
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_k")]
    pub default_k: usize,
    #[serde(default = "default_max_k")]
    pub max_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_k: DEFAULT_K,
            max_k: MAX_K,
        }
    }
}

fn default_k() -> usize {
    DEFAULT_K
}
fn default_max_k() -> usize {
    MAX_K
}

impl RetrievalConfig {
    pub fn params(&self) -> SearchParams {
        SearchParams {
            default_k: self.default_k,
            max_k: self.max_k,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CacheConfig {
    /// SQLite file holding cached vectors. No caching when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}
fn default_request_timeout_secs() -> u64 {
    30
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

/// Parse and validate config text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    for pattern in config
        .corpus
        .include_globs
        .iter()
        .chain(&config.corpus.exclude_globs)
    {
        Glob::new(pattern).with_context(|| format!("Invalid corpus glob: '{}'", pattern))?;
    }

    // Validate retrieval
    if config.retrieval.max_k < 1 {
        bail!("retrieval.max_k must be >= 1");
    }
    if config.retrieval.default_k < 1 || config.retrieval.default_k > config.retrieval.max_k {
        bail!("retrieval.default_k must be between 1 and retrieval.max_k");
    }

    // Validate embedding
    let embedding = &config.embedding;
    if embedding.batch_size == 0 {
        bail!("embedding.batch_size must be > 0");
    }
    if embedding.max_input_chars == 0 {
        bail!("embedding.max_input_chars must be > 0");
    }
    if embedding.queue_depth == 0 {
        bail!("embedding.queue_depth must be > 0");
    }
    if embedding.dims == Some(0) {
        bail!("embedding.dims must be > 0");
    }

    match embedding.provider.as_str() {
        "hash" | "local" => {}
        "openai" | "ollama" => {
            if embedding.dims.is_none() {
                bail!(
                    "embedding.dims must be set when provider is '{}'",
                    embedding.provider
                );
            }
            if embedding.model.is_none() {
                bail!(
                    "embedding.model must be specified when provider is '{}'",
                    embedding.provider
                );
            }
        }
        other => bail!(
            "Unknown embedding provider: '{}'. Must be hash, openai, ollama, or local.",
            other
        ),
    }

    if config.server.request_timeout_secs == 0 {
        bail!("server.request_timeout_secs must be > 0");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = parse_config("[corpus]\npath = \"./journal\"\n").unwrap();
        assert_eq!(config.corpus.format, CorpusFormat::Auto);
        assert_eq!(config.corpus.include_globs, vec!["**/*.md"]);
        assert!(config.corpus.strip_tasks);
        assert_eq!(config.embedding.provider, "hash");
        assert_eq!(config.embedding.max_retries, 0);
        assert_eq!(config.retrieval.params(), SearchParams::default());
        assert!(config.cache.path.is_none());
        assert_eq!(config.server.bind, "127.0.0.1:7341");
    }

    #[test]
    fn test_corpus_section_required() {
        assert!(parse_config("[embedding]\nprovider = \"hash\"\n").is_err());
    }

    #[test]
    fn test_remote_provider_needs_model_and_dims() {
        let err = parse_config(
            "[corpus]\npath = \"j\"\n[embedding]\nprovider = \"openai\"\nmodel = \"m\"\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("embedding.dims"));

        let ok = parse_config(
            "[corpus]\npath = \"j\"\n[embedding]\nprovider = \"ollama\"\nmodel = \"m\"\ndims = 8\n",
        );
        assert!(ok.is_ok());
    }

    #[test]
    fn test_rejects_unknown_provider_and_bad_k() {
        assert!(parse_config("[corpus]\npath = \"j\"\n[embedding]\nprovider = \"x\"\n").is_err());
        assert!(
            parse_config("[corpus]\npath = \"j\"\n[retrieval]\ndefault_k = 20\nmax_k = 5\n")
                .is_err()
        );
    }

    #[test]
    fn test_rejects_invalid_glob() {
        let err = parse_config("[corpus]\npath = \"j\"\ninclude_globs = [\"a/[\"]\n").unwrap_err();
        assert!(err.to_string().contains("Invalid corpus glob"));
    }

    #[test]
    fn test_custom_abbreviations() {
        let config =
            parse_config("[corpus]\npath = \"j\"\n[chunking]\nabbreviations = [\"Capt.\"]\n")
                .unwrap();
        let chunker = config.chunking.chunker();
        assert_eq!(chunker.abbreviations().collect::<Vec<_>>(), vec!["capt"]);
    }
}
