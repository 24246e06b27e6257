//! TOML configuration parsing and validation.
//!
//! All validation happens in [`load_config`], before any I/O: bad
//! chunking parameters, unknown providers, or an invalid retrieval `k`
//! are rejected up front as [`RagError::Config`].

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::RagError;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub store: StoreConfig,
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub synthesis: SynthesisConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    pub path: PathBuf,
    #[serde(default = "default_collection")]
    pub collection: String,
}

fn default_collection() -> String {
    "document_chunks".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    /// Chunk window in words.
    pub chunk_size: usize,
    /// Words shared between consecutive chunks; must be < `chunk_size`.
    #[serde(default = "default_overlap")]
    pub chunk_overlap: usize,
}

fn default_overlap() -> usize {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_k")]
    pub k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { k: default_k() }
    }
}

fn default_k() -> usize {
    4
}

#[derive(Debug, Deserialize, Clone)]
pub struct SynthesisConfig {
    #[serde(default = "default_mode")]
    pub mode: String,
    /// Optional cap on the concatenated context passed to generation.
    #[serde(default)]
    pub max_context_chars: Option<usize>,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            max_context_chars: None,
        }
    }
}

fn default_mode() -> String {
    "compact".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: None,
            dims: None,
            url: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_embedding_provider() -> String {
    "hashing".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_generation_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_generation_retries")]
    pub max_retries: u32,
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_generation_provider(),
            model: None,
            url: None,
            max_retries: default_generation_retries(),
            timeout_secs: default_generation_timeout(),
        }
    }
}

fn default_generation_provider() -> String {
    "disabled".to_string()
}
fn default_generation_retries() -> u32 {
    2
}
fn default_generation_timeout() -> u64 {
    120
}

pub fn load_config(path: &Path) -> Result<Config, RagError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        RagError::Config(format!("failed to read config file {}: {e}", path.display()))
    })?;

    let config: Config = toml::from_str(&content)
        .map_err(|e| RagError::Config(format!("failed to parse config file: {e}")))?;

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<(), RagError> {
    if config.chunking.chunk_size == 0 {
        return Err(RagError::Config(
            "chunking.chunk_size must be > 0".to_string(),
        ));
    }
    if config.chunking.chunk_overlap >= config.chunking.chunk_size {
        return Err(RagError::Config(format!(
            "chunking.chunk_overlap ({}) must be < chunking.chunk_size ({})",
            config.chunking.chunk_overlap, config.chunking.chunk_size
        )));
    }
    if config.retrieval.k == 0 {
        return Err(RagError::Config("retrieval.k must be >= 1".to_string()));
    }
    if config.synthesis.mode != "compact" {
        return Err(RagError::Config(format!(
            "unknown synthesis mode: '{}'. Only 'compact' is supported.",
            config.synthesis.mode
        )));
    }

    match config.embedding.provider.as_str() {
        "hashing" => {
            if config.embedding.dims == Some(0) {
                return Err(RagError::Config(
                    "embedding.dims must be > 0".to_string(),
                ));
            }
        }
        "ollama" | "openai" => {
            if config.embedding.model.is_none() {
                return Err(RagError::Config(format!(
                    "embedding.model must be set when provider is '{}'",
                    config.embedding.provider
                )));
            }
            if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
                return Err(RagError::Config(format!(
                    "embedding.dims must be > 0 when provider is '{}'",
                    config.embedding.provider
                )));
            }
        }
        other => {
            return Err(RagError::Config(format!(
                "unknown embedding provider: '{other}'. Must be hashing, ollama, or openai."
            )));
        }
    }

    match config.generation.provider.as_str() {
        "disabled" => {}
        "ollama" | "openai" => {
            if config.generation.model.is_none() {
                return Err(RagError::Config(format!(
                    "generation.model must be set when provider is '{}'",
                    config.generation.provider
                )));
            }
        }
        other => {
            return Err(RagError::Config(format!(
                "unknown generation provider: '{other}'. Must be disabled, ollama, or openai."
            )));
        }
    }

    Ok(())
}
