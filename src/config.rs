//! TOML configuration.
//!
//! Every section except `[db]` has defaults, so a minimal file is:
//!
//! ```toml
//! [db]
//! path = "./data/medrag.sqlite"
//! ```
//!
//! API keys are read from the environment (`OPENAI_API_KEY`), never from
//! this file.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use medrag_core::generation::GenerationParams;
use medrag_core::prompt::{PromptTemplate, DEFAULT_MAX_CONTEXT_CHARS};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub prompt: PromptConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorpusConfig {
    /// Label stamped on every chunk and shown in passage headers.
    #[serde(default = "default_source_label")]
    pub source_label: String,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            source_label: default_source_label(),
        }
    }
}

fn default_source_label() -> String {
    "Nelson Textbook of Pediatrics".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: default_max_chunk_size(),
        }
    }
}

fn default_max_chunk_size() -> usize {
    medrag_core::chunk::DEFAULT_MAX_CHUNK_SIZE
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    medrag_core::pipeline::DEFAULT_TOP_K
}

#[derive(Debug, Deserialize, Clone)]
pub struct PromptConfig {
    /// Inline instruction template. Takes precedence over `template_path`.
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub template_path: Option<PathBuf>,
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
    #[serde(default = "default_true")]
    pub passage_headers: bool,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            template: None,
            template_path: None,
            max_context_chars: default_max_context_chars(),
            passage_headers: true,
        }
    }
}

impl PromptConfig {
    /// Resolve the configured template, falling back to the built-in one.
    pub fn load_template(&self) -> Result<PromptTemplate> {
        if let Some(text) = &self.template {
            return Ok(PromptTemplate::new(text.clone())?);
        }
        if let Some(path) = &self.template_path {
            let text = std::fs::read_to_string(path).with_context(|| {
                format!("Failed to read prompt template: {}", path.display())
            })?;
            return Ok(PromptTemplate::new(text)?);
        }
        Ok(PromptTemplate::default())
    }
}

fn default_max_context_chars() -> usize {
    DEFAULT_MAX_CONTEXT_CHARS
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_disabled")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL for Ollama (default `http://localhost:11434`) or an
    /// OpenAI-compatible endpoint (default `https://api.openai.com`).
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
            provider: default_disabled(),
            model: None,
            dims: None,
            url: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_disabled")]
    pub provider: String,
    #[serde(default = "default_generation_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_disabled(),
            model: default_generation_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            url: None,
            timeout_secs: default_generation_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

impl GenerationConfig {
    pub fn params(&self) -> GenerationParams {
        GenerationParams {
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

fn default_disabled() -> String {
    "disabled".to_string()
}
fn default_batch_size() -> usize {
    medrag_core::ingest::DEFAULT_BATCH_SIZE
}
fn default_max_retries() -> u32 {
    3
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_generation_model() -> String {
    "gpt-4".to_string()
}
fn default_temperature() -> f32 {
    0.2
}
fn default_max_tokens() -> usize {
    512
}
fn default_generation_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` overrides it.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// When set, logs are also written to a daily-rolling file here.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dir: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

const EMBEDDING_PROVIDERS: &[&str] = &["disabled", "hashing", "openai", "ollama", "local"];
const GENERATION_PROVIDERS: &[&str] = &["disabled", "openai", "ollama"];

impl Config {
    /// A config with every section at its default and the database at `db_path`.
    pub fn with_db_path(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db: DbConfig {
                path: db_path.into(),
            },
            corpus: CorpusConfig::default(),
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
            prompt: PromptConfig::default(),
            embedding: EmbeddingConfig::default(),
            generation: GenerationConfig::default(),
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunking.max_chunk_size == 0 {
            bail!("chunking.max_chunk_size must be > 0");
        }
        if self.retrieval.top_k < 1 {
            bail!("retrieval.top_k must be >= 1");
        }
        if self.prompt.max_context_chars == 0 {
            bail!("prompt.max_context_chars must be > 0");
        }
        if self.corpus.source_label.trim().is_empty() {
            bail!("corpus.source_label must not be empty");
        }

        let embedding = &self.embedding;
        if !EMBEDDING_PROVIDERS.contains(&embedding.provider.as_str()) {
            bail!(
                "Unknown embedding provider: '{}'. Must be one of: {}",
                embedding.provider,
                EMBEDDING_PROVIDERS.join(", ")
            );
        }
        if embedding.batch_size == 0 {
            bail!("embedding.batch_size must be > 0");
        }
        match embedding.provider.as_str() {
            "openai" | "ollama" => {
                if embedding.dims.unwrap_or(0) == 0 {
                    bail!(
                        "embedding.dims must be > 0 when provider is '{}'",
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
            "hashing" | "local" if embedding.dims == Some(0) => {
                bail!("embedding.dims must be > 0");
            }
            _ => {}
        }

        let generation = &self.generation;
        if !GENERATION_PROVIDERS.contains(&generation.provider.as_str()) {
            bail!(
                "Unknown generation provider: '{}'. Must be one of: {}",
                generation.provider,
                GENERATION_PROVIDERS.join(", ")
            );
        }
        if !(0.0..=1.0).contains(&generation.temperature) {
            bail!("generation.temperature must be in [0.0, 1.0]");
        }
        if generation.max_tokens == 0 {
            bail!("generation.max_tokens must be > 0");
        }

        self.prompt
            .load_template()
            .context("Invalid prompt configuration")?;

        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;
    Ok(config)
}
