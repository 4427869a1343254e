//! Configuration parsing and validation.
//!
//! repo-chat is configured via a TOML file (default: `./repo-chat.toml`).
//! Every section and key is optional; missing values fall back to the
//! defaults below. API credentials are never read from this file: they come
//! from the environment (`OPENAI_API_KEY`), optionally via a `.env` file.
//!
//! # Example
//!
//! ```toml
//! [index]
//! persist_dir = "repo_index"
//! collection_prefix = "repo_files"
//!
//! [collector]
//! extensions = [".py", ".js", ".ts", ".md"]
//! exclude_globs = ["**/.git/**"]
//!
//! [embedding]
//! provider = "openai"
//! model = "text-embedding-3-small"
//! dims = 1536
//!
//! [generation]
//! provider = "openai"
//! model = "gpt-4o-mini"
//! temperature = 0.4
//!
//! [retrieval]
//! top_k = 3
//! max_context_tokens = 6000
//!
//! [retry]
//! max_retries = 4
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use repo_chat_core::prompt::DEFAULT_SYSTEM_PROMPT;

pub const DEFAULT_CONFIG_PATH: &str = "./repo-chat.toml";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub collector: CollectorConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    #[serde(default = "default_persist_dir")]
    pub persist_dir: PathBuf,
    #[serde(default = "default_collection_prefix")]
    pub collection_prefix: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            persist_dir: default_persist_dir(),
            collection_prefix: default_collection_prefix(),
        }
    }
}

fn default_persist_dir() -> PathBuf {
    PathBuf::from("repo_index")
}
fn default_collection_prefix() -> String {
    "repo_files".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct CollectorConfig {
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default = "default_exclude_globs")]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            exclude_globs: default_exclude_globs(),
            follow_symlinks: false,
        }
    }
}

fn default_extensions() -> Vec<String> {
    [".py", ".js", ".ts", ".md"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_exclude_globs() -> Vec<String> {
    vec!["**/.git/**".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    /// `"openai"`, `"ollama"` or `"disabled"`.
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Characters of each document sent to the provider. The stored
    /// content is always the full text.
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,
    #[serde(default = "default_embed_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Ollama base URL.
    #[serde(default = "default_ollama_url")]
    pub url: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            batch_size: default_batch_size(),
            max_input_chars: default_max_input_chars(),
            timeout_secs: default_embed_timeout_secs(),
            api_base: default_api_base(),
            url: default_ollama_url(),
        }
    }
}

impl EmbeddingConfig {
    /// Configured model, or the provider's default.
    pub fn resolved_model(&self) -> String {
        if let Some(model) = &self.model {
            return model.clone();
        }
        match self.provider.as_str() {
            "ollama" => "nomic-embed-text",
            "disabled" => "disabled",
            _ => "text-embedding-3-small",
        }
        .to_string()
    }

    /// Configured dimensionality, or the default model's.
    pub fn resolved_dims(&self) -> usize {
        if let Some(dims) = self.dims {
            return dims;
        }
        match self.resolved_model().as_str() {
            "text-embedding-3-small" | "text-embedding-ada-002" => 1536,
            "text-embedding-3-large" => 3072,
            "nomic-embed-text" | "bge-base-en-v1.5" => 768,
            "mxbai-embed-large" | "bge-large-en-v1.5" => 1024,
            "disabled" => 0,
            _ => 384,
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_input_chars() -> usize {
    24_000
}
fn default_embed_timeout_secs() -> u64 {
    30
}
fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    /// `"openai"`, `"ollama"` or `"disabled"`.
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_chat_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_generate_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_ollama_url")]
    pub url: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_chat_model(),
            temperature: default_temperature(),
            timeout_secs: default_generate_timeout_secs(),
            system_prompt: default_system_prompt(),
            api_base: default_api_base(),
            url: default_ollama_url(),
        }
    }
}

fn default_chat_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_temperature() -> f32 {
    0.4
}
fn default_generate_timeout_secs() -> u64 {
    60
}
fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Budget for file content in the prompt, at ~4 characters per token.
    #[serde(default = "default_max_context_tokens")]
    pub max_context_tokens: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            max_context_tokens: default_max_context_tokens(),
        }
    }
}

fn default_top_k() -> usize {
    3
}
fn default_max_context_tokens() -> usize {
    6000
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt, for transient failures only.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_jitter")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter: default_jitter(),
        }
    }
}

fn default_max_retries() -> u32 {
    4
}
fn default_base_delay_ms() -> u64 {
    500
}
fn default_max_delay_ms() -> u64 {
    16_000
}
fn default_jitter() -> bool {
    true
}

impl Config {
    /// Check value ranges and provider names.
    pub fn validate(&self) -> Result<()> {
        if self.collector.extensions.is_empty() {
            bail!("collector.extensions must not be empty");
        }
        if self.index.collection_prefix.trim().is_empty() {
            bail!("index.collection_prefix must not be empty");
        }
        if self.retrieval.top_k < 1 {
            bail!("retrieval.top_k must be >= 1");
        }
        if self.embedding.batch_size < 1 {
            bail!("embedding.batch_size must be >= 1");
        }
        if !(0.0..=2.0).contains(&self.generation.temperature) {
            bail!("generation.temperature must be in [0.0, 2.0]");
        }
        if self.embedding.max_input_chars < 1 {
            bail!("embedding.max_input_chars must be >= 1");
        }
        if self.embedding.timeout_secs < 1 {
            bail!("embedding.timeout_secs must be >= 1");
        }
        if self.generation.timeout_secs < 1 {
            bail!("generation.timeout_secs must be >= 1");
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            bail!("retry.base_delay_ms must be <= retry.max_delay_ms");
        }

        match self.embedding.provider.as_str() {
            "disabled" | "openai" | "ollama" => {}
            other => bail!(
                "Unknown embedding provider: '{}'. Must be disabled, openai, or ollama.",
                other
            ),
        }
        if self.embedding.dims == Some(0) {
            bail!("embedding.dims must be > 0");
        }

        match self.generation.provider.as_str() {
            "disabled" | "openai" | "ollama" => {}
            other => bail!(
                "Unknown generation provider: '{}'. Must be disabled, openai, or ollama.",
                other
            ),
        }
        Ok(())
    }
}

/// Read, parse and validate a config file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

/// Parse and validate config text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    config.validate()?;
    Ok(config)
}

/// Load `path` if given; otherwise load the default path when it exists,
/// falling back to built-in defaults.
pub fn load_or_default(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(p) => load_config(p),
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_PATH);
            if default_path.exists() {
                load_config(default_path)
            } else {
                Ok(Config::default())
            }
        }
    }
}
