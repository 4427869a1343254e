//! Embedding provider implementations.
//!
//! Concrete backends for the [`EmbeddingProvider`] trait:
//! - **[`OpenAIProvider`]**: `POST {api_base}/embeddings` with a bearer key.
//! - **[`OllamaProvider`]**: `POST {url}/api/embed` on a local Ollama.
//! - **[`DisabledProvider`]**: fails every call; used for offline setups.
//!
//! Every HTTP call goes through [`RetryPolicy`]: 429, 5xx, network errors
//! and timeouts are retried with backoff, other failures surface at once.
//!
//! # Provider Selection
//!
//! ```rust,no_run
//! # use repo_chat::config::EmbeddingConfig;
//! # use repo_chat::embedding::create_provider;
//! # use repo_chat::retry::RetryPolicy;
//! let config = EmbeddingConfig {
//!     provider: "disabled".to_string(),
//!     ..EmbeddingConfig::default()
//! };
//! let provider = create_provider(&config, RetryPolicy::none()).unwrap();
//! assert_eq!(provider.model_name(), "disabled");
//! ```

use anyhow::{bail, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use repo_chat_core::embedding::EmbeddingProvider;
use repo_chat_core::ProviderError;

use crate::config::EmbeddingConfig;
use crate::http;
use crate::retry::RetryPolicy;

/// Environment variable holding the OpenAI API key.
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

// ============ Disabled Provider ============

/// Embedding provider that always fails with [`ProviderError::Disabled`].
pub struct DisabledProvider;

#[async_trait]
impl EmbeddingProvider for DisabledProvider {
    fn model_name(&self) -> &str {
        "disabled"
    }
    fn dims(&self) -> usize {
        0
    }
    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        Err(ProviderError::Disabled)
    }
}

// ============ OpenAI Provider ============

/// Embedding provider backed by the OpenAI embeddings API.
///
/// The API key is read from `OPENAI_API_KEY` on each call, so a provider
/// can be built before the key is exported. A missing key fails with
/// [`ProviderError::MissingCredential`] and is never retried.
pub struct OpenAIProvider {
    model: String,
    dims: usize,
    endpoint: String,
    timeout: Duration,
    client: Client,
    retry: RetryPolicy,
}

impl OpenAIProvider {
    pub fn new(config: &EmbeddingConfig, retry: RetryPolicy) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        Ok(Self {
            model: config.resolved_model(),
            dims: config.resolved_dims(),
            endpoint: format!("{}/embeddings", config.api_base.trim_end_matches('/')),
            timeout,
            client: http::client(timeout)?,
            retry,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIProvider {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let api_key = std::env::var(OPENAI_API_KEY_ENV)
            .map_err(|_| ProviderError::MissingCredential(OPENAI_API_KEY_ENV.to_string()))?;

        let body = json!({
            "model": self.model,
            "input": texts,
        });

        debug!(model = %self.model, inputs = texts.len(), "Requesting OpenAI embeddings");
        let response = self
            .retry
            .run("openai.embeddings", || {
                http::post_json(&self.client, &self.endpoint, Some(api_key.as_str()), &body, self.timeout)
            })
            .await?;

        let vectors = parse_openai_response(&response)?;
        check_shape(vectors, texts.len(), self.dims)
    }
}

/// Extract `data[].embedding`, ordered by each item's `index`.
fn parse_openai_response(json: &Value) -> Result<Vec<Vec<f32>>, ProviderError> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| invalid("missing data array"))?;

    let mut indexed = Vec::with_capacity(data.len());
    for (position, item) in data.iter().enumerate() {
        let index = item
            .get("index")
            .and_then(|i| i.as_u64())
            .map(|i| i as usize)
            .unwrap_or(position);
        let embedding = item
            .get("embedding")
            .ok_or_else(|| invalid("missing embedding"))?;
        indexed.push((index, parse_vector(embedding)?));
    }

    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

// ============ Ollama Provider ============

/// Embedding provider using a local Ollama instance.
///
/// Calls `POST /api/embed` on the configured URL (default
/// `http://localhost:11434`). The model must already be pulled.
pub struct OllamaProvider {
    model: String,
    dims: usize,
    endpoint: String,
    timeout: Duration,
    client: Client,
    retry: RetryPolicy,
}

impl OllamaProvider {
    pub fn new(config: &EmbeddingConfig, retry: RetryPolicy) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        Ok(Self {
            model: config.resolved_model(),
            dims: config.resolved_dims(),
            endpoint: format!("{}/api/embed", config.url.trim_end_matches('/')),
            timeout,
            client: http::client(timeout)?,
            retry,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let body = json!({
            "model": self.model,
            "input": texts,
        });

        debug!(model = %self.model, inputs = texts.len(), "Requesting Ollama embeddings");
        let response = self
            .retry
            .run("ollama.embed", || {
                http::post_json(&self.client, &self.endpoint, None, &body, self.timeout)
            })
            .await?;

        let vectors = parse_ollama_response(&response)?;
        check_shape(vectors, texts.len(), self.dims)
    }
}

fn parse_ollama_response(json: &Value) -> Result<Vec<Vec<f32>>, ProviderError> {
    json.get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| invalid("missing embeddings array"))?
        .iter()
        .map(parse_vector)
        .collect()
}

// ============ Shared helpers ============

fn invalid(msg: &str) -> ProviderError {
    ProviderError::InvalidResponse(msg.to_string())
}

fn parse_vector(value: &Value) -> Result<Vec<f32>, ProviderError> {
    value
        .as_array()
        .ok_or_else(|| invalid("embedding is not an array"))?
        .iter()
        .map(|v| {
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| invalid("embedding contains a non-number"))
        })
        .collect()
}

/// One vector per input, each of the configured dimensionality.
fn check_shape(
    vectors: Vec<Vec<f32>>,
    expected_count: usize,
    dims: usize,
) -> Result<Vec<Vec<f32>>, ProviderError> {
    if vectors.len() != expected_count {
        return Err(ProviderError::InvalidResponse(format!(
            "expected {} embeddings, got {}",
            expected_count,
            vectors.len()
        )));
    }
    if let Some(bad) = vectors.iter().find(|v| v.len() != dims) {
        return Err(ProviderError::InvalidResponse(format!(
            "expected {}-dimensional embeddings, got {} (set embedding.dims to match the model)",
            dims,
            bad.len()
        )));
    }
    Ok(vectors)
}

/// Create the [`EmbeddingProvider`] named by `config.provider`.
///
/// | Config Value | Provider |
/// |-------------|----------|
/// | `"openai"` | [`OpenAIProvider`] |
/// | `"ollama"` | [`OllamaProvider`] |
/// | `"disabled"` | [`DisabledProvider`] |
pub fn create_provider(
    config: &EmbeddingConfig,
    retry: RetryPolicy,
) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAIProvider::new(config, retry)?)),
        "ollama" => Ok(Arc::new(OllamaProvider::new(config, retry)?)),
        "disabled" => Ok(Arc::new(DisabledProvider)),
        other => bail!("Unknown embedding provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_openai_orders_by_index() {
        let json = json!({
            "data": [
                {"index": 1, "embedding": [0.0, 1.0]},
                {"index": 0, "embedding": [1.0, 0.0]}
            ]
        });
        let vecs = parse_openai_response(&json).unwrap();
        assert_eq!(vecs, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_parse_openai_missing_data() {
        let err = parse_openai_response(&json!({"error": "nope"})).unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }

    #[test]
    fn test_parse_ollama() {
        let json = json!({"model": "nomic-embed-text", "embeddings": [[0.5, 0.25], [1.0, 2.0]]});
        let vecs = parse_ollama_response(&json).unwrap();
        assert_eq!(vecs.len(), 2);
        assert_eq!(vecs[1], vec![1.0, 2.0]);
        assert!(parse_ollama_response(&json!({"embeddings": [["x"]]})).is_err());
    }

    #[test]
    fn test_check_shape() {
        assert!(check_shape(vec![vec![1.0, 2.0]], 1, 2).is_ok());
        assert!(check_shape(vec![vec![1.0, 2.0]], 2, 2).is_err());
        assert!(check_shape(vec![vec![1.0, 2.0, 3.0]], 1, 2).is_err());
    }

    #[tokio::test]
    async fn test_disabled_provider_errors() {
        let provider = DisabledProvider;
        let err = provider.embed(&["x".to_string()]).await.unwrap_err();
        assert!(matches!(err, ProviderError::Disabled));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_create_provider_names() {
        let mut cfg = EmbeddingConfig::default();
        let openai = create_provider(&cfg, RetryPolicy::none()).unwrap();
        assert_eq!(openai.model_name(), "text-embedding-3-small");
        assert_eq!(openai.dims(), 1536);

        cfg.provider = "ollama".to_string();
        let ollama = create_provider(&cfg, RetryPolicy::none()).unwrap();
        assert_eq!(ollama.model_name(), "nomic-embed-text");
        assert_eq!(ollama.dims(), 768);

        cfg.provider = "bogus".to_string();
        assert!(create_provider(&cfg, RetryPolicy::none()).is_err());
    }
}
