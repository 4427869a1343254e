//! Answer generation through a chat-completion endpoint.
//!
//! [`OpenAIGenerator`] calls `POST {api_base}/chat/completions`;
//! [`OllamaGenerator`] calls `POST {url}/api/chat` with `stream: false`.
//! Both retry transient failures through [`RetryPolicy`].

use anyhow::{bail, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use repo_chat_core::generator::{AnswerGenerator, ChatMessage};
use repo_chat_core::prompt::build_messages;
use repo_chat_core::{Error, ProviderError};

use crate::config::GenerationConfig;
use crate::embedding::OPENAI_API_KEY_ENV;
use crate::http;
use crate::retry::RetryPolicy;

#[derive(Serialize)]
struct OpenAIChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Deserialize)]
struct OpenAIChatResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: ResponseMessage,
}

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: Option<ResponseMessage>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Chat model behind the OpenAI chat-completions API.
pub struct OpenAIGenerator {
    model: String,
    temperature: f32,
    endpoint: String,
    timeout: Duration,
    client: Client,
    retry: RetryPolicy,
}

impl OpenAIGenerator {
    pub fn new(config: &GenerationConfig, retry: RetryPolicy) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        Ok(Self {
            model: config.model.clone(),
            temperature: config.temperature,
            endpoint: format!("{}/chat/completions", config.api_base.trim_end_matches('/')),
            timeout,
            client: http::client(timeout)?,
            retry,
        })
    }
}

#[async_trait]
impl AnswerGenerator for OpenAIGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ProviderError> {
        let api_key = std::env::var(OPENAI_API_KEY_ENV)
            .map_err(|_| ProviderError::MissingCredential(OPENAI_API_KEY_ENV.to_string()))?;
        let request = OpenAIChatRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
        };

        debug!(model = %self.model, messages = messages.len(), "Requesting OpenAI completion");
        let json = self
            .retry
            .run("openai.chat", || {
                http::post_json(&self.client, &self.endpoint, Some(api_key.as_str()), &request, self.timeout)
            })
            .await?;

        parse_openai_completion(json)
    }
}

fn parse_openai_completion(json: serde_json::Value) -> Result<String, ProviderError> {
    let response: OpenAIChatResponse = serde_json::from_value(json)
        .map_err(|e| ProviderError::InvalidResponse(format!("chat completion: {}", e)))?;
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| ProviderError::InvalidResponse("chat completion has no content".into()))
}

/// Chat model served by a local Ollama instance.
pub struct OllamaGenerator {
    model: String,
    temperature: f32,
    endpoint: String,
    timeout: Duration,
    client: Client,
    retry: RetryPolicy,
}

impl OllamaGenerator {
    pub fn new(config: &GenerationConfig, retry: RetryPolicy) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        Ok(Self {
            model: config.model.clone(),
            temperature: config.temperature,
            endpoint: format!("{}/api/chat", config.url.trim_end_matches('/')),
            timeout,
            client: http::client(timeout)?,
            retry,
        })
    }
}

#[async_trait]
impl AnswerGenerator for OllamaGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ProviderError> {
        let request = OllamaChatRequest {
            model: &self.model,
            messages,
            stream: false,
            options: OllamaOptions {
                temperature: self.temperature,
            },
        };

        debug!(model = %self.model, messages = messages.len(), "Requesting Ollama completion");
        let json = self
            .retry
            .run("ollama.chat", || {
                http::post_json(&self.client, &self.endpoint, None, &request, self.timeout)
            })
            .await?;

        parse_ollama_completion(json)
    }
}

fn parse_ollama_completion(json: serde_json::Value) -> Result<String, ProviderError> {
    let response: OllamaChatResponse = serde_json::from_value(json)
        .map_err(|e| ProviderError::InvalidResponse(format!("ollama chat: {}", e)))?;
    response
        .message
        .and_then(|m| m.content)
        .ok_or_else(|| ProviderError::InvalidResponse("ollama chat has no content".into()))
}

/// Generator that always fails with [`ProviderError::Disabled`].
pub struct DisabledGenerator;

#[async_trait]
impl AnswerGenerator for DisabledGenerator {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn complete(&self, _messages: &[ChatMessage]) -> Result<String, ProviderError> {
        Err(ProviderError::Disabled)
    }
}

/// Create the [`AnswerGenerator`] named by `config.provider`
/// (`"openai"`, `"ollama"` or `"disabled"`).
pub fn create_generator(
    config: &GenerationConfig,
    retry: RetryPolicy,
) -> Result<Arc<dyn AnswerGenerator>> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAIGenerator::new(config, retry)?)),
        "ollama" => Ok(Arc::new(OllamaGenerator::new(config, retry)?)),
        "disabled" => Ok(Arc::new(DisabledGenerator)),
        other => bail!("Unknown generation provider: {}", other),
    }
}

/// Send `[system, user(prompt)]` to the generator and return its answer.
pub async fn generate(
    generator: &dyn AnswerGenerator,
    system_prompt: &str,
    prompt: &str,
) -> repo_chat_core::Result<String> {
    let messages = build_messages(system_prompt, prompt);
    generator
        .complete(&messages)
        .await
        .map_err(Error::Generator)
}
