//! Answer generator backends.
//!
//! | Config Value | Generator |
//! |-------------|-----------|
//! | `"disabled"` | [`DisabledGenerator`] |
//! | `"openai"` | [`OpenAIGenerator`] (`POST /v1/chat/completions`) |
//! | `"ollama"` | [`OllamaGenerator`] (`POST /api/generate`, non-streaming) |
//!
//! The assembled prompt is sent as a single user message. Status handling
//! matches the embedding backends: 429, 5xx, and transport failures are
//! retryable [`RagError::Generation`] errors.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use medrag_core::error::{RagError, Result};
use medrag_core::generation::{AnswerGenerator, GenerationParams};

use crate::config::GenerationConfig;
use crate::retry::{classify_transport, status_error};

/// Fails every call. Used when `generation.provider = "disabled"`.
pub struct DisabledGenerator;

#[async_trait]
impl AnswerGenerator for DisabledGenerator {
    fn model_name(&self) -> &str {
        "disabled"
    }
    async fn generate(&self, _prompt: &str) -> Result<String> {
        Err(RagError::generation(
            "generation provider is disabled; set [generation].provider in the config",
            false,
        ))
    }
}

// ============ OpenAI ============

pub struct OpenAIGenerator {
    client: reqwest::Client,
    api_key: String,
    url: String,
    params: GenerationParams,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: usize,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAIGenerator {
    pub fn new(config: &GenerationConfig) -> anyhow::Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;
        let params = config.params();
        params.validate()?;
        let url = config
            .url
            .clone()
            .unwrap_or_else(|| "https://api.openai.com".to_string());
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build OpenAI HTTP client")?;
        Ok(Self {
            client,
            api_key,
            url: url.trim_end_matches('/').to_string(),
            params,
        })
    }
}

#[async_trait]
impl AnswerGenerator for OpenAIGenerator {
    fn model_name(&self) -> &str {
        &self.params.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = ChatRequest {
            model: &self.params.model,
            temperature: self.params.temperature,
            max_tokens: self.params.max_tokens,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                let (message, retryable) = classify_transport("OpenAI", &e);
                RagError::generation(message, retryable)
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let (message, retryable) = status_error("OpenAI", status, &text);
            return Err(RagError::generation(message, retryable));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            RagError::generation(format!("failed to parse OpenAI response: {}", e), false)
        })?;
        parsed
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .ok_or_else(|| RagError::generation("OpenAI returned no answer text", false))
    }
}

// ============ Ollama ============

pub struct OllamaGenerator {
    client: reqwest::Client,
    url: String,
    params: GenerationParams,
}

#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: usize,
}

#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

impl OllamaGenerator {
    pub fn new(config: &GenerationConfig) -> anyhow::Result<Self> {
        let params = config.params();
        params.validate()?;
        let url = config
            .url
            .clone()
            .unwrap_or_else(|| "http://localhost:11434".to_string());
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build Ollama HTTP client")?;
        Ok(Self {
            client,
            url: url.trim_end_matches('/').to_string(),
            params,
        })
    }
}

#[async_trait]
impl AnswerGenerator for OllamaGenerator {
    fn model_name(&self) -> &str {
        &self.params.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = OllamaGenerateRequest {
            model: &self.params.model,
            prompt,
            stream: false,
            options: OllamaOptions {
                temperature: self.params.temperature,
                num_predict: self.params.max_tokens,
            },
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.url))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                let (message, retryable) = classify_transport("Ollama", &e);
                RagError::generation(
                    format!("{} (is Ollama running at {}?)", message, self.url),
                    retryable,
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let (message, retryable) = status_error("Ollama", status, &text);
            return Err(RagError::generation(message, retryable));
        }

        let parsed: OllamaGenerateResponse = response.json().await.map_err(|e| {
            RagError::generation(format!("failed to parse Ollama response: {}", e), false)
        })?;
        Ok(parsed.response)
    }
}

/// Create the [`AnswerGenerator`] named by `config.provider`.
pub fn create_generator(config: &GenerationConfig) -> anyhow::Result<Arc<dyn AnswerGenerator>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledGenerator)),
        "openai" => Ok(Arc::new(OpenAIGenerator::new(config)?)),
        "ollama" => Ok(Arc::new(OllamaGenerator::new(config)?)),
        other => bail!("Unknown generation provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_generator_errors() {
        let generator = create_generator(&GenerationConfig::default()).unwrap();
        let err = generator.generate("prompt").await.unwrap_err();
        assert!(matches!(err, RagError::Generation { retryable: false, .. }));
    }

    #[test]
    fn test_ollama_rejects_bad_temperature() {
        let config = GenerationConfig {
            provider: "ollama".to_string(),
            temperature: 2.0,
            ..GenerationConfig::default()
        };
        assert!(create_generator(&config).is_err());
    }

    #[test]
    fn test_chat_request_shape() {
        let body = ChatRequest {
            model: "gpt-4",
            temperature: 0.2,
            max_tokens: 256,
            messages: vec![ChatMessage {
                role: "user",
                content: "Context: ... Question: ...",
            }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "gpt-4");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["max_tokens"], 256);
    }

    #[test]
    fn test_chat_response_null_content_skipped() {
        let json = r#"{"choices":[{"message":{"content":null}},{"message":{"content":"Fever is..."}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(json).unwrap();
        let text = parsed
            .choices
            .into_iter()
            .find_map(|c| c.message.content);
        assert_eq!(text.as_deref(), Some("Fever is..."));
    }
}
