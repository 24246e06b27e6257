//! Optional language-generation capability used by answer synthesis.
//!
//! The synthesizer receives a [`Generator`] by injection, or none at
//! all: with `[generation] provider = "disabled"` (the default),
//! synthesis degrades to returning the retrieved context verbatim.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::GenerationConfig;
use crate::embedding::post_json_with_retry;
use crate::error::RagError;

/// Opaque generation capability: prompt in, completion out.
#[async_trait]
pub trait Generator: Send + Sync {
    fn model_name(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<String, RagError>;
}

/// Instantiate the configured backend; `None` when disabled.
pub fn create_generator(config: &GenerationConfig) -> Result<Option<Arc<dyn Generator>>, RagError> {
    match config.provider.as_str() {
        "disabled" => Ok(None),
        "ollama" => Ok(Some(Arc::new(OllamaGenerator::new(config)?))),
        "openai" => Ok(Some(Arc::new(OpenAiGenerator::new(config)?))),
        other => Err(RagError::Config(format!(
            "unknown generation provider: '{other}'. Must be disabled, ollama, or openai."
        ))),
    }
}

/// Non-streaming completion via a local Ollama instance.
pub struct OllamaGenerator {
    model: String,
    url: String,
    max_retries: u32,
    timeout_secs: u64,
}

impl OllamaGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self, RagError> {
        let model = config.model.clone().ok_or_else(|| {
            RagError::Config("generation.model required for ollama provider".to_string())
        })?;
        Ok(Self {
            model,
            url: config
                .url
                .clone()
                .unwrap_or_else(|| "http://localhost:11434".to_string()),
            max_retries: config.max_retries,
            timeout_secs: config.timeout_secs,
        })
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, RagError> {
        let body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
        });
        let json = post_json_with_retry(
            &format!("{}/api/generate", self.url),
            None,
            &body,
            self.max_retries,
            self.timeout_secs,
        )
        .await
        .map_err(RagError::GenerationUnavailable)?;

        json.get("response")
            .and_then(|r| r.as_str())
            .map(|s| s.trim().to_string())
            .ok_or_else(|| {
                RagError::GenerationUnavailable(
                    "invalid Ollama response: missing response field".to_string(),
                )
            })
    }
}

/// Completion via the OpenAI chat completions API.
pub struct OpenAiGenerator {
    model: String,
    api_key: String,
    max_retries: u32,
    timeout_secs: u64,
}

impl OpenAiGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self, RagError> {
        let model = config.model.clone().ok_or_else(|| {
            RagError::Config("generation.model required for openai provider".to_string())
        })?;
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            RagError::Config("OPENAI_API_KEY environment variable not set".to_string())
        })?;
        Ok(Self {
            model,
            api_key,
            max_retries: config.max_retries,
            timeout_secs: config.timeout_secs,
        })
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, RagError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
        });
        let json = post_json_with_retry(
            "https://api.openai.com/v1/chat/completions",
            Some(&self.api_key),
            &body,
            self.max_retries,
            self.timeout_secs,
        )
        .await
        .map_err(RagError::GenerationUnavailable)?;

        json.pointer("/choices/0/message/content")
            .and_then(|c| c.as_str())
            .map(|s| s.trim().to_string())
            .ok_or_else(|| {
                RagError::GenerationUnavailable(
                    "invalid OpenAI response: missing message content".to_string(),
                )
            })
    }
}
