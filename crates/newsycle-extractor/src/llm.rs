//! Chat model clients for the LLM-backed recognizer
//!
//! Both backends receive the same two-message conversation: the extraction
//! instructions as the system turn and the description as the user turn.
//!
//! Author: hephaex@gmail.com

use async_trait::async_trait;
use newsycle_core::{LlmConfig, LlmProvider, NewsycleError, Result};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// System instructions plus the text to annotate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatPrompt {
    pub system: String,
    pub user: String,
}

impl ChatPrompt {
    fn messages(&self) -> [ChatMessage<'_>; 2] {
        [
            ChatMessage {
                role: "system",
                content: &self.system,
            },
            ChatMessage {
                role: "user",
                content: &self.user,
            },
        ]
    }
}

/// A chat model that answers one prompt at a time
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &ChatPrompt) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: String,
}

fn build_http_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| NewsycleError::ConfigError(format!("Failed to build HTTP client: {e}")))
}

/// Non-2xx replies carry the provider's error text
async fn ensure_success(response: Response, provider: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(NewsycleError::LlmError(format!(
        "{provider} returned {status}: {body}"
    )))
}

// ============================================================================
// OpenAI-compatible chat completions
// ============================================================================

/// Chat completions client for OpenAI and Azure-style endpoints
pub struct OpenAiClient {
    http: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: ReplyMessage,
}

impl OpenAiClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let api_key = config.openai_api_key.clone().ok_or_else(|| {
            NewsycleError::ConfigError(format!(
                "llm.openai_api_key is required for the {} provider",
                config.provider
            ))
        })?;

        Ok(Self {
            http: build_http_client(config.timeout_secs)?,
            api_key,
            base_url: config
                .openai_base_url
                .clone()
                .unwrap_or_else(|| OPENAI_BASE_URL.to_string()),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, prompt: &ChatPrompt) -> Result<String> {
        let request = CompletionRequest {
            model: &self.model,
            messages: prompt.messages(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| NewsycleError::LlmError(format!("Chat request failed: {e}")))?;

        let reply: CompletionResponse = ensure_success(response, "OpenAI")
            .await?
            .json()
            .await
            .map_err(|e| NewsycleError::LlmError(format!("Malformed chat reply: {e}")))?;

        reply
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| NewsycleError::LlmError("Chat reply had no choices".to_string()))
    }
}

// ============================================================================
// Ollama chat
// ============================================================================

/// Client for a local Ollama server's chat endpoint
pub struct OllamaClient {
    http: Client,
    base_url: String,
    model: String,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    stream: bool,
    format: &'static str,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: ReplyMessage,
}

impl OllamaClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            http: build_http_client(config.timeout_secs)?,
            base_url: config.ollama_url.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/chat", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn complete(&self, prompt: &ChatPrompt) -> Result<String> {
        let request = OllamaChatRequest {
            model: &self.model,
            messages: prompt.messages(),
            stream: false,
            format: "json",
            options: OllamaOptions {
                temperature: self.temperature,
            },
        };

        let response = self
            .http
            .post(self.endpoint())
            .json(&request)
            .send()
            .await
            .map_err(|e| NewsycleError::LlmError(format!("Ollama request failed: {e}")))?;

        let reply: OllamaChatResponse = ensure_success(response, "Ollama")
            .await?
            .json()
            .await
            .map_err(|e| NewsycleError::LlmError(format!("Malformed Ollama reply: {e}")))?;

        Ok(reply.message.content)
    }
}

/// Chat client for a remote provider; `Local` has none
pub fn create_llm_client(config: &LlmConfig) -> Result<Box<dyn LlmClient>> {
    match config.provider {
        LlmProvider::OpenAI | LlmProvider::Azure => {
            Ok(Box::new(OpenAiClient::from_config(config)?))
        }
        LlmProvider::Ollama => Ok(Box::new(OllamaClient::from_config(config)?)),
        LlmProvider::Local => Err(NewsycleError::ConfigError(
            "The local provider has no chat model".to_string(),
        )),
    }
}
