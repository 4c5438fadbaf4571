//! Text embedding backends
//!
//! The similarity estimator only ever needs batch embedding, so that is the
//! one required method; single-text embedding is layered on top.
//!
//! Author: hephaex@gmail.com

use async_trait::async_trait;
use newsycle_core::{LlmConfig, LlmProvider, NewsycleError, Result};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Produces one fixed-length vector per input text
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Embed `texts`, returning vectors in input order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Length of the vectors this client produces
    fn dimension(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| NewsycleError::EmbeddingError("No embedding returned".to_string()))
    }
}

fn build_http_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| NewsycleError::ConfigError(format!("Failed to build HTTP client: {e}")))
}

async fn ensure_success(response: Response, provider: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(NewsycleError::EmbeddingError(format!(
        "{provider} embedding returned {status}: {body}"
    )))
}

fn check_count(expected: usize, got: usize) -> Result<()> {
    if expected != got {
        return Err(NewsycleError::EmbeddingError(format!(
            "Expected {expected} embeddings, got {got}"
        )));
    }
    Ok(())
}

// ============================================================================
// Hashing Embedding
// ============================================================================

/// In-process bag-of-words embedding
///
/// Each lowercased token is hashed into a few signed buckets and the document
/// vector is the mean of its token vectors, so texts sharing tokens point in
/// similar directions. Deterministic across runs and platforms.
#[derive(Debug, Clone)]
pub struct HashingEmbedding {
    dimension: usize,
}

/// Buckets touched per token
const HASH_PROBES: u64 = 4;

impl HashingEmbedding {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
        text.split_whitespace()
            .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
            .filter(|t| !t.is_empty())
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        let mut count = 0usize;

        for token in Self::tokens(text) {
            let seed = fnv1a(token.as_bytes());
            for probe in 0..HASH_PROBES {
                let h = splitmix64(seed.wrapping_add(probe));
                let bucket = (h % self.dimension as u64) as usize;
                let sign = if h >> 63 == 0 { 1.0 } else { -1.0 };
                vector[bucket] += sign;
            }
            count += 1;
        }

        if count > 0 {
            let scale = 1.0 / count as f32;
            vector.iter_mut().for_each(|v| *v *= scale);
        }
        vector
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325, |hash, &b| {
        (hash ^ b as u64).wrapping_mul(0x0100_0000_01b3)
    })
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9e37_79b9_7f4a_7c15);
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^ (x >> 31)
}

#[async_trait]
impl EmbeddingClient for HashingEmbedding {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

// ============================================================================
// OpenAI-compatible embeddings
// ============================================================================

/// `/embeddings` client for OpenAI and Azure-style endpoints
pub struct OpenAiEmbedding {
    http: Client,
    api_key: String,
    base_url: String,
    model: String,
    dimension: usize,
}

#[derive(Debug, Serialize)]
struct OpenAiEmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    dimensions: usize,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbeddingResponse {
    data: Vec<OpenAiEmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiEmbedding {
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let api_key = config.openai_api_key.clone().ok_or_else(|| {
            NewsycleError::ConfigError(format!(
                "llm.openai_api_key is required for {} embeddings",
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
            model: config.embedding_model.clone(),
            dimension: config.embedding_dimension,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/embeddings", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl EmbeddingClient for OpenAiEmbedding {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = OpenAiEmbeddingRequest {
            model: &self.model,
            input: texts,
            dimensions: self.dimension,
        };

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| NewsycleError::EmbeddingError(format!("Embedding request failed: {e}")))?;

        let reply: OpenAiEmbeddingResponse = ensure_success(response, "OpenAI")
            .await?
            .json()
            .await
            .map_err(|e| NewsycleError::EmbeddingError(format!("Malformed embedding reply: {e}")))?;

        // Items may arrive out of input order
        let mut items = reply.data;
        items.sort_by_key(|item| item.index);
        check_count(texts.len(), items.len())?;

        Ok(items.into_iter().map(|item| item.embedding).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

// ============================================================================
// Ollama embeddings
// ============================================================================

/// Client for a local Ollama server's batch `/api/embed` endpoint
pub struct OllamaEmbedding {
    http: Client,
    base_url: String,
    model: String,
    dimension: usize,
}

#[derive(Debug, Serialize)]
struct OllamaEmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl OllamaEmbedding {
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            http: build_http_client(config.timeout_secs)?,
            base_url: config.ollama_url.clone(),
            model: config.embedding_model.clone(),
            dimension: config.embedding_dimension,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/embed", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl EmbeddingClient for OllamaEmbedding {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = OllamaEmbedRequest {
            model: &self.model,
            input: texts,
        };

        let response = self
            .http
            .post(self.endpoint())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                NewsycleError::EmbeddingError(format!("Ollama embedding request failed: {e}"))
            })?;

        let reply: OllamaEmbedResponse = ensure_success(response, "Ollama")
            .await?
            .json()
            .await
            .map_err(|e| NewsycleError::EmbeddingError(format!("Malformed Ollama reply: {e}")))?;

        check_count(texts.len(), reply.embeddings.len())?;
        Ok(reply.embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Create the embedding client selected by the model provider
pub fn create_embedding_client(config: &LlmConfig) -> Result<Arc<dyn EmbeddingClient>> {
    match config.provider {
        LlmProvider::Local => Ok(Arc::new(HashingEmbedding::new(config.local_dimension))),
        LlmProvider::OpenAI | LlmProvider::Azure => {
            Ok(Arc::new(OpenAiEmbedding::from_config(config)?))
        }
        LlmProvider::Ollama => Ok(Arc::new(OllamaEmbedding::from_config(config)?)),
    }
}
