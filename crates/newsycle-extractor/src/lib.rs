//! Newsycle Extractor - Entity recognition and aggregation
//!
//! Implements Named Entity Recognition (NER) over article descriptions and
//! turns the recognized mentions into per-outlet frequency distributions.

use async_trait::async_trait;
use newsycle_core::{AppConfig, EntityLabel, EntityRecord, LlmProvider, Result};
use serde::Serialize;
use std::sync::Arc;

pub mod analysis;
pub mod llm;
pub mod ner;

pub use analysis::{analyze_outlet, EntityAnalysis, FrequencyTable, Stopwords};
pub use llm::{create_llm_client, ChatPrompt, LlmClient, OllamaClient, OpenAiClient};
pub use ner::{GazetteerNer, LlmNer};

/// Extracted entity from text
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedEntity {
    pub text: String,
    pub label: EntityLabel,
    pub start: usize,
    pub end: usize,
    pub confidence: f32,
}

impl ExtractedEntity {
    /// Drop span information, keeping what aggregation needs
    pub fn into_record(self) -> EntityRecord {
        EntityRecord::new(self.text, self.label)
    }
}

/// Trait for entity extractors
#[async_trait]
pub trait EntityExtractor: Send + Sync {
    /// Recognize the entities in one text, in text order
    async fn extract(&self, text: &str) -> Result<Vec<ExtractedEntity>>;

    /// Recognize the entities of many texts, one result per input
    async fn extract_batch(&self, texts: &[String]) -> Result<Vec<Vec<ExtractedEntity>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.extract(text).await?);
        }
        Ok(results)
    }
}

/// Create the entity extractor selected by the model provider
pub fn create_entity_extractor(config: &AppConfig) -> Result<Arc<dyn EntityExtractor>> {
    match config.llm.provider {
        LlmProvider::Local => {
            let mut ner = GazetteerNer::new();
            if let Some(path) = &config.ner.gazetteer_path {
                ner.load_gazetteer(path)?;
            }
            Ok(Arc::new(ner))
        }
        LlmProvider::OpenAI | LlmProvider::Azure | LlmProvider::Ollama => {
            let client = create_llm_client(&config.llm)?;
            Ok(Arc::new(LlmNer::new(Arc::from(client))))
        }
    }
}
