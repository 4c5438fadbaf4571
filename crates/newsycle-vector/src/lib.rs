//! Newsycle Vector - Embeddings and similarity
//!
//! Turns each outlet's most frequent entities into a text blob, embeds the
//! blobs and compares them with cosine similarity.

pub mod embedding;
pub mod similarity;

pub use embedding::{
    create_embedding_client, EmbeddingClient, HashingEmbedding, OllamaEmbedding, OpenAiEmbedding,
};
pub use similarity::{cosine_similarity, entity_blob, SimilarityEstimator, SimilarityMatrix};
