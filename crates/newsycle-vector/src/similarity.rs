//! Cosine similarity between outlets

use std::sync::Arc;

use ndarray::Array1;
use serde::Serialize;
use tracing::debug;

use crate::EmbeddingClient;
use newsycle_core::{NewsycleError, Outlet, Result};
use newsycle_extractor::{EntityAnalysis, FrequencyTable};

/// Calculate cosine similarity between two embeddings
///
/// Formula: cos(θ) = (A · B) / (||A|| ||B||)
///
/// A zero vector on either side yields 0.0. Vectors of different length are
/// a validation error.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f64> {
    if a.len() != b.len() {
        return Err(NewsycleError::ValidationError(format!(
            "Embeddings must have same dimension (got {} and {})",
            a.len(),
            b.len()
        )));
    }

    let a: Array1<f64> = a.iter().map(|&x| x as f64).collect();
    let b: Array1<f64> = b.iter().map(|&x| x as f64).collect();

    let dot_product = a.dot(&b);
    let norm_a = a.dot(&a).sqrt();
    let norm_b = b.dot(&b).sqrt();

    // Avoid division by zero
    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    Ok((dot_product / (norm_a * norm_b)).clamp(-1.0, 1.0))
}

/// The `n` most frequent entity texts joined by single spaces
pub fn entity_blob(table: &FrequencyTable, n: usize) -> String {
    table
        .top(n)
        .iter()
        .map(|e| e.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Square matrix of outlet similarities
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarityMatrix {
    outlets: Vec<Outlet>,
    values: Vec<Vec<f64>>,
}

impl SimilarityMatrix {
    pub fn outlets(&self) -> &[Outlet] {
        &self.outlets
    }

    pub fn len(&self) -> usize {
        self.outlets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outlets.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.values.get(row).and_then(|r| r.get(col)).copied()
    }

    pub fn row(&self, row: usize) -> Option<&[f64]> {
        self.values.get(row).map(Vec::as_slice)
    }

    pub fn min(&self) -> Option<f64> {
        self.values.iter().flatten().copied().reduce(f64::min)
    }

    pub fn max(&self) -> Option<f64> {
        self.values.iter().flatten().copied().reduce(f64::max)
    }

    /// `(x, y, value)` for every ordered pair, row-major in outlet order
    pub fn cells(&self) -> impl Iterator<Item = (&Outlet, &Outlet, f64)> + '_ {
        self.outlets.iter().enumerate().flat_map(move |(i, x)| {
            self.outlets
                .iter()
                .enumerate()
                .map(move |(j, y)| (x, y, self.values[i][j]))
        })
    }
}

/// Embeds entity blobs and scores outlets against each other
#[derive(Clone)]
pub struct SimilarityEstimator {
    embedder: Arc<dyn EmbeddingClient>,
    top_n: usize,
}

impl SimilarityEstimator {
    pub fn new(embedder: Arc<dyn EmbeddingClient>, top_n: usize) -> Self {
        Self { embedder, top_n }
    }

    pub fn top_n(&self) -> usize {
        self.top_n
    }

    /// Embed blobs in one batch call; empty blobs become zero vectors
    /// without reaching the provider
    async fn embed_blobs(&self, blobs: &[String]) -> Result<Vec<Vec<f32>>> {
        let non_empty: Vec<String> = blobs.iter().filter(|b| !b.is_empty()).cloned().collect();

        let embedded = if non_empty.is_empty() {
            Vec::new()
        } else {
            self.embedder.embed_batch(&non_empty).await?
        };

        if embedded.len() != non_empty.len() {
            return Err(NewsycleError::EmbeddingError(format!(
                "Expected {} embeddings, got {}",
                non_empty.len(),
                embedded.len()
            )));
        }

        let dimension = embedded
            .first()
            .map(Vec::len)
            .unwrap_or_else(|| self.embedder.dimension());
        let mut embedded = embedded.into_iter();

        Ok(blobs
            .iter()
            .map(|blob| {
                if blob.is_empty() {
                    vec![0.0; dimension]
                } else {
                    embedded.next().unwrap_or_else(|| vec![0.0; dimension])
                }
            })
            .collect())
    }

    /// Similarity of two outlets' top entities
    pub async fn similarity(&self, a: &EntityAnalysis, b: &EntityAnalysis) -> Result<f64> {
        let blobs = [
            entity_blob(a.combined(), self.top_n),
            entity_blob(b.combined(), self.top_n),
        ];
        let vectors = self.embed_blobs(&blobs).await?;
        cosine_similarity(&vectors[0], &vectors[1])
    }

    /// Similarity of every ordered pair of outlets, self pairs included
    pub async fn matrix(&self, analyses: &[EntityAnalysis]) -> Result<SimilarityMatrix> {
        let blobs: Vec<String> = analyses
            .iter()
            .map(|a| entity_blob(a.combined(), self.top_n))
            .collect();
        let vectors = self.embed_blobs(&blobs).await?;

        let mut values = vec![vec![0.0; vectors.len()]; vectors.len()];
        for i in 0..vectors.len() {
            for j in i..vectors.len() {
                let score = cosine_similarity(&vectors[i], &vectors[j])?;
                values[i][j] = score;
                values[j][i] = score;
            }
        }

        debug!(outlets = analyses.len(), "Computed similarity matrix");

        Ok(SimilarityMatrix {
            outlets: analyses.iter().map(|a| a.outlet().clone()).collect(),
            values,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HashingEmbedding;
    use async_trait::async_trait;
    use newsycle_core::{EntityLabel, EntityRecord};
    use newsycle_extractor::Stopwords;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn analysis(outlet: &str, texts: &[&str]) -> EntityAnalysis {
        EntityAnalysis::from_records(
            Outlet::from(outlet),
            texts.iter().map(|t| EntityRecord::new(*t, EntityLabel::Org)),
            &Stopwords::default(),
        )
    }

    fn estimator() -> SimilarityEstimator {
        SimilarityEstimator::new(Arc::new(HashingEmbedding::new(128)), 10)
    }

    /// Counts provider calls and texts
    struct CountingEmbedding {
        inner: HashingEmbedding,
        calls: AtomicUsize,
        texts: AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingClient for CountingEmbedding {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.texts.fetch_add(texts.len(), Ordering::SeqCst);
            self.inner.embed_batch(texts).await
        }

        fn dimension(&self) -> usize {
            self.inner.dimension()
        }
    }

    #[test]
    fn test_cosine_similarity() {
        let a = [1.0, 0.0, 0.0];
        let b = [0.0, 1.0, 0.0];
        let c = [2.0, 0.0, 0.0];

        assert!((cosine_similarity(&a, &b).unwrap()).abs() < 1e-9);
        assert!((cosine_similarity(&a, &c).unwrap() - 1.0).abs() < 1e-9);
        assert_eq!(cosine_similarity(&a, &[0.0; 3]).unwrap(), 0.0);
    }

    #[test]
    fn test_cosine_dimension_mismatch() {
        assert!(matches!(
            cosine_similarity(&[1.0, 2.0], &[1.0]),
            Err(NewsycleError::ValidationError(_))
        ));
    }

    #[test]
    fn test_entity_blob() {
        let table = FrequencyTable::from_mentions(["NATO", "Brussels", "NATO", "Hamas"]);
        assert_eq!(entity_blob(&table, 10), "NATO Brussels Hamas");
        assert_eq!(entity_blob(&table, 2), "NATO Brussels");
        assert_eq!(entity_blob(&FrequencyTable::default(), 10), "");
    }

    #[tokio::test]
    async fn test_matrix_embeds_each_outlet_once() {
        let embedder = Arc::new(CountingEmbedding {
            inner: HashingEmbedding::new(64),
            calls: AtomicUsize::new(0),
            texts: AtomicUsize::new(0),
        });
        let estimator = SimilarityEstimator::new(embedder.clone(), 10);
        let analyses = vec![
            analysis("cnn", &["NATO", "Brussels"]),
            analysis("fox-news", &["Hamas"]),
            analysis("breitbart-news", &[]),
        ];

        let matrix = estimator.matrix(&analyses).await.unwrap();

        assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
        assert_eq!(embedder.texts.load(Ordering::SeqCst), 2);
        assert_eq!(matrix.len(), 3);
        assert!((matrix.get(0, 0).unwrap() - 1.0).abs() < 1e-6);
        // Empty outlet compares as zero to everything, itself included
        assert_eq!(matrix.row(2).unwrap(), &[0.0, 0.0, 0.0]);
    }

    #[tokio::test]
    async fn test_similarity_identical_outlets() {
        let a = analysis("cnn", &["NATO", "Brussels"]);
        let b = analysis("the-new-york-times", &["NATO", "Brussels"]);

        let score = estimator().similarity(&a, &b).await.unwrap();
        assert!((score - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_matrix_cells_row_major() {
        let analyses = vec![analysis("a", &["NATO"]), analysis("b", &["Hamas"])];
        let matrix = estimator().matrix(&analyses).await.unwrap();

        let cells: Vec<(&str, &str)> = matrix.cells().map(|(x, y, _)| (x.id(), y.id())).collect();
        assert_eq!(cells, vec![("a", "a"), ("a", "b"), ("b", "a"), ("b", "b")]);
        assert!(matrix.min().unwrap() <= matrix.max().unwrap());
    }

    const POOL: [&str; 6] = ["NATO", "Brussels", "Hamas", "Joe Biden", "Congress", "Gaza"];

    fn outlet_texts() -> impl Strategy<Value = Vec<Vec<&'static str>>> {
        prop::collection::vec(prop::collection::vec(prop::sample::select(POOL.to_vec()), 0..8), 1..5)
    }

    proptest! {
        #[test]
        fn prop_matrix_symmetric_with_self_maximum(texts in outlet_texts()) {
            let analyses: Vec<EntityAnalysis> = texts
                .iter()
                .enumerate()
                .map(|(i, t)| analysis(&format!("outlet-{i}"), t))
                .collect();

            let matrix = tokio_test::block_on(estimator().matrix(&analyses)).unwrap();

            for i in 0..matrix.len() {
                for j in 0..matrix.len() {
                    let ij = matrix.get(i, j).unwrap();
                    prop_assert_eq!(ij, matrix.get(j, i).unwrap());
                    prop_assert!(matrix.get(i, i).unwrap() >= ij - 1e-9);
                }
            }
        }
    }
}
