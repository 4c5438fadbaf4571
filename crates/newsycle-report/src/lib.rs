//! Newsycle Report - Daily outlet comparison
//!
//! Runs the full pipeline for one date: fetch each outlet's descriptions,
//! aggregate their entities, score outlet similarity and build the chart
//! specs the presenter renders.

pub mod charts;

pub use charts::{Bar, BarChartSpec, ChartGrid, HeatCell, HeatmapSpec, SPECTRAL10_REVERSED};

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, NaiveDate, Utc};
use futures::future::try_join_all;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use newsycle_core::{AnalysisConfig, AppConfig, Outlet, Result};
use newsycle_extractor::{
    analyze_outlet, create_entity_extractor, EntityAnalysis, EntityExtractor, Stopwords,
};
use newsycle_fetcher::ArticleSource;
use newsycle_vector::{create_embedding_client, EmbeddingClient, SimilarityEstimator, SimilarityMatrix};

/// Everything shown for one date
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub report_id: Uuid,
    pub date: NaiveDate,
    pub generated_at: DateTime<Utc>,
    pub analyses: Vec<EntityAnalysis>,
    pub similarity: SimilarityMatrix,
    pub grid: ChartGrid,
    pub heatmap: HeatmapSpec,
}

/// Builds reports; holds no per-request state
pub struct ReportAssembler {
    source: Arc<dyn ArticleSource>,
    extractor: Arc<dyn EntityExtractor>,
    estimator: SimilarityEstimator,
    stopwords: Stopwords,
    outlets: Vec<Outlet>,
    top_n: usize,
    heatmap_low_offset: f64,
    grid_columns: usize,
}

impl ReportAssembler {
    pub fn new(
        source: Arc<dyn ArticleSource>,
        extractor: Arc<dyn EntityExtractor>,
        embedder: Arc<dyn EmbeddingClient>,
        analysis: &AnalysisConfig,
        outlets: Vec<Outlet>,
    ) -> Self {
        Self {
            source,
            extractor,
            estimator: SimilarityEstimator::new(embedder, analysis.top_n),
            stopwords: Stopwords::from_config(analysis),
            outlets,
            top_n: analysis.top_n,
            heatmap_low_offset: analysis.heatmap_low_offset,
            grid_columns: analysis.grid_columns,
        }
    }

    /// Wire the recognizer and embedder selected by `config.llm.provider`
    pub fn from_config(config: &AppConfig, source: Arc<dyn ArticleSource>) -> Result<Self> {
        let extractor = create_entity_extractor(config)?;
        let embedder = create_embedding_client(&config.llm)?;

        Ok(Self::new(
            source,
            extractor,
            embedder,
            &config.analysis,
            config.news.outlets.clone(),
        ))
    }

    pub fn outlets(&self) -> &[Outlet] {
        &self.outlets
    }

    async fn analyze(&self, outlet: &Outlet, date: NaiveDate) -> Result<EntityAnalysis> {
        let descriptions = self.source.fetch_descriptions(outlet, date).await?;
        debug!(outlet = %outlet, count = descriptions.len(), "Descriptions fetched");

        analyze_outlet(
            self.extractor.as_ref(),
            outlet.clone(),
            &descriptions,
            &self.stopwords,
        )
        .await
    }

    /// Build the report for `date`
    ///
    /// Outlets are processed concurrently; the first failure aborts the
    /// whole report.
    pub async fn assemble(&self, date: NaiveDate) -> Result<Report> {
        let started = Instant::now();
        info!(%date, outlets = self.outlets.len(), "Assembling report");

        let analyses =
            try_join_all(self.outlets.iter().map(|outlet| self.analyze(outlet, date))).await?;

        let similarity = self.estimator.matrix(&analyses).await?;

        let charts = analyses
            .iter()
            .map(|analysis| BarChartSpec::from_analysis(analysis, self.top_n))
            .collect();
        let grid = ChartGrid::new(charts, self.grid_columns);
        let heatmap = HeatmapSpec::from_matrix(&similarity, date, self.heatmap_low_offset);

        let report = Report {
            report_id: Uuid::new_v4(),
            date,
            generated_at: Utc::now(),
            analyses,
            similarity,
            grid,
            heatmap,
        };

        info!(
            %date,
            report_id = %report.report_id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Report assembled"
        );
        Ok(report)
    }
}
