//! Newsycle Fetcher - Article descriptions per outlet and date
//!
//! Wraps the news-search service behind the [`ArticleSource`] trait so the
//! report pipeline can run against the live API or an in-memory source.

use async_trait::async_trait;
use chrono::NaiveDate;
use newsycle_core::{Outlet, Result};
use std::collections::HashMap;

pub mod newsapi;

pub use newsapi::NewsApiClient;

/// Trait for article sources
#[async_trait]
pub trait ArticleSource: Send + Sync {
    /// Fetch the article descriptions an outlet published on `date`
    ///
    /// Articles without a description are dropped; the returned list never
    /// contains placeholders for them.
    async fn fetch_descriptions(&self, outlet: &Outlet, date: NaiveDate) -> Result<Vec<String>>;
}

/// Fixed, in-memory article source
///
/// Serves the same descriptions for every date. Used by the CLI's offline
/// mode and by tests.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    articles: HashMap<Outlet, Vec<Option<String>>>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the raw descriptions for an outlet (`None` = missing)
    pub fn with_outlet(
        mut self,
        outlet: impl Into<Outlet>,
        descriptions: Vec<Option<String>>,
    ) -> Self {
        self.articles.insert(outlet.into(), descriptions);
        self
    }
}

#[async_trait]
impl ArticleSource for StaticSource {
    async fn fetch_descriptions(&self, outlet: &Outlet, _date: NaiveDate) -> Result<Vec<String>> {
        let raw = self.articles.get(outlet).cloned().unwrap_or_default();
        Ok(raw.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_source_drops_missing() {
        let source = StaticSource::new().with_outlet(
            "cnn",
            vec![Some("first".to_string()), None, Some("second".to_string())],
        );
        let date = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();

        let descriptions = source
            .fetch_descriptions(&Outlet::from("cnn"), date)
            .await
            .unwrap();
        assert_eq!(descriptions, vec!["first", "second"]);

        let unknown = source
            .fetch_descriptions(&Outlet::from("bbc-news"), date)
            .await
            .unwrap();
        assert!(unknown.is_empty());
    }
}
