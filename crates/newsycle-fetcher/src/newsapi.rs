//! NewsAPI `everything` endpoint client
//!
//! Author: hephaex@gmail.com

use async_trait::async_trait;
use chrono::NaiveDate;
use newsycle_core::{NewsConfig, NewsycleError, Outlet, Result, REPORT_DATE_FORMAT};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::ArticleSource;

/// Upper bound the search service accepts for one page
pub const MAX_PAGE_SIZE: u32 = 100;

/// NewsAPI client
pub struct NewsApiClient {
    client: Client,
    base_url: String,
    api_key: String,
    language: String,
    page_size: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NewsApiResponse {
    status: String,
    #[serde(default)]
    articles: Vec<NewsApiArticle>,
    code: Option<String>,
    message: Option<String>,
}

/// Only the description is read; other article fields are ignored
#[derive(Debug, Deserialize)]
pub(crate) struct NewsApiArticle {
    description: Option<String>,
}

impl NewsApiClient {
    /// Create a new client
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            language: "en".to_string(),
            page_size: MAX_PAGE_SIZE,
        }
    }

    /// Create from config
    pub fn from_config(config: &NewsConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_ref()
            .ok_or_else(|| NewsycleError::ConfigError("NEWS_API_KEY required".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| NewsycleError::ConfigError(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_key: api_key.clone(),
            language: config.language.clone(),
            page_size: config.page_size,
        })
    }

    /// Set the article language filter
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Set the page size (capped at [`MAX_PAGE_SIZE`])
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/everything", self.base_url.trim_end_matches('/'))
    }

    /// Query parameters for one outlet and day
    pub fn query_params(&self, outlet: &Outlet, date: NaiveDate) -> Vec<(&'static str, String)> {
        let day = date.format(REPORT_DATE_FORMAT).to_string();
        vec![
            ("sources", outlet.id().to_string()),
            ("language", self.language.clone()),
            ("from", day.clone()),
            ("to", day),
            ("pageSize", self.page_size.min(MAX_PAGE_SIZE).to_string()),
        ]
    }
}

/// Parse a search response body into the present descriptions
pub(crate) fn parse_response(body: &str) -> Result<Vec<String>> {
    let response: NewsApiResponse = serde_json::from_str(body)
        .map_err(|e| NewsycleError::FetchError(format!("Failed to parse news response: {e}")))?;

    if response.status != "ok" {
        return Err(NewsycleError::FetchError(format!(
            "News API returned {}: {}",
            response.code.unwrap_or_else(|| response.status.clone()),
            response.message.unwrap_or_default()
        )));
    }

    Ok(descriptions(response.articles))
}

/// Keep the descriptions that are present, in article order
pub(crate) fn descriptions(articles: Vec<NewsApiArticle>) -> Vec<String> {
    articles.into_iter().filter_map(|a| a.description).collect()
}

#[async_trait]
impl ArticleSource for NewsApiClient {
    async fn fetch_descriptions(&self, outlet: &Outlet, date: NaiveDate) -> Result<Vec<String>> {
        tracing::debug!(outlet = %outlet, %date, "Fetching articles");

        let response = self
            .client
            .get(self.endpoint())
            .header("X-Api-Key", &self.api_key)
            .query(&self.query_params(outlet, date))
            .send()
            .await
            .map_err(|e| NewsycleError::FetchError(format!("News request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| NewsycleError::FetchError(format!("Failed to read news response: {e}")))?;

        if !status.is_success() {
            return Err(NewsycleError::FetchError(format!(
                "News API error for {outlet} ({status}): {body}"
            )));
        }

        let descriptions = parse_response(&body)?;
        tracing::debug!(outlet = %outlet, count = descriptions.len(), "Fetched descriptions");
        Ok(descriptions)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_params() {
        let client = NewsApiClient::new("https://newsapi.org/v2/", "key").with_page_size(500);
        let date = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let params = client.query_params(&Outlet::from("cnn"), date);

        assert!(params.contains(&("sources", "cnn".to_string())));
        assert!(params.contains(&("language", "en".to_string())));
        assert!(params.contains(&("from", "2023-01-01".to_string())));
        assert!(params.contains(&("to", "2023-01-01".to_string())));
        assert!(params.contains(&("pageSize", "100".to_string())));
        assert!(params.iter().all(|(_, v)| v != "key"));
        assert_eq!(client.endpoint(), "https://newsapi.org/v2/everything");
    }

    #[test]
    fn test_parse_response_drops_null_descriptions() {
        let body = r#"{
            "status": "ok",
            "totalResults": 3,
            "articles": [
                {"title": "a", "description": "NATO extended support."},
                {"title": "b", "description": null},
                {"title": "c"}
            ]
        }"#;

        let descriptions = parse_response(body).unwrap();
        assert_eq!(descriptions, vec!["NATO extended support."]);
    }

    #[test]
    fn test_parse_response_error_status() {
        let body = r#"{"status": "error", "code": "apiKeyInvalid", "message": "bad key"}"#;
        let err = parse_response(body).unwrap_err();
        assert!(err.to_string().contains("apiKeyInvalid"));
    }

    #[test]
    fn test_parse_response_malformed() {
        assert!(matches!(
            parse_response("<html>"),
            Err(NewsycleError::FetchError(_))
        ));
    }

    #[test]
    fn test_from_config_requires_key() {
        let config = NewsConfig::default();
        assert!(matches!(
            NewsApiClient::from_config(&config),
            Err(NewsycleError::ConfigError(_))
        ));

        let config = NewsConfig {
            api_key: Some("key".to_string()),
            ..NewsConfig::default()
        };
        assert!(NewsApiClient::from_config(&config).is_ok());
    }
}
