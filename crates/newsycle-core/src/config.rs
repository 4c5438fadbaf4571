//! Newsycle Configuration Management
//!
//! Handles configuration from environment variables and TOML files
//! with sensible defaults for development. Secrets (API keys) are only
//! ever read from configuration, never hard-coded in request logic.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::{Outlet, DEFAULT_OUTLETS, DEFAULT_STOPWORDS};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// News search API configuration
    pub news: NewsConfig,

    /// Entity aggregation and chart settings
    pub analysis: AnalysisConfig,

    /// Model provider configuration
    pub llm: LlmConfig,

    /// Entity recognizer settings
    pub ner: NerConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Defaults overlaid with whichever environment variables are set
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_override()
    }

    /// Parse a TOML file; missing sections and keys keep their defaults
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|source| {
            ConfigError::FileReadError {
                path: path.clone(),
                source,
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load from `NEWSYCLE_CONFIG` if set, else from the environment alone
    pub fn load() -> Result<Self, ConfigError> {
        match env_var("NEWSYCLE_CONFIG") {
            Some(path) => Self::from_file(path)?.with_env_override(),
            None => Self::from_env(),
        }
    }

    /// Let every environment variable that is set win over the current value
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        self.apply_env()?;
        self.validate()?;
        Ok(self)
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Some(host) = env_var("API_HOST") {
            self.server.host = host;
        }
        if let Some(port) = parse_env("API_PORT")? {
            self.server.port = port;
        }
        if let Some(origins) = env_var("CORS_ORIGINS") {
            self.server.cors_origins = parse_list(&origins);
        }

        if let Some(key) = env_var("NEWS_API_KEY") {
            self.news.api_key = Some(key);
        }
        if let Some(url) = env_var("NEWS_API_URL") {
            self.news.base_url = url;
        }
        if let Some(outlets) = env_var("NEWSYCLE_OUTLETS") {
            self.news.outlets = parse_list(&outlets).into_iter().map(Outlet::new).collect();
        }

        if let Some(provider) = parse_env("LLM_PROVIDER")? {
            self.llm.provider = provider;
        }
        if let Some(key) = env_var("OPENAI_API_KEY") {
            self.llm.openai_api_key = Some(key);
        }
        if let Some(url) = env_var("OLLAMA_URL") {
            self.llm.ollama_url = url;
        }
        if let Some(model) = env_var("LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(model) = env_var("EMBEDDING_MODEL") {
            self.llm.embedding_model = model;
        }
        if let Some(dimension) = parse_env("EMBEDDING_DIMENSION")? {
            self.llm.embedding_dimension = dimension;
        }

        if let Some(path) = env_var("NER_GAZETTEER") {
            self.ner.gazetteer_path = Some(PathBuf::from(path));
        }

        if let Some(level) = env_var("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(json) = env_var("LOG_JSON") {
            self.logging.json_format = matches!(json.as_str(), "1" | "true" | "yes");
        }

        Ok(())
    }

    /// Reject settings no report could be built from
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.news.outlets.is_empty() {
            return Err(ConfigError::MissingRequired("news.outlets".to_string()));
        }
        let positive = [
            ("analysis.top_n", self.analysis.top_n),
            ("analysis.grid_columns", self.analysis.grid_columns),
        ];
        for (key, value) in positive {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    env_var(key)
        .map(|raw| {
            raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw,
            })
        })
        .transpose()
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// Allowed origins for CORS
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout_secs: 300,
            // Empty by default - set via CORS_ORIGINS env var
            cors_origins: vec![],
        }
    }
}

/// News search API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsConfig {
    /// Base URL of the news search service
    pub base_url: String,

    /// API key, supplied through NEWS_API_KEY
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Article language filter
    pub language: String,

    /// Articles requested per outlet (capped at 100)
    pub page_size: u32,

    /// Outbound request timeout in seconds
    pub timeout_secs: u64,

    /// Outlets to compare
    pub outlets: Vec<Outlet>,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://newsapi.org/v2".to_string(),
            api_key: None,
            language: "en".to_string(),
            page_size: 100,
            timeout_secs: 30,
            outlets: DEFAULT_OUTLETS.iter().map(|id| Outlet::new(*id)).collect(),
        }
    }
}

/// Aggregation and chart settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Entity texts excluded before aggregation (exact match)
    pub stopwords: Vec<String>,

    /// Entities per bar chart and per similarity blob
    pub top_n: usize,

    /// Amount subtracted from the smallest similarity for the heatmap color floor
    pub heatmap_low_offset: f64,

    /// Bar charts per grid row
    pub grid_columns: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            stopwords: DEFAULT_STOPWORDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            top_n: 10,
            heatmap_low_offset: 0.2,
            grid_columns: 2,
        }
    }
}

/// Model provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider for entity recognition and embeddings
    pub provider: LlmProvider,

    /// OpenAI API key
    #[serde(skip_serializing)]
    pub openai_api_key: Option<String>,

    /// OpenAI API base URL (for Azure or compatible APIs)
    pub openai_base_url: Option<String>,

    /// Ollama server URL
    pub ollama_url: String,

    /// Chat model used for entity recognition
    pub model: String,

    /// Embedding model name
    pub embedding_model: String,

    /// Vector length requested from remote embedding providers
    pub embedding_dimension: usize,

    /// Maximum tokens for completion
    pub max_tokens: u32,

    /// Temperature for generation
    pub temperature: f32,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Dimension of the in-process hashed embeddings
    pub local_dimension: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Local,
            openai_api_key: None,
            openai_base_url: None,
            ollama_url: "http://localhost:11434".to_string(),
            model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            embedding_dimension: 1536,
            max_tokens: 2048,
            temperature: 0.0,
            timeout_secs: 60,
            local_dimension: 300,
        }
    }
}

/// Supported model providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// In-process gazetteer NER and hashed embeddings
    Local,
    OpenAI,
    Ollama,
    Azure,
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Local => "local",
            Self::OpenAI => "openai",
            Self::Ollama => "ollama",
            Self::Azure => "azure",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "openai" => Ok(Self::OpenAI),
            "ollama" => Ok(Self::Ollama),
            "azure" => Ok(Self::Azure),
            other => Err(ConfigError::InvalidValue {
                key: "llm.provider".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Entity recognizer settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct NerConfig {
    /// Extra gazetteer entries (TOML) merged into the built-in dictionary
    pub gazetteer_path: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,

    /// Include file/line in logs
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            include_location: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

impl From<ConfigError> for crate::NewsycleError {
    fn from(err: ConfigError) -> Self {
        crate::NewsycleError::ConfigError(err.to_string())
    }
}
