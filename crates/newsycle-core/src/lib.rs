//! Newsycle Core - Domain models, errors, and shared types
//!
//! This crate defines the abstractions shared by every Newsycle crate:
//! - Media outlets and report dates
//! - The nine named-entity labels and entity records
//! - Common error types
//! - Configuration management

pub mod config;

pub use config::{
    AnalysisConfig, AppConfig, ConfigError, LlmConfig, LlmProvider, LoggingConfig, NerConfig,
    NewsConfig, ServerConfig,
};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for Newsycle operations
#[derive(Error, Debug)]
pub enum NewsycleError {
    #[error("Fetch error: {0}")]
    FetchError(String),

    #[error("Extraction error: {0}")]
    ExtractionError(String),

    #[error("Embedding error: {0}")]
    EmbeddingError(String),

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, NewsycleError>;

// ============================================================================
// Outlets and dates
// ============================================================================

/// A media outlet, identified by its news-search source id (e.g. `cnn`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Outlet(String);

impl Outlet {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Outlet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Outlet {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Outlets analysed when no configuration overrides them
pub const DEFAULT_OUTLETS: [&str; 6] = [
    "the-new-york-times",
    "the-washington-post",
    "cnn",
    "fox-news",
    "breitbart-news",
    "the-wall-street-journal",
];

/// Entity texts dropped before aggregation when nothing else is configured
pub const DEFAULT_STOPWORDS: [&str; 5] = ["America", "U.S.", "the United States", "US", "American"];

/// Date format accepted from forms and query strings
pub const REPORT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a `YYYY-MM-DD` report date
///
/// A blank value means "no date supplied" and yields `Ok(None)`, letting the
/// caller fall back to today.
pub fn parse_report_date(raw: &str) -> Result<Option<NaiveDate>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    NaiveDate::parse_from_str(trimmed, REPORT_DATE_FORMAT)
        .map(Some)
        .map_err(|e| NewsycleError::ValidationError(format!("Invalid date '{trimmed}': {e}")))
}

// ============================================================================
// Entity labels
// ============================================================================

/// The nine entity categories tracked per outlet
///
/// Labels outside this set (dates, numbers, ...) are discarded by the
/// recognizers, so every entity record carries exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityLabel {
    /// People, including fictional
    Person,
    /// Countries, cities, states
    Gpe,
    /// Nationalities, religious or political groups
    Norp,
    /// Buildings, airports, highways, bridges
    Fac,
    /// Companies, agencies, institutions
    Org,
    /// Non-GPE locations, mountain ranges, bodies of water
    Loc,
    /// Objects, vehicles, foods (not services)
    Product,
    /// Named hurricanes, battles, wars, sports events
    Event,
    /// Titles of books, songs, shows
    WorkOfArt,
}

impl EntityLabel {
    /// All labels in aggregation order
    pub const ALL: [EntityLabel; 9] = [
        Self::Person,
        Self::Gpe,
        Self::Norp,
        Self::Fac,
        Self::Org,
        Self::Loc,
        Self::Product,
        Self::Event,
        Self::WorkOfArt,
    ];

    /// Number of labels
    pub const COUNT: usize = Self::ALL.len();

    /// Position of this label in [`EntityLabel::ALL`]
    pub fn index(self) -> usize {
        match self {
            Self::Person => 0,
            Self::Gpe => 1,
            Self::Norp => 2,
            Self::Fac => 3,
            Self::Org => 4,
            Self::Loc => 5,
            Self::Product => 6,
            Self::Event => 7,
            Self::WorkOfArt => 8,
        }
    }

    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Person => "PERSON",
            Self::Gpe => "GPE",
            Self::Norp => "NORP",
            Self::Fac => "FAC",
            Self::Org => "ORG",
            Self::Loc => "LOC",
            Self::Product => "PRODUCT",
            Self::Event => "EVENT",
            Self::WorkOfArt => "WORK_OF_ART",
        }
    }

    /// Map a model label onto one of the nine categories
    ///
    /// Returns `None` for labels that are not tracked.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_uppercase().replace(['-', ' '], "_").as_str() {
            "PERSON" => Some(Self::Person),
            "GPE" => Some(Self::Gpe),
            "NORP" => Some(Self::Norp),
            "FAC" => Some(Self::Fac),
            "ORG" => Some(Self::Org),
            "LOC" => Some(Self::Loc),
            "PRODUCT" => Some(Self::Product),
            "EVENT" => Some(Self::Event),
            "WORK_OF_ART" => Some(Self::WorkOfArt),
            _ => None,
        }
    }
}

impl std::fmt::Display for EntityLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EntityLabel {
    type Err = NewsycleError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_label(s)
            .ok_or_else(|| NewsycleError::ValidationError(format!("Unknown entity label: {s}")))
    }
}

/// A single entity mention: its surface text and category
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRecord {
    pub text: String,
    pub label: EntityLabel,
}

impl EntityRecord {
    pub fn new(text: impl Into<String>, label: EntityLabel) -> Self {
        Self {
            text: text.into(),
            label,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_index_matches_order() {
        for (i, label) in EntityLabel::ALL.iter().enumerate() {
            assert_eq!(label.index(), i);
        }
    }

    #[test]
    fn test_label_round_trip_through_str() {
        for label in EntityLabel::ALL {
            assert_eq!(EntityLabel::from_label(label.as_str()), Some(label));
        }
        assert_eq!(EntityLabel::from_label("work of art"), Some(EntityLabel::WorkOfArt));
        assert_eq!(EntityLabel::from_label("DATE"), None);
        assert!("CARDINAL".parse::<EntityLabel>().is_err());
    }

    #[test]
    fn test_label_serde_uses_model_names() {
        let json = serde_json::to_string(&EntityLabel::WorkOfArt).unwrap();
        assert_eq!(json, "\"WORK_OF_ART\"");
        let label: EntityLabel = serde_json::from_str("\"GPE\"").unwrap();
        assert_eq!(label, EntityLabel::Gpe);
    }

    #[test]
    fn test_parse_report_date() {
        let date = parse_report_date("2023-01-01").unwrap().unwrap();
        assert_eq!(date.to_string(), "2023-01-01");
        assert!(parse_report_date("  ").unwrap().is_none());
        assert!(matches!(
            parse_report_date("01/02/2023"),
            Err(NewsycleError::ValidationError(_))
        ));
    }

    #[test]
    fn test_outlet_display() {
        let outlet = Outlet::from("cnn");
        assert_eq!(outlet.to_string(), "cnn");
        assert_eq!(outlet.id(), "cnn");
        assert_eq!(serde_json::to_string(&outlet).unwrap(), "\"cnn\"");
    }
}
