//! Per-outlet entity aggregation
//!
//! Routes recognized entities into one mention list per label and derives
//! the frequency tables the charts and similarity scores are built from.

use std::collections::{HashMap, HashSet};

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::EntityExtractor;
pub use newsycle_core::DEFAULT_STOPWORDS;
use newsycle_core::{AnalysisConfig, EntityLabel, EntityRecord, Outlet, Result};

// ============================================================================
// Stopwords
// ============================================================================

/// Exact-match filter over entity surface text
#[derive(Debug, Clone)]
pub struct Stopwords {
    words: HashSet<String>,
}

impl Stopwords {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            words: words.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(config.stopwords.iter().cloned())
    }

    /// Case-sensitive: "us" is not the stopword "US"
    pub fn contains(&self, text: &str) -> bool {
        self.words.contains(text)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl Default for Stopwords {
    fn default() -> Self {
        Self::new(DEFAULT_STOPWORDS)
    }
}

// ============================================================================
// Frequency table
// ============================================================================

/// One row of a frequency table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyEntry {
    pub text: String,
    pub count: usize,
}

/// Entity text counts, most frequent first
///
/// Ties keep the order in which texts first appeared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrequencyTable {
    entries: Vec<FrequencyEntry>,
}

impl FrequencyTable {
    /// Count mentions, preserving first-appearance order among equal counts
    pub fn from_mentions<'a, I>(mentions: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut entries: Vec<FrequencyEntry> = Vec::new();
        let mut positions: HashMap<&'a str, usize> = HashMap::new();

        for text in mentions {
            match positions.get(text) {
                Some(&pos) => entries[pos].count += 1,
                None => {
                    positions.insert(text, entries.len());
                    entries.push(FrequencyEntry {
                        text: text.to_string(),
                        count: 1,
                    });
                }
            }
        }

        // sort_by is stable
        entries.sort_by(|a, b| b.count.cmp(&a.count));
        Self { entries }
    }

    /// The `n` most frequent rows, or all of them when fewer exist
    pub fn top(&self, n: usize) -> &[FrequencyEntry] {
        &self.entries[..n.min(self.entries.len())]
    }

    pub fn get(&self, text: &str) -> Option<usize> {
        self.entries
            .iter()
            .find(|e| e.text == text)
            .map(|e| e.count)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all counts
    pub fn total(&self) -> usize {
        self.entries.iter().map(|e| e.count).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FrequencyEntry> {
        self.entries.iter()
    }
}

// ============================================================================
// Entity analysis
// ============================================================================

/// Entity mentions and distributions for one outlet on one day
///
/// Built once from entity records; every table is derived from the mention
/// lists at construction and cannot drift from them afterwards.
#[derive(Debug, Clone)]
pub struct EntityAnalysis {
    outlet: Outlet,
    mentions: [Vec<String>; EntityLabel::COUNT],
    per_label: [FrequencyTable; EntityLabel::COUNT],
    combined: FrequencyTable,
}

impl EntityAnalysis {
    pub fn from_records<I>(outlet: Outlet, records: I, stopwords: &Stopwords) -> Self
    where
        I: IntoIterator<Item = EntityRecord>,
    {
        let mut mentions: [Vec<String>; EntityLabel::COUNT] = std::array::from_fn(|_| Vec::new());

        for record in records {
            if stopwords.contains(&record.text) {
                continue;
            }
            mentions[record.label.index()].push(record.text);
        }

        let per_label = std::array::from_fn(|i| {
            FrequencyTable::from_mentions(mentions[i].iter().map(String::as_str))
        });
        let combined =
            FrequencyTable::from_mentions(mentions.iter().flatten().map(String::as_str));

        Self {
            outlet,
            mentions,
            per_label,
            combined,
        }
    }

    pub fn outlet(&self) -> &Outlet {
        &self.outlet
    }

    /// Raw mentions of one label, duplicates kept, in text order
    pub fn mentions(&self, label: EntityLabel) -> &[String] {
        &self.mentions[label.index()]
    }

    pub fn per_label(&self, label: EntityLabel) -> &FrequencyTable {
        &self.per_label[label.index()]
    }

    /// Distribution over all nine labels merged by text
    pub fn combined(&self) -> &FrequencyTable {
        &self.combined
    }

    pub fn mention_count(&self) -> usize {
        self.mentions.iter().map(Vec::len).sum()
    }
}

struct ByLabel<'a>(&'a [FrequencyTable; EntityLabel::COUNT]);

impl Serialize for ByLabel<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(
            EntityLabel::ALL
                .iter()
                .map(|label| (label.as_str(), &self.0[label.index()])),
        )
    }
}

impl Serialize for EntityAnalysis {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("EntityAnalysis", 4)?;
        state.serialize_field("outlet", &self.outlet)?;
        state.serialize_field("mention_count", &self.mention_count())?;
        state.serialize_field("labels", &ByLabel(&self.per_label))?;
        state.serialize_field("combined", &self.combined)?;
        state.end()
    }
}

/// Recognize entities in an outlet's descriptions and aggregate them
pub async fn analyze_outlet(
    extractor: &dyn EntityExtractor,
    outlet: Outlet,
    descriptions: &[String],
    stopwords: &Stopwords,
) -> Result<EntityAnalysis> {
    let extracted = extractor.extract_batch(descriptions).await?;
    let records = extracted
        .into_iter()
        .flatten()
        .map(|entity| entity.into_record());

    let analysis = EntityAnalysis::from_records(outlet, records, stopwords);
    tracing::debug!(
        outlet = %analysis.outlet(),
        descriptions = descriptions.len(),
        mentions = analysis.mention_count(),
        distinct = analysis.combined().len(),
        "Aggregated entities"
    );
    Ok(analysis)
}

// ============================================================================
// Tests
// ============================================================================
