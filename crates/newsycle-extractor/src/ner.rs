//! Named Entity Recognition (NER) module
//!
//! Provides two recognizers over the nine tracked labels:
//! - Gazetteer: dictionary of known news entities + regex patterns, in process
//! - LLM-based: a chat model asked for a JSON entity list
//!
//! Surface text is kept exactly as written; no case folding or synonym
//! merging happens here.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;

use crate::llm::{ChatPrompt, LlmClient};
use crate::{EntityExtractor, ExtractedEntity};
use newsycle_core::{EntityLabel, NewsycleError, Result};

// ============================================================================
// Built-in dictionary
// ============================================================================

use newsycle_core::EntityLabel::{Event, Fac, Gpe, Loc, Norp, Org, Person, Product, WorkOfArt};

/// (term, label, aliases) triples covering entities common in US news
const DEFAULT_GAZETTEER: &[(&str, EntityLabel, &[&str])] = &[
    // People
    ("Joe Biden", Person, &["Biden"]),
    ("Donald Trump", Person, &["Trump"]),
    ("Kamala Harris", Person, &["Harris"]),
    ("Vladimir Putin", Person, &["Putin"]),
    ("Volodymyr Zelensky", Person, &["Zelensky", "Zelenskyy"]),
    ("Xi Jinping", Person, &[]),
    ("Emmanuel Macron", Person, &["Macron"]),
    ("Benjamin Netanyahu", Person, &["Netanyahu"]),
    ("Elon Musk", Person, &["Musk"]),
    ("Nancy Pelosi", Person, &["Pelosi"]),
    ("Kevin McCarthy", Person, &["McCarthy"]),
    ("Mitch McConnell", Person, &["McConnell"]),
    ("Chuck Schumer", Person, &["Schumer"]),
    ("Ron DeSantis", Person, &["DeSantis"]),
    ("Barack Obama", Person, &["Obama"]),
    // Geopolitical entities
    ("the United States", Gpe, &["United States", "U.S.", "US", "America"]),
    ("Washington", Gpe, &[]),
    ("New York", Gpe, &["New York City"]),
    ("California", Gpe, &[]),
    ("Texas", Gpe, &[]),
    ("Florida", Gpe, &[]),
    ("Brussels", Gpe, &[]),
    ("London", Gpe, &[]),
    ("Paris", Gpe, &[]),
    ("Berlin", Gpe, &[]),
    ("Moscow", Gpe, &[]),
    ("Beijing", Gpe, &[]),
    ("Kyiv", Gpe, &["Kiev"]),
    ("Ukraine", Gpe, &[]),
    ("Russia", Gpe, &[]),
    ("China", Gpe, &[]),
    ("Israel", Gpe, &[]),
    ("Gaza", Gpe, &[]),
    ("Iran", Gpe, &[]),
    ("North Korea", Gpe, &[]),
    ("Mexico", Gpe, &[]),
    ("Canada", Gpe, &[]),
    ("Germany", Gpe, &[]),
    ("France", Gpe, &[]),
    ("Britain", Gpe, &["the United Kingdom", "U.K.", "UK"]),
    ("Japan", Gpe, &[]),
    ("India", Gpe, &[]),
    // Nationalities, religious and political groups
    ("American", Norp, &["Americans"]),
    ("Republicans", Norp, &["Republican", "GOP"]),
    ("Democrats", Norp, &["Democrat", "Democratic"]),
    ("Russian", Norp, &["Russians"]),
    ("Ukrainian", Norp, &["Ukrainians"]),
    ("Chinese", Norp, &[]),
    ("Israeli", Norp, &["Israelis"]),
    ("Palestinian", Norp, &["Palestinians"]),
    ("European", Norp, &["Europeans"]),
    ("British", Norp, &[]),
    ("Muslim", Norp, &["Muslims"]),
    ("Christian", Norp, &["Christians"]),
    // Facilities
    ("the White House", Fac, &["White House"]),
    ("the Capitol", Fac, &["Capitol Hill"]),
    ("the Kremlin", Fac, &["Kremlin"]),
    ("JFK Airport", Fac, &[]),
    ("Golden Gate Bridge", Fac, &[]),
    // Organizations
    ("NATO", Org, &[]),
    ("the United Nations", Org, &["United Nations", "UN", "U.N."]),
    ("the European Union", Org, &["European Union", "EU"]),
    ("Congress", Org, &[]),
    ("Senate", Org, &[]),
    ("House", Org, &[]),
    ("the Supreme Court", Org, &["Supreme Court"]),
    ("the Pentagon", Org, &["Pentagon"]),
    ("FBI", Org, &[]),
    ("CIA", Org, &[]),
    ("the Federal Reserve", Org, &["Federal Reserve", "Fed"]),
    ("the Justice Department", Org, &["Justice Department", "DOJ"]),
    ("Hamas", Org, &[]),
    ("Hezbollah", Org, &[]),
    ("Apple", Org, &[]),
    ("Google", Org, &[]),
    ("Microsoft", Org, &[]),
    ("Amazon", Org, &[]),
    ("Tesla", Org, &[]),
    ("Meta", Org, &["Facebook"]),
    ("Twitter", Org, &[]),
    ("OpenAI", Org, &[]),
    ("CNN", Org, &[]),
    ("Fox News", Org, &[]),
    ("The New York Times", Org, &["New York Times", "the Times"]),
    ("The Washington Post", Org, &["Washington Post"]),
    ("The Wall Street Journal", Org, &["Wall Street Journal"]),
    // Locations
    ("Europe", Loc, &[]),
    ("Asia", Loc, &[]),
    ("Africa", Loc, &[]),
    ("Latin America", Loc, &[]),
    ("the Middle East", Loc, &["Middle East"]),
    ("the Gulf Coast", Loc, &["Gulf Coast"]),
    ("the West Bank", Loc, &["West Bank"]),
    ("the Pacific", Loc, &["Pacific"]),
    ("the Atlantic", Loc, &["Atlantic"]),
    ("Wall Street", Loc, &[]),
    // Products
    ("iPhone", Product, &[]),
    ("ChatGPT", Product, &[]),
    ("Windows", Product, &[]),
    ("Boeing 737 Max", Product, &["737 Max"]),
    // Events
    ("World War II", Event, &["World War Two", "the Second World War"]),
    ("the World Cup", Event, &["World Cup"]),
    ("the Olympics", Event, &["Olympics"]),
    ("the Super Bowl", Event, &["Super Bowl"]),
    ("Thanksgiving", Event, &[]),
    ("Christmas", Event, &[]),
    // Works of art
    ("the Bible", WorkOfArt, &["Bible"]),
    ("Saturday Night Live", WorkOfArt, &["SNL"]),
];

const TERM_CONFIDENCE: f32 = 0.95;
const ALIAS_CONFIDENCE: f32 = 0.9;

// ============================================================================
// Gazetteer NER
// ============================================================================

/// Dictionary entry for entity matching
#[derive(Debug, Clone, Deserialize)]
pub struct DictionaryEntry {
    pub term: String,
    pub label: EntityLabel,
    #[serde(default)]
    pub aliases: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GazetteerFile {
    #[serde(default)]
    entries: Vec<DictionaryEntry>,
}

/// Rule-based NER using a gazetteer and regex patterns
///
/// Matching is case-sensitive and whole-word, so the pronoun "us" never
/// matches the entry "US".
pub struct GazetteerNer {
    /// Pattern rules (regex -> label)
    patterns: Vec<(Regex, EntityLabel, f32)>,
    /// Dictionary of known terms
    dictionary: HashMap<String, DictionaryEntry>,
}

impl GazetteerNer {
    /// Create a new recognizer with the built-in dictionary and patterns
    pub fn new() -> Self {
        let mut ner = Self::empty();
        ner.init_patterns();
        for (term, label, aliases) in DEFAULT_GAZETTEER {
            ner.add_term(term, *label, aliases.to_vec());
        }
        ner
    }

    /// Create a recognizer with no rules at all
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
            dictionary: HashMap::new(),
        }
    }

    /// Initialize regex patterns
    fn init_patterns(&mut self) {
        // Capitalized names ending in an institutional noun
        self.add_pattern(
            r"\b(?:[A-Z][A-Za-z&'-]*\s+){1,4}(?:Inc|Corp|Ltd|LLC|Corporation|Company|Group|Bank|University|Institute|Agency|Party|Ministry|Department|Committee|Commission|Council)\b",
            Org,
            0.8,
        );
        // Named storms and numbered wars
        self.add_pattern(r"\bHurricane\s+[A-Z][a-z]+\b", Event, 0.9);
        self.add_pattern(r"\bWorld War (?:I|II|One|Two)\b", Event, 0.9);
        // Named tournaments and summits
        self.add_pattern(
            r"\b(?:[A-Z][A-Za-z0-9'-]*\s+){1,3}(?:Summit|Games|Championship|Open|Festival|Marathon)\b",
            Event,
            0.75,
        );
    }

    /// Add a regex pattern
    pub fn add_pattern(&mut self, pattern: &str, label: EntityLabel, confidence: f32) {
        match Regex::new(pattern) {
            Ok(regex) => self.patterns.push((regex, label, confidence)),
            Err(e) => tracing::warn!(%pattern, error = %e, "Skipping invalid NER pattern"),
        }
    }

    /// Add a dictionary term
    pub fn add_term(&mut self, term: &str, label: EntityLabel, aliases: Vec<&str>) {
        let entry = DictionaryEntry {
            term: term.to_string(),
            label,
            aliases: aliases.iter().map(|s| s.to_string()).collect(),
        };
        self.dictionary.insert(term.to_string(), entry);
    }

    /// Merge entries from a TOML gazetteer file
    ///
    /// ```toml
    /// [[entries]]
    /// term = "Kyiv"
    /// label = "GPE"
    /// aliases = ["Kiev"]
    /// ```
    pub fn load_gazetteer(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            NewsycleError::ConfigError(format!("Failed to read gazetteer {}: {e}", path.display()))
        })?;
        let file: GazetteerFile = toml::from_str(&content).map_err(|e| {
            NewsycleError::ConfigError(format!("Failed to parse gazetteer {}: {e}", path.display()))
        })?;

        let count = file.entries.len();
        for entry in file.entries {
            self.dictionary.insert(entry.term.clone(), entry);
        }
        tracing::info!(path = %path.display(), count, "Loaded gazetteer entries");
        Ok(count)
    }

    /// Number of dictionary terms (aliases not counted)
    pub fn term_count(&self) -> usize {
        self.dictionary.len()
    }

    /// Extract entities using pattern matching
    fn extract_by_patterns(&self, text: &str) -> Vec<ExtractedEntity> {
        let mut entities = Vec::new();

        for (regex, label, confidence) in &self.patterns {
            for mat in regex.find_iter(text) {
                // Sentence-initial "The" is not part of the name
                let (start, matched) = match mat.as_str().strip_prefix("The ") {
                    Some(rest) => (mat.end() - rest.len(), rest),
                    None => (mat.start(), mat.as_str()),
                };
                entities.push(ExtractedEntity {
                    text: matched.to_string(),
                    label: *label,
                    start,
                    end: mat.end(),
                    confidence: *confidence,
                });
            }
        }

        entities
    }

    /// Extract entities using dictionary lookup
    fn extract_by_dictionary(&self, text: &str) -> Vec<ExtractedEntity> {
        let mut entities = Vec::new();

        for entry in self.dictionary.values() {
            let forms = std::iter::once((entry.term.as_str(), TERM_CONFIDENCE)).chain(
                entry
                    .aliases
                    .iter()
                    .map(|alias| (alias.as_str(), ALIAS_CONFIDENCE)),
            );

            for (form, confidence) in forms {
                if form.is_empty() {
                    continue;
                }
                for (start, matched) in text.match_indices(form) {
                    let end = start + matched.len();
                    if is_word_boundary(text, start, end) {
                        entities.push(ExtractedEntity {
                            text: matched.to_string(),
                            label: entry.label,
                            start,
                            end,
                            confidence,
                        });
                    }
                }
            }
        }

        entities
    }

    /// Remove overlapping entities, keeping the longest then most confident span
    fn deduplicate(&self, mut entities: Vec<ExtractedEntity>) -> Vec<ExtractedEntity> {
        entities.sort_by(|a, b| {
            a.start
                .cmp(&b.start)
                .then((b.end - b.start).cmp(&(a.end - a.start)))
                .then(b.confidence.total_cmp(&a.confidence))
        });

        let mut result: Vec<ExtractedEntity> = Vec::new();
        let mut covered_until = 0;

        for entity in entities {
            // Sorted by start, so overlap means starting inside a kept span
            if result.is_empty() || entity.start >= covered_until {
                covered_until = entity.end;
                result.push(entity);
            }
        }

        result
    }
}

/// The match is not glued to a neighbouring letter or digit
fn is_word_boundary(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
}

impl Default for GazetteerNer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EntityExtractor for GazetteerNer {
    async fn extract(&self, text: &str) -> Result<Vec<ExtractedEntity>> {
        let mut entities = self.extract_by_patterns(text);
        entities.extend(self.extract_by_dictionary(text));
        Ok(self.deduplicate(entities))
    }
}

// ============================================================================
// LLM-based NER
// ============================================================================

/// Configuration for LLM-based NER
#[derive(Debug, Clone)]
pub struct LlmNerConfig {
    /// System prompt for entity extraction
    pub system_prompt: String,
    /// Labels the model may assign
    pub labels: Vec<EntityLabel>,
}

impl Default for LlmNerConfig {
    fn default() -> Self {
        Self {
            system_prompt: include_str!("prompts/ner_system.txt").to_string(),
            labels: EntityLabel::ALL.to_vec(),
        }
    }
}

/// LLM-based NER extractor
pub struct LlmNer {
    client: Arc<dyn LlmClient>,
    pub config: LlmNerConfig,
}

/// Entity structure for LLM JSON output
#[derive(Debug, Deserialize)]
struct LlmEntity {
    text: String,
    #[serde(alias = "entity_type", alias = "type")]
    label: String,
    confidence: Option<f32>,
}

impl LlmNer {
    /// Create a new LLM NER with default config
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self {
            client,
            config: LlmNerConfig::default(),
        }
    }

    /// Create with custom config
    pub fn with_config(client: Arc<dyn LlmClient>, config: LlmNerConfig) -> Self {
        Self { client, config }
    }

    /// Build the extraction prompt
    pub fn build_prompt(&self, text: &str) -> ChatPrompt {
        let labels: Vec<&str> = self.config.labels.iter().map(|l| l.as_str()).collect();

        ChatPrompt {
            system: format!(
                "{}\n\nAllowed labels: {}",
                self.config.system_prompt.trim_end(),
                labels.join(", ")
            ),
            user: text.to_string(),
        }
    }

    /// Parse LLM response into entities
    ///
    /// Entities with an untracked label, or whose text does not occur in the
    /// original, are dropped. Repeated texts map to successive occurrences.
    pub fn parse_response(&self, response: &str, original_text: &str) -> Vec<ExtractedEntity> {
        let entities = parse_llm_entities(response);
        let mut next_offset: HashMap<String, usize> = HashMap::new();

        entities
            .into_iter()
            .filter_map(|e| {
                let Some(label) = EntityLabel::from_label(&e.label) else {
                    tracing::debug!(label = %e.label, text = %e.text, "Dropping untracked label");
                    return None;
                };
                if !self.config.labels.contains(&label) || e.text.is_empty() {
                    return None;
                }

                let from = next_offset.get(&e.text).copied().unwrap_or(0);
                let start = from + original_text.get(from..)?.find(&e.text)?;
                let end = start + e.text.len();
                next_offset.insert(e.text.clone(), end);

                Some(ExtractedEntity {
                    text: e.text,
                    label,
                    start,
                    end,
                    confidence: e.confidence.unwrap_or(0.8),
                })
            })
            .collect()
    }
}

/// Pull the entity array out of a model reply
///
/// Accepts a bare array, an object with an `entities` array, or either
/// wrapped in prose or code fences.
fn parse_llm_entities(response: &str) -> Vec<LlmEntity> {
    #[derive(Deserialize)]
    struct Wrapped {
        entities: Vec<LlmEntity>,
    }

    if let Ok(entities) = serde_json::from_str::<Vec<LlmEntity>>(response.trim()) {
        return entities;
    }
    if let Ok(wrapped) = serde_json::from_str::<Wrapped>(response.trim()) {
        return wrapped.entities;
    }

    let array = match (response.find('['), response.rfind(']')) {
        (Some(start), Some(end)) if start < end => &response[start..=end],
        _ => {
            tracing::warn!("LLM response contained no entity array");
            return Vec::new();
        }
    };

    serde_json::from_str(array).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to parse LLM entity array");
        Vec::new()
    })
}

#[async_trait]
impl EntityExtractor for LlmNer {
    async fn extract(&self, text: &str) -> Result<Vec<ExtractedEntity>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let response = self.client.complete(&self.build_prompt(text)).await?;
        let mut entities = self.parse_response(&response, text);
        entities.sort_by_key(|e| e.start);
        Ok(entities)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn texts(entities: &[ExtractedEntity]) -> Vec<&str> {
        entities.iter().map(|e| e.text.as_str()).collect()
    }

    #[tokio::test]
    async fn test_gazetteer_nato_brussels() {
        let ner = GazetteerNer::new();

        let entities = ner
            .extract("The president met with NATO officials in Brussels.")
            .await
            .unwrap();

        assert_eq!(texts(&entities), vec!["NATO", "Brussels"]);
        assert_eq!(entities[0].label, EntityLabel::Org);
        assert_eq!(entities[1].label, EntityLabel::Gpe);
        assert!(entities.iter().all(|e| e.text != "president"));
    }

    #[tokio::test]
    async fn test_gazetteer_prefers_longest_span() {
        let ner = GazetteerNer::new();

        let entities = ner
            .extract("Officials in the United States and the White House responded.")
            .await
            .unwrap();

        assert_eq!(texts(&entities), vec!["the United States", "the White House"]);
        assert_eq!(entities[1].label, EntityLabel::Fac);
    }

    #[tokio::test]
    async fn test_gazetteer_is_case_sensitive_and_whole_word() {
        let ner = GazetteerNer::new();

        let entities = ner
            .extract("Let us talk about USB chargers and the house.")
            .await
            .unwrap();

        assert!(entities.is_empty(), "unexpected: {:?}", texts(&entities));
    }

    #[tokio::test]
    async fn test_gazetteer_patterns() {
        let ner = GazetteerNer::new();

        let entities = ner
            .extract("The Acme Widget Corporation braced for Hurricane Ian.")
            .await
            .unwrap();

        let found: Vec<(&str, EntityLabel)> =
            entities.iter().map(|e| (e.text.as_str(), e.label)).collect();
        assert!(found.contains(&("Acme Widget Corporation", EntityLabel::Org)));
        assert!(found.contains(&("Hurricane Ian", EntityLabel::Event)));
    }

    #[tokio::test]
    async fn test_load_gazetteer() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[[entries]]
term = "Newsycle Labs"
label = "ORG"

[[entries]]
term = "Moby-Dick"
label = "WORK_OF_ART"
aliases = ["Moby Dick"]
"#
        )
        .unwrap();

        let mut ner = GazetteerNer::empty();
        assert_eq!(ner.load_gazetteer(file.path()).unwrap(), 2);
        assert_eq!(ner.term_count(), 2);

        let entities = ner
            .extract("Newsycle Labs is reading Moby Dick.")
            .await
            .unwrap();
        assert_eq!(texts(&entities), vec!["Newsycle Labs", "Moby Dick"]);
        assert_eq!(entities[1].label, EntityLabel::WorkOfArt);
    }

    #[test]
    fn test_load_gazetteer_rejects_unknown_label() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[[entries]]\nterm = \"Monday\"\nlabel = \"DATE\"").unwrap();

        let mut ner = GazetteerNer::empty();
        assert!(ner.load_gazetteer(file.path()).is_err());
    }

    struct CannedLlm(String);

    #[async_trait]
    impl LlmClient for CannedLlm {
        async fn complete(&self, _prompt: &ChatPrompt) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    fn llm_ner(reply: &str) -> LlmNer {
        LlmNer::new(Arc::new(CannedLlm(reply.to_string())))
    }

    #[test]
    fn test_llm_ner_prompt() {
        let ner = llm_ner("[]");
        let prompt = ner.build_prompt("NATO extended support.");

        assert!(prompt.system.ends_with("EVENT, WORK_OF_ART"));
        assert_eq!(prompt.user, "NATO extended support.");
    }

    #[tokio::test]
    async fn test_llm_ner_filters_labels_and_locates_spans() {
        let ner = llm_ner(
            r#"Sure! ```json
[{"text": "NATO", "label": "ORG"},
 {"text": "Tuesday", "label": "DATE"},
 {"text": "NATO", "label": "ORG"},
 {"text": "Atlantis", "label": "GPE"}]
```"#,
        );

        let text = "NATO said Tuesday that NATO would stay.";
        let entities = ner.extract(text).await.unwrap();

        assert_eq!(texts(&entities), vec!["NATO", "NATO"]);
        assert_eq!(entities[0].start, 0);
        assert_eq!(entities[1].start, 23);
        assert!(entities.iter().all(|e| e.label == EntityLabel::Org));
    }

    #[tokio::test]
    async fn test_llm_ner_accepts_wrapped_object() {
        let ner = llm_ner(r#"{"entities": [{"text": "Brussels", "type": "GPE"}]}"#);

        let entities = ner.extract("Talks in Brussels.").await.unwrap();
        assert_eq!(texts(&entities), vec!["Brussels"]);
        assert_eq!(entities[0].label, EntityLabel::Gpe);
    }

    #[tokio::test]
    async fn test_llm_ner_garbage_reply_is_empty() {
        let ner = llm_ner("I cannot help with that.");
        assert!(ner.extract("NATO").await.unwrap().is_empty());
    }
}
