//! Vocabulary retrieval seam and the glue that folds lookups into prompts.
//!
//! The actual store (vector database, embeddings) lives outside this crate
//! and plugs in through [`VocabularyRetriever`].

use anyhow::Result;
use async_trait::async_trait;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::classifier::VOCABULARY_KEYWORDS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum JlptLevel {
    N1,
    N2,
    N3,
    N4,
    N5,
}

impl JlptLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            JlptLevel::N1 => "N1",
            JlptLevel::N2 => "N2",
            JlptLevel::N3 => "N3",
            JlptLevel::N4 => "N4",
            JlptLevel::N5 => "N5",
        }
    }
}

impl fmt::Display for JlptLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JlptLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "N1" => Ok(JlptLevel::N1),
            "N2" => Ok(JlptLevel::N2),
            "N3" => Ok(JlptLevel::N3),
            "N4" => Ok(JlptLevel::N4),
            "N5" => Ok(JlptLevel::N5),
            other => anyhow::bail!("Unknown JLPT level: {}", other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabularyEntry {
    pub original: String,
    pub furigana: String,
    pub english: String,
    pub jlpt_level: JlptLevel,
    #[serde(default)]
    pub similarity_score: f32,
}

impl VocabularyEntry {
    pub fn new(original: &str, furigana: &str, english: &str, jlpt_level: JlptLevel) -> Self {
        Self {
            original: original.to_string(),
            furigana: furigana.to_string(),
            english: english.to_string(),
            jlpt_level,
            similarity_score: 0.0,
        }
    }
}

#[async_trait]
pub trait VocabularyRetriever: Send + Sync {
    /// Entries matching `query`, best match first.
    async fn search(
        &self,
        query: &str,
        limit: usize,
        level_filter: Option<&[JlptLevel]>,
    ) -> Result<Vec<VocabularyEntry>>;

    async fn by_level(&self, _level: JlptLevel, _limit: usize) -> Result<Vec<VocabularyEntry>> {
        Ok(Vec::new())
    }

    async fn random(&self, _level: Option<JlptLevel>, _count: usize) -> Result<Vec<VocabularyEntry>> {
        Ok(Vec::new())
    }

    /// Entry count per level.
    async fn level_statistics(&self) -> Result<BTreeMap<JlptLevel, usize>> {
        Ok(BTreeMap::new())
    }
}

/// Small in-process vocabulary with lexical scoring.
#[derive(Debug, Clone, Default)]
pub struct InMemoryVocabulary {
    entries: Vec<VocabularyEntry>,
}

impl InMemoryVocabulary {
    pub fn new(entries: Vec<VocabularyEntry>) -> Self {
        Self { entries }
    }

    /// A starter set of common words, mostly N5 and N4.
    pub fn with_starter_set() -> Self {
        use JlptLevel::*;
        let entries = [
            ("水", "みず", "water", N5),
            ("雨", "あめ", "rain", N5),
            ("猫", "ねこ", "cat", N5),
            ("犬", "いぬ", "dog", N5),
            ("本", "ほん", "book", N5),
            ("学生", "がくせい", "student", N5),
            ("先生", "せんせい", "teacher", N5),
            ("食べる", "たべる", "to eat", N5),
            ("飲む", "のむ", "to drink", N5),
            ("天気", "てんき", "weather", N5),
            ("友達", "ともだち", "friend", N5),
            ("駅", "えき", "station", N5),
            ("病院", "びょういん", "hospital", N4),
            ("会議", "かいぎ", "meeting, conference", N4),
            ("経験", "けいけん", "experience", N4),
            ("季節", "きせつ", "season", N4),
            ("約束", "やくそく", "promise, appointment", N4),
            ("環境", "かんきょう", "environment", N3),
            ("努力", "どりょく", "effort", N3),
        ]
        .iter()
        .map(|(original, furigana, english, level)| {
            VocabularyEntry::new(original, furigana, english, *level)
        })
        .collect();

        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn score(entry: &VocabularyEntry, query: &str) -> f32 {
        let query_lower = query.to_lowercase();
        let english = entry.english.to_lowercase();

        if entry.original == query || entry.furigana == query || english == query_lower {
            return 1.0;
        }
        if entry.original.contains(query) || query.contains(entry.original.as_str()) {
            return 0.8;
        }
        if english.contains(&query_lower) || entry.furigana.contains(query) {
            return 0.6;
        }

        let terms: Vec<&str> = query_lower.split_whitespace().collect();
        if terms.len() > 1 {
            let hits = terms
                .iter()
                .filter(|t| entry.original.contains(**t) || english.contains(**t))
                .count();
            return 0.5 * hits as f32 / terms.len() as f32;
        }
        0.0
    }
}

#[async_trait]
impl VocabularyRetriever for InMemoryVocabulary {
    async fn search(
        &self,
        query: &str,
        limit: usize,
        level_filter: Option<&[JlptLevel]>,
    ) -> Result<Vec<VocabularyEntry>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<VocabularyEntry> = self
            .entries
            .iter()
            .filter(|e| level_filter.map_or(true, |levels| levels.contains(&e.jlpt_level)))
            .filter_map(|e| {
                let score = Self::score(e, query);
                (score > 0.0).then(|| VocabularyEntry {
                    similarity_score: score,
                    ..e.clone()
                })
            })
            .collect();

        scored.sort_by(|a, b| b.similarity_score.total_cmp(&a.similarity_score));
        scored.truncate(limit);
        Ok(scored)
    }

    async fn by_level(&self, level: JlptLevel, limit: usize) -> Result<Vec<VocabularyEntry>> {
        Ok(self
            .entries
            .iter()
            .filter(|e| e.jlpt_level == level)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn random(&self, level: Option<JlptLevel>, count: usize) -> Result<Vec<VocabularyEntry>> {
        let pool: Vec<&VocabularyEntry> = self
            .entries
            .iter()
            .filter(|e| level.map_or(true, |l| e.jlpt_level == l))
            .collect();
        let mut rng = rand::thread_rng();
        Ok(pool
            .choose_multiple(&mut rng, count)
            .map(|e| (*e).clone())
            .collect())
    }

    async fn level_statistics(&self) -> Result<BTreeMap<JlptLevel, usize>> {
        let mut counts = BTreeMap::new();
        for entry in &self.entries {
            *counts.entry(entry.jlpt_level).or_insert(0) += 1;
        }
        Ok(counts)
    }
}

/// Whether a message looks like a vocabulary / JLPT lookup.
pub fn has_vocabulary_intent(message: &str) -> bool {
    let lower = message.to_lowercase();
    VOCABULARY_KEYWORDS.iter().any(|k| lower.contains(k))
}

const STOP_WORDS: &[&str] = &[
    "what", "is", "the", "meaning", "of", "does", "mean", "how", "to", "say", "jlpt", "vocabulary",
    "word",
];

/// Crude keyword extractor: non-ASCII tokens win, otherwise the first few words.
pub fn extract_search_query(message: &str) -> String {
    let words: Vec<&str> = message
        .split_whitespace()
        .filter(|w| !STOP_WORDS.contains(&w.to_lowercase().as_str()) && w.chars().count() > 1)
        .collect();

    let japanese: Vec<&str> = words.iter().copied().filter(|w| !w.is_ascii()).collect();
    if !japanese.is_empty() {
        return japanese.into_iter().take(2).collect::<Vec<_>>().join(" ");
    }
    words.into_iter().take(3).collect::<Vec<_>>().join(" ")
}

/// Most entries a single prompt ever embeds.
pub const MAX_EMBEDDED_ENTRIES: usize = 3;

/// Looks up vocabulary for a message and folds the hits into the prompt.
#[derive(Clone)]
pub struct RetrievalAugmenter {
    retriever: Option<Arc<dyn VocabularyRetriever>>,
    limit: usize,
    max_embedded: usize,
}

impl RetrievalAugmenter {
    pub fn new(retriever: Arc<dyn VocabularyRetriever>) -> Self {
        Self {
            retriever: Some(retriever),
            limit: 5,
            max_embedded: MAX_EMBEDDED_ENTRIES,
        }
    }

    /// An augmenter with no store behind it; every lookup is empty.
    pub fn disabled() -> Self {
        Self {
            retriever: None,
            limit: 5,
            max_embedded: MAX_EMBEDDED_ENTRIES,
        }
    }

    /// Overrides how many entries are fetched and how many reach the prompt.
    /// The prompt never carries more than [`MAX_EMBEDDED_ENTRIES`].
    pub fn with_limits(mut self, limit: usize, max_embedded: usize) -> Self {
        self.limit = limit;
        self.max_embedded = max_embedded.min(MAX_EMBEDDED_ENTRIES);
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.retriever.is_some()
    }

    pub fn retriever(&self) -> Option<&Arc<dyn VocabularyRetriever>> {
        self.retriever.as_ref()
    }

    /// Runs the retriever when the message has vocabulary intent. Never fails.
    pub async fn lookup(&self, message: &str) -> Vec<VocabularyEntry> {
        let Some(retriever) = &self.retriever else {
            return Vec::new();
        };
        if !has_vocabulary_intent(message) {
            return Vec::new();
        }

        let query = extract_search_query(message);
        if query.is_empty() {
            return Vec::new();
        }

        match retriever.search(&query, self.limit, None).await {
            Ok(entries) => {
                tracing::info!(query = %query, matches = entries.len(), "Vocabulary lookup");
                entries
            }
            Err(e) => {
                tracing::warn!(query = %query, error = %e, "Vocabulary search failed");
                Vec::new()
            }
        }
    }

    pub fn augment_prompt(&self, message: &str, entries: &[VocabularyEntry]) -> String {
        if entries.is_empty() {
            return message.to_string();
        }

        let mut vocab_context = String::from("JLPT Vocabulary Context:\n");
        for (i, entry) in entries.iter().take(self.max_embedded).enumerate() {
            vocab_context.push_str(&format!(
                "{}. {} ({}) - {} [JLPT {}]\n",
                i + 1,
                entry.original,
                entry.furigana,
                entry.english,
                entry.jlpt_level
            ));
        }

        format!(
            "User query: {}\n\n{}\n\
             Please provide a helpful response incorporating the relevant JLPT vocabulary \
             information above. If the user is asking about specific vocabulary, explain the \
             words with their readings, meanings, and JLPT levels.",
            message, vocab_context
        )
    }
}

impl Default for RetrievalAugmenter {
    fn default() -> Self {
        Self::disabled()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    pub text: String,
    pub source: String,
    pub target: String,
}

/// Best-effort extraction of what to translate from a free-form message.
///
/// "translate ..." is checked before "what does ... mean"; anything else is
/// translated whole.
pub fn parse_translation_request(content: &str, has_japanese_analysis: bool) -> TranslationRequest {
    // ASCII lowercasing keeps byte offsets aligned with `content`.
    let lower = content.to_ascii_lowercase();

    let target = if lower.contains("translate to japanese") || lower.contains("in japanese") {
        "ja"
    } else {
        "en"
    };

    let mut text = content.to_string();

    if lower.contains("translate") {
        if let Some((_, rest)) = content.split_once("translate") {
            let mut part = rest.trim();
            let target_prefix = format!("to {}:", target);
            for prefix in [target_prefix.as_str(), "to japanese:", "to english:", ":"] {
                let matches = part
                    .get(..prefix.len())
                    .map_or(false, |head| head.eq_ignore_ascii_case(prefix));
                if matches {
                    part = part[prefix.len()..].trim();
                    break;
                }
            }
            if !part.is_empty() {
                text = part.to_string();
            }
        }
    } else if lower.contains("what does") && lower.contains("mean") {
        let start = lower.find("what does").map(|i| i + "what does".len());
        let end = lower.find("mean");
        if let (Some(start), Some(end)) = (start, end) {
            if start < end {
                text = content[start..end].trim().to_string();
            }
        }
    }

    TranslationRequest {
        text,
        source: if has_japanese_analysis { "ja" } else { "auto" }.to_string(),
        target: target.to_string(),
    }
}
