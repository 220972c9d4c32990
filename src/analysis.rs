//! Language-analysis adapter.
//!
//! The orchestration core only needs "string in, morpheme records out".
//! Real morphological analyzers plug in through [`TextAnalyzer`]; the
//! [`FallbackAnalyzer`] here segments by script and is good enough to feed
//! prompt context when nothing better is installed.

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Morpheme {
    pub surface: String,
    pub pos: String,
    pub base_form: String,
    pub reading: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KanjiInfo {
    pub character: char,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextAnalysis {
    pub original_text: String,
    pub tokens: Vec<Morpheme>,
    pub difficulty_level: String,
    pub kanji_info: Vec<KanjiInfo>,
    pub grammar_patterns: Vec<String>,
}

impl TextAnalysis {
    /// True when the text carries any kana or kanji.
    pub fn has_japanese(&self) -> bool {
        self.tokens
            .iter()
            .any(|t| matches!(t.pos.as_str(), "kanji" | "hiragana" | "katakana"))
    }

    /// Compact rendering handed to providers as prompt context.
    pub fn to_context(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.original_text.clone())
    }
}

#[async_trait]
pub trait TextAnalyzer: Send + Sync {
    async fn analyze(&self, text: &str) -> TextAnalysis;
}

lazy_static! {
    static ref SCRIPT_RUN: Regex = Regex::new(
        r"(?P<kanji>[\p{Han}々]+)|(?P<hiragana>[\p{Hiragana}]+)|(?P<katakana>[\p{Katakana}ー]+)|(?P<latin>[A-Za-z]+)|(?P<number>[0-9０-９]+)"
    )
    .expect("script regex is valid");
}

const PARTICLE_PATTERNS: &[(&str, &str)] = &[
    ("は", "topic particle は"),
    ("が", "subject particle が"),
    ("を", "object particle を"),
    ("に", "target particle に"),
    ("で", "location/means particle で"),
    ("と", "conjunction particle と"),
    ("も", "inclusive particle も"),
    ("の", "possessive particle の"),
    ("から", "from から"),
    ("まで", "until まで"),
    ("ます", "polite verb ending ます"),
    ("です", "copula です"),
];

const SCRIPT_GROUPS: &[&str] = &["kanji", "hiragana", "katakana", "latin", "number"];

/// Script-run segmenter used when no morphological analyzer is installed.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackAnalyzer;

impl FallbackAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze_sync(&self, text: &str) -> TextAnalysis {
        let mut tokens = Vec::new();
        for caps in SCRIPT_RUN.captures_iter(text) {
            for group in SCRIPT_GROUPS {
                if let Some(m) = caps.name(group) {
                    let surface = m.as_str().to_string();
                    let reading = if *group == "hiragana" || *group == "katakana" {
                        surface.clone()
                    } else {
                        String::new()
                    };
                    tokens.push(Morpheme {
                        base_form: surface.clone(),
                        surface,
                        pos: group.to_string(),
                        reading,
                    });
                    break;
                }
            }
        }

        let mut kanji_counts: BTreeMap<char, usize> = BTreeMap::new();
        let mut japanese_chars = 0usize;
        for c in text.chars() {
            if is_kanji(c) {
                *kanji_counts.entry(c).or_insert(0) += 1;
            }
            if is_kanji(c) || is_kana(c) {
                japanese_chars += 1;
            }
        }
        let kanji_total: usize = kanji_counts.values().sum();

        let difficulty_level = if kanji_total == 0 {
            "beginner"
        } else if (kanji_total as f64) <= 0.3 * japanese_chars as f64 {
            "intermediate"
        } else {
            "advanced"
        };

        let grammar_patterns = PARTICLE_PATTERNS
            .iter()
            .filter(|(marker, _)| text.contains(marker))
            .map(|(_, label)| label.to_string())
            .collect();

        TextAnalysis {
            original_text: text.to_string(),
            tokens,
            difficulty_level: difficulty_level.to_string(),
            kanji_info: kanji_counts
                .into_iter()
                .map(|(character, count)| KanjiInfo { character, count })
                .collect(),
            grammar_patterns,
        }
    }
}

#[async_trait]
impl TextAnalyzer for FallbackAnalyzer {
    async fn analyze(&self, text: &str) -> TextAnalysis {
        self.analyze_sync(text)
    }
}

pub fn is_hiragana(c: char) -> bool {
    ('\u{3040}'..='\u{309F}').contains(&c)
}

pub fn is_katakana(c: char) -> bool {
    ('\u{30A0}'..='\u{30FF}').contains(&c)
}

pub fn is_kana(c: char) -> bool {
    is_hiragana(c) || is_katakana(c)
}

pub fn is_kanji(c: char) -> bool {
    ('\u{4E00}'..='\u{9FFF}').contains(&c) || ('\u{3400}'..='\u{4DBF}').contains(&c)
}
