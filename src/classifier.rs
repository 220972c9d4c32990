use serde::{Deserialize, Serialize};
use std::fmt;

/// What kind of request a message represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskCategory {
    Chat,
    Translation,
    GrammarAnalysis,
    TextAnalysis,
    QuickResponse,
    CreativeWriting,
}

impl TaskCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskCategory::Chat => "chat",
            TaskCategory::Translation => "translation",
            TaskCategory::GrammarAnalysis => "grammar_analysis",
            TaskCategory::TextAnalysis => "text_analysis",
            TaskCategory::QuickResponse => "quick_response",
            TaskCategory::CreativeWriting => "creative_writing",
        }
    }

    pub fn all() -> [TaskCategory; 6] {
        [
            TaskCategory::Chat,
            TaskCategory::Translation,
            TaskCategory::GrammarAnalysis,
            TaskCategory::TextAnalysis,
            TaskCategory::QuickResponse,
            TaskCategory::CreativeWriting,
        ]
    }
}

impl fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keywords that mark a vocabulary / JLPT lookup.
pub const VOCABULARY_KEYWORDS: &[&str] = &[
    "jlpt", "vocabulary", "vocab", "word", "kanji", "n1", "n2", "n3", "n4", "n5",
];

const SEARCH_VERBS: &[&str] = &["search", "find", "look for", "what is"];

const QUICK_RESPONSE_MAX_CHARS: usize = 50;

struct TaskPattern {
    keywords: &'static [&'static str],
    task: TaskCategory,
}

// Order is the tie-break: the first pattern with a hit wins.
const TASK_PATTERNS: &[TaskPattern] = &[
    TaskPattern {
        keywords: &["translate", "translation", "mean", "english"],
        task: TaskCategory::Translation,
    },
    TaskPattern {
        keywords: &["grammar", "particle", "explain", "why", "how"],
        task: TaskCategory::GrammarAnalysis,
    },
    TaskPattern {
        keywords: &["analyze", "analysis", "breakdown", "parse"],
        task: TaskCategory::TextAnalysis,
    },
    TaskPattern {
        keywords: &["write", "create", "compose", "story", "essay"],
        task: TaskCategory::CreativeWriting,
    },
];

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

/// Maps a message to a task category. Total: anything unmatched is `Chat`.
pub fn classify(message: &str) -> TaskCategory {
    let lower = message.to_lowercase();

    if contains_any(&lower, VOCABULARY_KEYWORDS) && contains_any(&lower, SEARCH_VERBS) {
        return TaskCategory::TextAnalysis;
    }

    for pattern in TASK_PATTERNS {
        if contains_any(&lower, pattern.keywords) {
            return pattern.task;
        }
    }

    if message.chars().count() < QUICK_RESPONSE_MAX_CHARS && message.contains('?') {
        return TaskCategory::QuickResponse;
    }

    TaskCategory::Chat
}

/// Stateless handle over [`classify`] for callers that hold components.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskClassifier;

impl TaskClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, message: &str) -> TaskCategory {
        classify(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_chat() {
        assert_eq!(classify(""), TaskCategory::Chat);
        assert_eq!(classify("   \t"), TaskCategory::Chat);
    }

    #[test]
    fn test_vocabulary_search_beats_translation() {
        assert_eq!(
            classify("Find the N3 word that means rain"),
            TaskCategory::TextAnalysis
        );
        // Vocabulary keyword without a search verb falls through.
        assert_eq!(classify("What does this word mean"), TaskCategory::Translation);
    }

    #[test]
    fn test_translation_keywords() {
        for message in [
            "Translate 猫 please",
            "I need a translation",
            "What does 犬 mean",
            "Say it in English",
        ] {
            assert_eq!(classify(message), TaskCategory::Translation, "{}", message);
        }
    }

    #[test]
    fn test_grammar_question() {
        assert_eq!(classify("Why does this use は?"), TaskCategory::GrammarAnalysis);
        assert_eq!(classify("Explain the particle を"), TaskCategory::GrammarAnalysis);
    }

    #[test]
    fn test_analysis_and_creative() {
        assert_eq!(classify("Please parse 私は学生です"), TaskCategory::TextAnalysis);
        assert_eq!(classify("Write a short story about a cat"), TaskCategory::CreativeWriting);
    }

    #[test]
    fn test_quick_response_length_boundary() {
        let short = "Is today a holiday?";
        assert_eq!(classify(short), TaskCategory::QuickResponse);

        let padded = format!("{}{}", short, " ".repeat(40));
        assert!(padded.chars().count() >= 50);
        assert_eq!(classify(&padded), TaskCategory::Chat);
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        // 20 kana are 60 bytes but only 20 characters.
        let message = format!("{}?", "あ".repeat(20));
        assert_eq!(classify(&message), TaskCategory::QuickResponse);
    }

    #[test]
    fn test_plain_chat() {
        assert_eq!(classify("今日はいい天気ですね"), TaskCategory::Chat);
    }

    #[test]
    fn test_serde_labels() {
        let json = serde_json::to_string(&TaskCategory::GrammarAnalysis).unwrap();
        assert_eq!(json, "\"grammar_analysis\"");
        for task in TaskCategory::all() {
            assert_eq!(serde_json::to_string(&task).unwrap(), format!("\"{}\"", task));
        }
    }
}
