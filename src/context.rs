use serde::{Deserialize, Serialize};

use crate::analysis::TextAnalysis;
use crate::classifier::TaskCategory;
use crate::retrieval::VocabularyEntry;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub role: String,
    pub content: String,
}

/// Per-request context handed from the agent to the orchestrator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskContext {
    pub japanese_analysis: Option<TextAnalysis>,
    #[serde(default)]
    pub jlpt_results: Vec<VocabularyEntry>,
    #[serde(default)]
    pub conversation_history: Vec<HistoryTurn>,
    pub task_type: Option<TaskCategory>,
}

impl TaskContext {
    pub fn with_analysis(analysis: TextAnalysis) -> Self {
        Self {
            japanese_analysis: Some(analysis),
            ..Self::default()
        }
    }

    /// Serialized tokenizer output, used as provider prompt context.
    pub fn analysis_context(&self) -> Option<String> {
        self.japanese_analysis.as_ref().map(|a| a.to_context())
    }

    /// True when the analysis found kana or kanji in the message.
    pub fn has_japanese_analysis(&self) -> bool {
        self.japanese_analysis
            .as_ref()
            .map(|a| a.has_japanese())
            .unwrap_or(false)
    }
}
