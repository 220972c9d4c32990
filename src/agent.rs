use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::Instrument;
use uuid::Uuid;

use crate::analysis::{FallbackAnalyzer, TextAnalysis, TextAnalyzer};
use crate::classifier::{classify, TaskCategory};
use crate::config::{AgentConfig, AgentSettings};
use crate::context::{HistoryTurn, TaskContext};
use crate::orchestrator::Orchestrator;
use crate::retrieval::{InMemoryVocabulary, JlptLevel, RetrievalAugmenter, VocabularyEntry};

/// Reply used when the pipeline itself fails.
pub const APOLOGY_MESSAGE: &str = "申し訳ございません。エラーが発生しました。もう一度お試しください。";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub id: Uuid,
    pub user_id: String,
    pub user_message: String,
    pub ai_response: String,
    pub timestamp: DateTime<Utc>,
}

impl ConversationRecord {
    pub fn new(user_id: &str, user_message: &str, ai_response: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            user_message: user_message.to_string(),
            ai_response: ai_response.to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// In-memory conversation history, trimmed to the newest `retain` records
/// whenever it grows past `capacity`.
pub struct ConversationLog {
    records: Mutex<Vec<ConversationRecord>>,
    capacity: usize,
    retain: usize,
}

impl ConversationLog {
    pub fn new(capacity: usize, retain: usize) -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            capacity,
            retain: retain.min(capacity),
        }
    }

    pub async fn append(&self, record: ConversationRecord) {
        let mut records = self.records.lock().await;
        records.push(record);
        if records.len() > self.capacity {
            let excess = records.len() - self.retain;
            records.drain(..excess);
            tracing::debug!(retained = records.len(), "Trimmed conversation history");
        }
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }

    pub async fn records(&self) -> Vec<ConversationRecord> {
        self.records.lock().await.clone()
    }

    /// The user's last `limit` messages, oldest first.
    pub async fn recent_for(&self, user_id: &str, limit: usize) -> Vec<HistoryTurn> {
        let records = self.records.lock().await;
        let mine: Vec<&ConversationRecord> = records.iter().filter(|r| r.user_id == user_id).collect();
        let skip = mine.len().saturating_sub(limit);

        mine.into_iter()
            .skip(skip)
            .map(|r| HistoryTurn {
                role: "user".to_string(),
                content: r.user_message.clone(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentResponse {
    pub response: String,
    pub task_type: Option<TaskCategory>,
    pub provider_used: String,
    pub japanese_analysis: Option<TextAnalysis>,
    pub jlpt_results: Vec<VocabularyEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AgentResponse {
    fn apology(error: String) -> Self {
        Self {
            response: APOLOGY_MESSAGE.to_string(),
            task_type: None,
            provider_used: "error-fallback".to_string(),
            japanese_analysis: None,
            jlpt_results: Vec::new(),
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentStatus {
    pub initialized: bool,
    pub retrieval_available: bool,
    pub available_models: Vec<String>,
    pub conversation_count: usize,
    pub supported_tasks: Vec<TaskCategory>,
}

/// Per-message pipeline: classify, analyze, retrieve, then route.
pub struct JapaneseAgent {
    settings: AgentSettings,
    orchestrator: Arc<Orchestrator>,
    analyzer: Arc<dyn TextAnalyzer>,
    augmenter: RetrievalAugmenter,
    history: ConversationLog,
}

impl JapaneseAgent {
    pub fn new(
        config: &AgentConfig,
        orchestrator: Arc<Orchestrator>,
        analyzer: Arc<dyn TextAnalyzer>,
        augmenter: RetrievalAugmenter,
    ) -> Self {
        let settings = config.agent.clone();
        let history = ConversationLog::new(settings.history_capacity, settings.history_retain);

        Self {
            settings,
            orchestrator,
            analyzer,
            augmenter,
            history,
        }
    }

    /// Wires the configured providers, the script-based analyzer and the
    /// built-in vocabulary.
    pub fn from_config(config: &AgentConfig) -> Result<Self> {
        let orchestrator = Arc::new(Orchestrator::new(config)?);
        let augmenter = RetrievalAugmenter::new(Arc::new(InMemoryVocabulary::with_starter_set()))
            .with_limits(config.agent.retrieval_limit, config.agent.augmentation_limit);

        Ok(Self::new(config, orchestrator, Arc::new(FallbackAnalyzer::new()), augmenter))
    }

    pub async fn initialize(&self) -> Result<()> {
        if self.orchestrator.is_initialized() {
            return Ok(());
        }
        self.orchestrator.initialize().await?;
        tracing::info!("Japanese agent initialized");
        Ok(())
    }

    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    pub async fn process_message(&self, message: &str, user_id: Option<&str>) -> AgentResponse {
        let span = tracing::info_span!(
            "message",
            request_id = %Uuid::new_v4(),
            user = user_id.unwrap_or("anonymous")
        );

        async {
            let preview: String = message.chars().take(50).collect();
            tracing::info!(message = %preview, "Processing message");

            match self.run_pipeline(message, user_id).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::error!(error = %e, "Error processing message");
                    AgentResponse::apology(e.to_string())
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run_pipeline(&self, message: &str, user_id: Option<&str>) -> Result<AgentResponse> {
        self.initialize().await?;

        let task = classify(message);
        let analysis = self.analyzer.analyze(message).await;
        let jlpt_results = self.augmenter.lookup(message).await;

        let conversation_history = match user_id {
            Some(uid) => self.history.recent_for(uid, self.settings.recent_history_limit).await,
            None => Vec::new(),
        };
        let context = TaskContext {
            japanese_analysis: Some(analysis.clone()),
            jlpt_results: jlpt_results.clone(),
            conversation_history,
            task_type: Some(task),
        };

        // The translation parser needs the user's own wording.
        let content = if task == TaskCategory::Translation {
            message.to_string()
        } else {
            self.augmenter.augment_prompt(message, &jlpt_results)
        };

        let response = self
            .orchestrator
            .process_task(task, &content, Some(&context), true)
            .await?;

        if let Some(uid) = user_id {
            self.history
                .append(ConversationRecord::new(uid, message, &response))
                .await;
        }

        tracing::info!(task = %task, "Message processed successfully");
        Ok(AgentResponse {
            response,
            task_type: Some(task),
            provider_used: format!("orchestrated-{}", task),
            japanese_analysis: Some(analysis),
            jlpt_results,
            error: None,
        })
    }

    pub async fn translate_text(&self, text: &str, target: &str) -> String {
        if let Err(e) = self.initialize().await {
            return format!("Translation failed: {}", e);
        }
        self.orchestrator.translate_with_best_model(text, target).await
    }

    pub async fn explain_grammar(&self, text: &str) -> String {
        if let Err(e) = self.initialize().await {
            return format!("Grammar explanation failed: {}", e);
        }

        let context = TaskContext::with_analysis(self.analyzer.analyze(text).await);
        let prompt = format!("Explain the grammar of: {}", text);
        match self
            .orchestrator
            .process_task(TaskCategory::GrammarAnalysis, &prompt, Some(&context), true)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(error = %e, "Grammar explanation failed");
                format!("Grammar explanation failed: {}", e)
            }
        }
    }

    pub async fn analyze_text(&self, text: &str) -> TextAnalysis {
        self.analyzer.analyze(text).await
    }

    pub async fn search_vocabulary(&self, query: &str, limit: usize) -> Vec<VocabularyEntry> {
        let Some(retriever) = self.augmenter.retriever() else {
            tracing::warn!("Vocabulary retrieval not available");
            return Vec::new();
        };
        retriever.search(query, limit, None).await.unwrap_or_else(|e| {
            tracing::error!(error = %e, "Vocabulary search failed");
            Vec::new()
        })
    }

    /// Words close to `word`; a plain search under another name.
    pub async fn find_similar_words(&self, word: &str, limit: usize) -> Vec<VocabularyEntry> {
        self.search_vocabulary(word, limit).await
    }

    pub async fn vocabulary_statistics(&self) -> BTreeMap<JlptLevel, usize> {
        let Some(retriever) = self.augmenter.retriever() else {
            tracing::warn!("Vocabulary retrieval not available");
            return BTreeMap::new();
        };
        retriever.level_statistics().await.unwrap_or_else(|e| {
            tracing::error!(error = %e, "Vocabulary statistics failed");
            BTreeMap::new()
        })
    }

    pub async fn vocabulary_by_level(&self, level: JlptLevel, limit: usize) -> Vec<VocabularyEntry> {
        let Some(retriever) = self.augmenter.retriever() else {
            tracing::warn!("Vocabulary retrieval not available");
            return Vec::new();
        };
        retriever.by_level(level, limit).await.unwrap_or_else(|e| {
            tracing::error!(error = %e, level = %level, "Vocabulary by level failed");
            Vec::new()
        })
    }

    pub async fn random_vocabulary(&self, level: Option<JlptLevel>, count: usize) -> Vec<VocabularyEntry> {
        let Some(retriever) = self.augmenter.retriever() else {
            tracing::warn!("Vocabulary retrieval not available");
            return Vec::new();
        };
        retriever.random(level, count).await.unwrap_or_else(|e| {
            tracing::error!(error = %e, "Random vocabulary failed");
            Vec::new()
        })
    }

    pub async fn recent_history(&self, user_id: &str, limit: usize) -> Vec<HistoryTurn> {
        self.history.recent_for(user_id, limit).await
    }

    pub fn history(&self) -> &ConversationLog {
        &self.history
    }

    pub async fn status(&self) -> AgentStatus {
        AgentStatus {
            initialized: self.orchestrator.is_initialized(),
            retrieval_available: self.augmenter.is_enabled(),
            available_models: self.orchestrator.available_models().await,
            conversation_count: self.history.len().await,
            supported_tasks: TaskCategory::all().to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TranslateApiConfig;
    use crate::providers::{LLMProvider, SimpleProvider};
    use crate::translation::TranslationService;

    fn agent(augmenter: RetrievalAugmenter) -> JapaneseAgent {
        let providers: Vec<Box<dyn LLMProvider>> = vec![Box::new(SimpleProvider::new())];
        let orchestrator = Orchestrator::with_providers(
            providers,
            TranslationService::new(TranslateApiConfig::default()),
        );
        JapaneseAgent::new(
            &AgentConfig::default(),
            Arc::new(orchestrator),
            Arc::new(FallbackAnalyzer::new()),
            augmenter,
        )
    }

    #[tokio::test]
    async fn test_log_trims_to_retain() {
        let log = ConversationLog::new(1000, 500);
        for i in 0..1001 {
            log.append(ConversationRecord::new("u", &format!("m{}", i), "r")).await;
        }

        let records = log.records().await;
        assert_eq!(records.len(), 500);
        assert_eq!(records.first().unwrap().user_message, "m501");
        assert_eq!(records.last().unwrap().user_message, "m1000");
    }

    #[tokio::test]
    async fn test_recent_for_filters_by_user() {
        let log = ConversationLog::new(10, 5);
        log.append(ConversationRecord::new("a", "one", "r")).await;
        log.append(ConversationRecord::new("b", "other", "r")).await;
        log.append(ConversationRecord::new("a", "two", "r")).await;
        log.append(ConversationRecord::new("a", "three", "r")).await;

        let turns = log.recent_for("a", 2).await;
        let contents: Vec<&str> = turns.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["two", "three"]);
        assert!(turns.iter().all(|t| t.role == "user"));
    }

    #[tokio::test]
    async fn test_greeting_round_trip_through_simple() {
        let agent = agent(RetrievalAugmenter::disabled());
        let reply = agent.process_message("こんにちは", Some("user-1")).await;

        assert_eq!(reply.task_type, Some(TaskCategory::Chat));
        assert_eq!(reply.provider_used, "orchestrated-chat");
        assert_eq!(reply.response, "Hello! How can I help you with Japanese?");
        assert!(reply.japanese_analysis.unwrap().has_japanese());
        assert_eq!(agent.history().len().await, 1);
    }

    #[tokio::test]
    async fn test_translation_uses_original_message() {
        let augmenter = RetrievalAugmenter::new(Arc::new(InMemoryVocabulary::with_starter_set()));
        let agent = agent(augmenter);

        let reply = agent.process_message("What does ありがとう mean?", None).await;
        assert_eq!(reply.task_type, Some(TaskCategory::Translation));
        assert_eq!(reply.response, "Translation: Thank you");
        assert_eq!(agent.history().len().await, 0);
    }

    #[tokio::test]
    async fn test_vocabulary_lookup_feeds_prompt() {
        let augmenter = RetrievalAugmenter::new(Arc::new(InMemoryVocabulary::with_starter_set()));
        let agent = agent(augmenter);

        let reply = agent.process_message("find the jlpt word 天気", None).await;
        assert_eq!(reply.task_type, Some(TaskCategory::TextAnalysis));
        assert_eq!(reply.jlpt_results[0].original, "天気");
        assert!(reply.error.is_none());
        assert!(!reply.response.is_empty());
    }

    #[tokio::test]
    async fn test_status_and_vocabulary_helpers() {
        let augmenter = RetrievalAugmenter::new(Arc::new(InMemoryVocabulary::with_starter_set()));
        let agent = agent(augmenter);
        agent.initialize().await.unwrap();

        let status = agent.status().await;
        assert!(status.initialized);
        assert!(status.retrieval_available);
        assert_eq!(status.available_models, vec!["simple".to_string()]);
        assert_eq!(status.supported_tasks.len(), 6);

        assert_eq!(agent.search_vocabulary("cat", 3).await[0].original, "猫");
        assert_eq!(agent.vocabulary_by_level(JlptLevel::N3, 10).await.len(), 2);
        assert_eq!(agent.random_vocabulary(Some(JlptLevel::N4), 3).await.len(), 3);

        let similar = agent.find_similar_words("会議", 2).await;
        assert_eq!(similar[0].original, "会議");
        let stats = agent.vocabulary_statistics().await;
        assert_eq!(stats.values().sum::<usize>(), 19);
        assert_eq!(stats[&JlptLevel::N3], 2);
    }

    struct SpanRecorder(Arc<std::sync::Mutex<Vec<String>>>);

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for SpanRecorder {
        fn on_new_span(
            &self,
            attrs: &tracing::span::Attributes<'_>,
            _id: &tracing::span::Id,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            let fields: Vec<&str> = attrs.metadata().fields().iter().map(|f| f.name()).collect();
            self.0
                .lock()
                .unwrap()
                .push(format!("{}:{}", attrs.metadata().name(), fields.join(",")));
        }
    }

    #[tokio::test]
    async fn test_each_message_gets_its_own_span() {
        use tracing_subscriber::layer::SubscriberExt;

        let spans = Arc::new(std::sync::Mutex::new(Vec::new()));
        let subscriber = tracing_subscriber::registry().with(SpanRecorder(spans.clone()));
        let _guard = tracing::subscriber::set_default(subscriber);

        let agent = agent(RetrievalAugmenter::disabled());
        agent.process_message("こんにちは", Some("user-1")).await;
        agent.process_message("hello", None).await;

        let spans = spans.lock().unwrap();
        let message_spans: Vec<&String> = spans.iter().filter(|s| s.starts_with("message:")).collect();
        assert_eq!(message_spans.len(), 2);
        assert_eq!(message_spans[0].as_str(), "message:request_id,user");
    }

    #[tokio::test]
    async fn test_disabled_retrieval_returns_empty() {
        let agent = agent(RetrievalAugmenter::disabled());
        assert!(agent.search_vocabulary("cat", 3).await.is_empty());
        assert!(agent.random_vocabulary(None, 3).await.is_empty());
        assert!(agent.vocabulary_statistics().await.is_empty());
    }

    #[tokio::test]
    async fn test_explain_grammar_routes_to_grammar_chain() {
        let agent = agent(RetrievalAugmenter::disabled());
        let reply = agent.explain_grammar("私は学生です").await;
        assert!(reply.starts_with("I can provide basic grammar help"));
    }
}
