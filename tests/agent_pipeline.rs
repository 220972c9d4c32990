use ai_nihongo::analysis::FallbackAnalyzer;
use ai_nihongo::config::TranslateApiConfig;
use ai_nihongo::providers::{CapabilityScores, GenerationOptions, SimpleProvider};
use ai_nihongo::retrieval::{InMemoryVocabulary, RetrievalAugmenter};
use ai_nihongo::{
    AgentConfig, JapaneseAgent, LLMProvider, Orchestrator, ProviderError, ProviderResult,
    TaskCategory, TranslationService, APOLOGY_MESSAGE,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Stands in for a local model server; records every prompt it sees.
struct EchoModel {
    name: &'static str,
    healthy: bool,
    prompts: Arc<Mutex<Vec<String>>>,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl LLMProvider for EchoModel {
    fn name(&self) -> &str {
        self.name
    }

    fn capabilities(&self) -> CapabilityScores {
        CapabilityScores::new(0.7, 0.8, 0.7, 1.0)
    }

    async fn initialize(&mut self, _model_hint: Option<&str>) -> ProviderResult<()> {
        Ok(())
    }

    async fn generate(
        &self,
        prompt: &str,
        _context: Option<&str>,
        _options: &GenerationOptions,
    ) -> ProviderResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        if self.healthy {
            Ok(format!("[{}] ok", self.name))
        } else {
            Err(ProviderError::Network("connection reset".to_string()))
        }
    }

    fn is_ready(&self) -> bool {
        true
    }
}

struct Harness {
    agent: JapaneseAgent,
    prompts: Arc<Mutex<Vec<String>>>,
    calls: Arc<AtomicUsize>,
}

fn harness(model_healthy: bool) -> Harness {
    let prompts = Arc::new(Mutex::new(Vec::new()));
    let calls = Arc::new(AtomicUsize::new(0));
    let providers: Vec<Box<dyn LLMProvider>> = vec![
        Box::new(EchoModel {
            name: "ollama",
            healthy: model_healthy,
            prompts: prompts.clone(),
            calls: calls.clone(),
        }),
        Box::new(SimpleProvider::new()),
    ];

    let orchestrator = Orchestrator::with_providers(
        providers,
        TranslationService::new(TranslateApiConfig::default()),
    );
    let augmenter = RetrievalAugmenter::new(Arc::new(InMemoryVocabulary::with_starter_set()));
    let agent = JapaneseAgent::new(
        &AgentConfig::default(),
        Arc::new(orchestrator),
        Arc::new(FallbackAnalyzer::new()),
        augmenter,
    );

    Harness {
        agent,
        prompts,
        calls,
    }
}

#[tokio::test]
async fn chat_goes_to_local_model_first() {
    let h = harness(true);
    let reply = h.agent.process_message("今日はいい天気ですね", Some("alice")).await;

    assert_eq!(reply.task_type, Some(TaskCategory::Chat));
    assert_eq!(reply.response, "[ollama] ok");
    assert_eq!(h.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unhealthy_local_model_falls_back_to_simple() {
    let h = harness(false);
    let reply = h.agent.process_message("こんにちは", None).await;

    assert_eq!(reply.response, "Hello! How can I help you with Japanese?");
    assert_eq!(h.calls.load(Ordering::SeqCst), 1);
    assert_ne!(reply.response, APOLOGY_MESSAGE);
}

#[tokio::test]
async fn vocabulary_query_is_augmented_before_routing() {
    let h = harness(true);
    let reply = h.agent.process_message("find the jlpt word 天気", None).await;

    assert_eq!(reply.task_type, Some(TaskCategory::TextAnalysis));
    assert!(!reply.jlpt_results.is_empty());

    let prompts = h.prompts.lock().unwrap();
    assert!(prompts[0].contains("JLPT Vocabulary Context:"));
    assert!(prompts[0].contains("1. 天気 (てんき) - weather [JLPT N5]"));
}

#[tokio::test]
async fn translation_bypasses_model_chain() {
    let h = harness(true);
    let reply = h.agent.process_message("translate to english: ありがとう", None).await;

    assert_eq!(reply.task_type, Some(TaskCategory::Translation));
    // The model is registered as a translation backend ahead of the dictionary.
    assert_eq!(reply.response, "Translation: [ollama] ok\n(via llm_ollama translation)");
    let prompts = h.prompts.lock().unwrap();
    assert!(prompts[0].starts_with("Please translate the following Japanese text to English."));
}

#[tokio::test]
async fn history_is_kept_per_user() {
    let h = harness(true);
    h.agent.process_message("一つ目", Some("alice")).await;
    h.agent.process_message("first from bob", Some("bob")).await;
    h.agent.process_message("二つ目", Some("alice")).await;

    let turns = h.agent.recent_history("alice", 5).await;
    let contents: Vec<&str> = turns.iter().map(|t| t.content.as_str()).collect();
    assert_eq!(contents, vec!["一つ目", "二つ目"]);

    let status = h.agent.status().await;
    assert_eq!(status.conversation_count, 3);
    assert_eq!(status.available_models, vec!["ollama".to_string(), "simple".to_string()]);
}

/// A fallback responder that refuses to start.
struct BrokenResponder;

#[async_trait]
impl LLMProvider for BrokenResponder {
    fn name(&self) -> &str {
        "simple"
    }

    fn capabilities(&self) -> CapabilityScores {
        CapabilityScores::new(0.3, 0.3, 0.3, 1.0)
    }

    async fn initialize(&mut self, _model_hint: Option<&str>) -> ProviderResult<()> {
        Err(ProviderError::Unavailable("simple".to_string()))
    }

    async fn generate(
        &self,
        _prompt: &str,
        _context: Option<&str>,
        _options: &GenerationOptions,
    ) -> ProviderResult<String> {
        Err(ProviderError::NotInitialized("simple".to_string()))
    }

    fn is_ready(&self) -> bool {
        false
    }
}

#[tokio::test]
async fn broken_fallback_responder_fails_every_message() {
    let calls = Arc::new(AtomicUsize::new(0));
    let providers: Vec<Box<dyn LLMProvider>> = vec![
        Box::new(BrokenResponder),
        Box::new(EchoModel {
            name: "ollama",
            healthy: true,
            prompts: Arc::new(Mutex::new(Vec::new())),
            calls: calls.clone(),
        }),
    ];
    let orchestrator = Orchestrator::with_providers(
        providers,
        TranslationService::new(TranslateApiConfig::default()),
    );
    let agent = JapaneseAgent::new(
        &AgentConfig::default(),
        Arc::new(orchestrator),
        Arc::new(FallbackAnalyzer::new()),
        RetrievalAugmenter::disabled(),
    );

    for _ in 0..2 {
        let reply = agent.process_message("hello there", Some("user-9")).await;
        assert_eq!(reply.response, APOLOGY_MESSAGE);
        assert_eq!(reply.provider_used, "error-fallback");
        assert!(reply.error.is_some());
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(!agent.status().await.initialized);
}
