use anyhow::Result;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tokio::sync::{Mutex, RwLock};

use crate::classifier::TaskCategory;
use crate::config::AgentConfig;
use crate::context::TaskContext;
use crate::providers::{
    AnthropicProvider, CapabilityScores, GenerationOptions, GroqProvider, LLMProvider,
    OllamaProvider, ProviderRegistry, ProviderResult, SimpleProvider,
};
use crate::retrieval::parse_translation_request;
use crate::translation::{TranslationResult, TranslationService};

/// Leading words of the reply when every candidate for a task failed.
pub const NO_MODELS_MESSAGE_PREFIX: &str = "Sorry, no models available for";

const FALLBACK_PROVIDER: &str = "simple";
const LOW_CONFIDENCE_THRESHOLD: f32 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum ProviderState {
    Uninitialized,
    Ready,
    Failed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderDescriptor {
    pub name: String,
    pub capabilities: CapabilityScores,
    pub state: ProviderState,
}

#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkResult {
    pub success: bool,
    pub response_time_ms: Option<u128>,
    pub response_length: usize,
    pub error: Option<String>,
    pub capabilities: CapabilityScores,
}

fn default_task_preferences() -> HashMap<TaskCategory, Vec<String>> {
    let table: [(TaskCategory, &[&str]); 6] = [
        (TaskCategory::Chat, &["ollama", "groq", "anthropic", "simple"]),
        (TaskCategory::Translation, &["anthropic", "ollama", "groq", "simple"]),
        (TaskCategory::GrammarAnalysis, &["anthropic", "ollama", "simple"]),
        (TaskCategory::TextAnalysis, &["ollama", "simple"]),
        (TaskCategory::QuickResponse, &["groq", "simple"]),
        (TaskCategory::CreativeWriting, &["ollama", "anthropic", "groq", "simple"]),
    ];

    table
        .iter()
        .map(|(task, names)| (*task, names.iter().map(|n| n.to_string()).collect()))
        .collect()
}

/// Routes each task to the first provider in its preference chain that answers.
pub struct Orchestrator {
    pending: Mutex<Vec<Box<dyn LLMProvider>>>,
    active: RwLock<ProviderRegistry>,
    descriptors: RwLock<Vec<ProviderDescriptor>>,
    preferences: RwLock<HashMap<TaskCategory, Vec<String>>>,
    translation: TranslationService,
    initialized: AtomicBool,
    startup_error: RwLock<Option<String>>,
}

impl Orchestrator {
    /// Builds the local, hosted and fallback providers from config.
    pub fn new(config: &AgentConfig) -> Result<Self> {
        let defaults = GenerationOptions::new(config.generation.temperature, config.generation.max_tokens);

        let providers: Vec<Box<dyn LLMProvider>> = vec![
            Box::new(SimpleProvider::new()),
            Box::new(OllamaProvider::new(config.ollama.clone(), defaults)?),
            Box::new(GroqProvider::new(config.groq.clone(), defaults)?),
            Box::new(AnthropicProvider::new(config.anthropic.clone(), defaults)?),
        ];

        Ok(Self::with_providers(
            providers,
            TranslationService::new(config.google_translate.clone()),
        ))
    }

    pub fn with_providers(providers: Vec<Box<dyn LLMProvider>>, translation: TranslationService) -> Self {
        let descriptors = providers
            .iter()
            .map(|p| ProviderDescriptor {
                name: p.name().to_string(),
                capabilities: p.capabilities(),
                state: ProviderState::Uninitialized,
            })
            .collect();

        Self {
            pending: Mutex::new(providers),
            active: RwLock::new(ProviderRegistry::new()),
            descriptors: RwLock::new(descriptors),
            preferences: RwLock::new(default_task_preferences()),
            translation,
            initialized: AtomicBool::new(false),
            startup_error: RwLock::new(None),
        }
    }

    /// Brings every provider up once and builds the active set.
    ///
    /// Fails only when the fallback responder cannot start. That failure is
    /// terminal: later calls return the same error.
    pub async fn initialize(&self) -> Result<()> {
        let mut pending = self.pending.lock().await;
        if self.initialized.load(Ordering::SeqCst) {
            return Ok(());
        }
        if let Some(error) = self.startup_error.read().await.as_ref() {
            anyhow::bail!("{}", error);
        }

        tracing::info!("Initializing model orchestrator...");
        let mut registry = ProviderRegistry::new();
        let mut states: HashMap<String, ProviderState> = HashMap::new();
        let mut fatal = None;

        for mut provider in pending.drain(..) {
            let name = provider.name().to_string();
            match provider.initialize(None).await {
                Ok(()) => {
                    tracing::info!(provider = %name, "Provider initialized");
                    states.insert(name, ProviderState::Ready);
                    registry.register(provider.into());
                }
                Err(e) => {
                    tracing::warn!(provider = %name, error = %e, "Provider failed to initialize");
                    if name == FALLBACK_PROVIDER {
                        fatal = Some(format!("Fallback responder failed to initialize: {}", e));
                    }
                    states.insert(name, ProviderState::Failed(e.to_string()));
                }
            }
        }

        if let Some(error) = fatal {
            // Nothing becomes active, so started providers stay Uninitialized.
            let mut descriptors = self.descriptors.write().await;
            for descriptor in descriptors.iter_mut() {
                if let Some(state @ ProviderState::Failed(_)) = states.remove(&descriptor.name) {
                    descriptor.state = state;
                }
            }
            tracing::error!(error = %error, discarded = ?registry.list_providers(), "Model orchestrator failed to start");
            *self.startup_error.write().await = Some(error.clone());
            anyhow::bail!("{}", error);
        }

        if registry.is_empty() {
            let mut simple = SimpleProvider::new();
            simple.initialize(None).await?;
            tracing::info!("No providers available, falling back to simple responder");
            registry.register(std::sync::Arc::new(simple));
        }

        {
            let mut descriptors = self.descriptors.write().await;
            for descriptor in descriptors.iter_mut() {
                if let Some(state) = states.remove(&descriptor.name) {
                    descriptor.state = state;
                }
            }
            for name in registry.list_providers() {
                if !descriptors.iter().any(|d| d.name == name) {
                    if let Some(provider) = registry.get(&name) {
                        descriptors.push(ProviderDescriptor {
                            name,
                            capabilities: provider.capabilities(),
                            state: ProviderState::Ready,
                        });
                    }
                }
            }
        }

        self.translation.initialize(&registry).await;

        tracing::info!(active = ?registry.list_providers(), "Model orchestrator initialized");
        *self.active.write().await = registry;
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    pub async fn process_task(
        &self,
        task: TaskCategory,
        content: &str,
        context: Option<&TaskContext>,
        allow_fallback: bool,
    ) -> ProviderResult<String> {
        if task == TaskCategory::Translation {
            return Ok(self.handle_translation(content, context).await);
        }

        let chain = self.task_preference(task).await;
        let active = self.active.read().await.clone();
        let prompt_context = context.and_then(|c| c.analysis_context());
        let options = GenerationOptions::default();

        for name in &chain {
            let Some(provider) = active.get(name) else {
                continue;
            };

            tracing::info!(provider = %name, task = %task, "Routing task");
            match provider.generate(content, prompt_context.as_deref(), &options).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    tracing::warn!(provider = %name, task = %task, error = %e, "Provider failed");
                    if !allow_fallback {
                        return Err(e);
                    }
                }
            }
        }

        Ok(format!("{} {} task.", NO_MODELS_MESSAGE_PREFIX, task))
    }

    async fn handle_translation(&self, content: &str, context: Option<&TaskContext>) -> String {
        let has_analysis = context.map_or(false, |c| c.has_japanese_analysis());
        let request = parse_translation_request(content, has_analysis);

        let result = self
            .translation
            .translate(&request.text, &request.source, &request.target, None, context)
            .await;
        format_translation(&request.text, &result)
    }

    pub async fn set_task_preference(&self, task: TaskCategory, providers: Vec<String>) {
        tracing::info!(task = %task, providers = ?providers, "Updated task preference");
        self.preferences.write().await.insert(task, providers);
    }

    /// Preference chain for a task; `["simple"]` when none is configured.
    pub async fn task_preference(&self, task: TaskCategory) -> Vec<String> {
        self.preferences
            .read()
            .await
            .get(&task)
            .cloned()
            .unwrap_or_else(|| vec![FALLBACK_PROVIDER.to_string()])
    }

    pub async fn available_models(&self) -> Vec<String> {
        self.active.read().await.list_providers()
    }

    pub async fn model_status(&self) -> Vec<ProviderDescriptor> {
        self.descriptors.read().await.clone()
    }

    pub fn translation(&self) -> &TranslationService {
        &self.translation
    }

    /// Times one generation on each active provider, sequentially.
    pub async fn benchmark_models(&self, prompt: &str) -> BTreeMap<String, BenchmarkResult> {
        let active = self.active.read().await.clone();
        let mut results = BTreeMap::new();

        for name in active.list_providers() {
            let Some(provider) = active.get(&name) else {
                continue;
            };
            let start = Instant::now();
            let outcome = provider.generate(prompt, None, &GenerationOptions::default()).await;
            let elapsed = start.elapsed().as_millis();

            let result = match outcome {
                Ok(response) => BenchmarkResult {
                    success: true,
                    response_time_ms: Some(elapsed),
                    response_length: response.chars().count(),
                    error: None,
                    capabilities: provider.capabilities(),
                },
                Err(e) => BenchmarkResult {
                    success: false,
                    response_time_ms: None,
                    response_length: 0,
                    error: Some(e.to_string()),
                    capabilities: provider.capabilities(),
                },
            };
            results.insert(name, result);
        }

        results
    }

    pub async fn chat(&self, message: &str) -> ProviderResult<String> {
        self.process_task(TaskCategory::Chat, message, None, true).await
    }

    pub async fn translate_with_best_model(&self, text: &str, target: &str) -> String {
        let result = self.translation.translate(text, "auto", target, None, None).await;
        format_translation(text, &result)
    }

    pub async fn analyze_grammar_with_best_model(&self, text: &str) -> ProviderResult<String> {
        let prompt = format!("Explain the Japanese grammar in this text: {}", text);
        self.process_task(TaskCategory::GrammarAnalysis, &prompt, None, true).await
    }

    pub async fn quick_response(&self, text: &str) -> ProviderResult<String> {
        self.process_task(TaskCategory::QuickResponse, text, None, true).await
    }
}

fn format_translation(text: &str, result: &TranslationResult) -> String {
    if result.confidence <= LOW_CONFIDENCE_THRESHOLD {
        return format!(
            "I couldn't translate '{}'. Try configuring a hosted translation provider (set GOOGLE_TRANSLATE_API_KEY).",
            text
        );
    }

    let mut response = format!("Translation: {}", result.translated_text);
    if result.provider != "simple" {
        response.push_str(&format!("\n(via {} translation)", result.provider));
    }
    if let Some(note) = &result.note {
        response.push_str(&format!("\nNote: {}", note));
    }
    response
}
