use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

pub mod anthropic;
pub mod groq;
pub mod ollama;
pub mod simple;

pub use anthropic::AnthropicProvider;
pub use groq::GroqProvider;
pub use ollama::OllamaProvider;
pub use simple::SimpleProvider;

/// Instruction shared by every model backend.
pub const TUTOR_PREAMBLE: &str = "You are a helpful AI assistant specialized in Japanese language learning. \
You help users learn Japanese by providing clear explanations, translations, and cultural context. \
Be encouraging and provide examples when appropriate.";

/// Ranking scores in [0, 1]. Informational only; routing never reads them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapabilityScores {
    pub speed: f32,
    pub quality: f32,
    pub japanese_affinity: f32,
    pub cost: f32,
}

impl CapabilityScores {
    pub const fn new(speed: f32, quality: f32, japanese_affinity: f32, cost: f32) -> Self {
        Self {
            speed,
            quality,
            japanese_affinity,
            cost,
        }
    }
}

/// Per-call sampling overrides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl GenerationOptions {
    pub fn new(temperature: f32, max_tokens: u32) -> Self {
        Self {
            temperature: Some(temperature),
            max_tokens: Some(max_tokens),
        }
    }

    pub fn temperature_or(&self, default: f32) -> f32 {
        self.temperature.unwrap_or(default)
    }

    pub fn max_tokens_or(&self, default: u32) -> u32 {
        self.max_tokens.unwrap_or(default)
    }
}

/// Main trait that all model providers implement
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Unique registry key
    fn name(&self) -> &str;

    fn capabilities(&self) -> CapabilityScores;

    /// Bring the backend up. Called once by the orchestrator.
    async fn initialize(&mut self, model_hint: Option<&str>) -> ProviderResult<()>;

    /// Generate a reply. Fails with `NotInitialized` before `initialize` succeeded.
    async fn generate(
        &self,
        prompt: &str,
        context: Option<&str>,
        options: &GenerationOptions,
    ) -> ProviderResult<String>;

    fn is_ready(&self) -> bool;
}

/// Joins the optional caller context in front of the prompt.
pub fn compose_prompt(prompt: &str, context: Option<&str>) -> String {
    match context {
        Some(ctx) if !ctx.trim().is_empty() => format!("{}\n\n{}", ctx, prompt),
        _ => prompt.to_string(),
    }
}

/// Name-keyed set of providers that finished initialization.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn LLMProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }

    pub fn register(&mut self, provider: Arc<dyn LLMProvider>) {
        self.providers.insert(provider.name().to_string(), provider);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn LLMProvider>> {
        self.providers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    pub fn list_providers(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Error types for providers
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProviderError {
    #[error("Provider '{0}' is unavailable")]
    Unavailable(String),

    #[error("Provider '{0}' has not been initialized")]
    NotInitialized(String),

    #[error("{0} not configured")]
    MissingApiKey(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Unsupported request: {0}")]
    Unsupported(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ProviderError::MalformedResponse(err.to_string())
        } else {
            ProviderError::Network(err.to_string())
        }
    }
}

/// Turns a non-success HTTP response into an `Api` error carrying the body.
pub(crate) async fn error_for_status(response: reqwest::Response) -> ProviderResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::Api(format!("HTTP {}: {}", status, body)))
}
