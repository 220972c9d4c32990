//! Translation subsystem: several interchangeable backends behind one
//! [`TranslationProvider`] trait, chosen per language pair by a static
//! preference table.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::analysis::is_kana;
use crate::config::{env_value, TranslateApiConfig, GOOGLE_TRANSLATE_API_KEY_VAR};
use crate::context::TaskContext;
use crate::providers::{ProviderRegistry, ProviderResult};

pub mod dictionary;
pub mod google;
pub mod llm;

pub use dictionary::DictionaryTranslator;
pub use google::GoogleTranslator;
pub use llm::LlmTranslator;

pub const EXACT_MATCH_CONFIDENCE: f32 = 0.9;
pub const WORD_BY_WORD_CONFIDENCE: f32 = 0.6;
pub const HOSTED_API_CONFIDENCE: f32 = 0.9;
pub const LLM_CONFIDENCE: f32 = 0.85;

/// Language-model providers that double as translation backends.
const LLM_TRANSLATION_BACKENDS: &[&str] = &["anthropic", "ollama", "groq"];

/// Share of kana among alphabetic characters above which text counts as Japanese.
const JAPANESE_RATIO_THRESHOLD: f64 = 0.3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationResult {
    pub translated_text: String,
    pub source_language: String,
    pub target_language: String,
    pub confidence: f32,
    pub provider: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl TranslationResult {
    pub fn new(
        translated_text: impl Into<String>,
        source_language: impl Into<String>,
        target_language: impl Into<String>,
        confidence: f32,
        provider: impl Into<String>,
        method: impl Into<String>,
    ) -> Self {
        Self {
            translated_text: translated_text.into(),
            source_language: source_language.into(),
            target_language: target_language.into(),
            confidence,
            provider: provider.into(),
            method: method.into(),
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Result returned when every backend in the chain failed.
    pub fn exhausted(text: &str, source: &str, target: &str) -> Self {
        Self::new(
            format!("[Translation failed for '{}']", text),
            source,
            target,
            0.0,
            "none",
            "error",
        )
        .with_note("All translation providers failed")
    }
}

#[async_trait]
pub trait TranslationProvider: Send + Sync {
    fn name(&self) -> &str;

    fn supported_languages(&self) -> Vec<String>;

    async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
        context: Option<&TaskContext>,
    ) -> ProviderResult<TranslationResult>;
}

/// Guesses `ja` / `en` from the share of kana characters.
///
/// Known approximation: only two languages are distinguished, kanji-only text
/// is not recognised as Japanese, and anything non-Japanese reads as `en`.
pub fn detect_language(text: &str) -> &'static str {
    let alphabetic = text.chars().filter(|c| c.is_alphabetic()).count();
    if alphabetic == 0 {
        return "unknown";
    }
    let kana = text.chars().filter(|c| is_kana(*c)).count();

    if kana as f64 / alphabetic as f64 > JAPANESE_RATIO_THRESHOLD {
        "ja"
    } else {
        "en"
    }
}

fn default_pair_preferences() -> HashMap<(String, String), Vec<String>> {
    let chain: Vec<String> = ["google", "anthropic", "ollama", "simple"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    [("ja", "en"), ("en", "ja"), ("auto", "en"), ("auto", "ja")]
        .iter()
        .map(|(s, t)| ((s.to_string(), t.to_string()), chain.clone()))
        .collect()
}

/// Manages the translation backends and walks their fallback chains.
pub struct TranslationService {
    config: TranslateApiConfig,
    providers: RwLock<HashMap<String, Arc<dyn TranslationProvider>>>,
    preferences: HashMap<(String, String), Vec<String>>,
    initialized: AtomicBool,
}

impl TranslationService {
    pub fn new(config: TranslateApiConfig) -> Self {
        Self {
            config,
            providers: RwLock::new(HashMap::new()),
            preferences: default_pair_preferences(),
            initialized: AtomicBool::new(false),
        }
    }

    /// Registers every backend that can run. Safe to call more than once.
    pub async fn initialize(&self, llm_providers: &ProviderRegistry) {
        if self.initialized.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::info!("Initializing translation service...");

        self.register(Arc::new(DictionaryTranslator::new())).await;

        if let Some(api_key) = env_value(GOOGLE_TRANSLATE_API_KEY_VAR) {
            match GoogleTranslator::new(self.config.clone(), api_key) {
                Ok(google) => {
                    self.register(Arc::new(google)).await;
                    tracing::info!("Google Translate provider added");
                }
                Err(e) => tracing::warn!(error = %e, "Google Translate provider not available"),
            }
        } else {
            tracing::warn!("Google Translate provider not available: {} not set", GOOGLE_TRANSLATE_API_KEY_VAR);
        }

        for name in LLM_TRANSLATION_BACKENDS {
            match llm_providers.get(name) {
                Some(provider) => {
                    self.register(Arc::new(LlmTranslator::new(provider))).await;
                    tracing::info!(provider = %name, "LLM translation provider added");
                }
                None => tracing::debug!(provider = %name, "LLM translation provider not available"),
            }
        }

        tracing::info!(
            providers = self.providers.read().await.len(),
            "Translation service initialized"
        );
    }

    /// Adds or replaces a backend under its own name.
    pub async fn register(&self, provider: Arc<dyn TranslationProvider>) {
        self.providers
            .write()
            .await
            .insert(provider.name().to_string(), provider);
    }

    async fn ensure_dictionary(&self) {
        let mut providers = self.providers.write().await;
        if !providers.contains_key("simple") {
            providers.insert("simple".to_string(), Arc::new(DictionaryTranslator::new()));
        }
    }

    pub async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
        provider: Option<&str>,
        context: Option<&TaskContext>,
    ) -> TranslationResult {
        if !self.initialized.load(Ordering::SeqCst) {
            self.ensure_dictionary().await;
        }

        let source = if source_lang == "auto" {
            let detected = detect_language(text);
            tracing::info!(detected, "Detected source language");
            detected
        } else {
            source_lang
        };

        let providers = self.providers.read().await.clone();

        if let Some(requested) = provider {
            match providers.get(requested) {
                Some(backend) => match backend.translate(text, source, target_lang, context).await {
                    Ok(result) => return result,
                    Err(e) => {
                        tracing::warn!(provider = %requested, error = %e, "Requested translation provider failed")
                    }
                },
                None => tracing::warn!(provider = %requested, "Requested translation provider is not registered"),
            }
        }

        let fallback = vec!["simple".to_string()];
        let chain = self
            .preferences
            .get(&(source.to_string(), target_lang.to_string()))
            .unwrap_or(&fallback);

        for name in chain {
            let Some(backend) = providers.get(name) else {
                continue;
            };
            match backend.translate(text, source, target_lang, context).await {
                Ok(result) => {
                    tracing::info!(provider = %name, "Translation successful");
                    return result;
                }
                Err(e) => {
                    tracing::warn!(provider = %name, error = %e, "Translation provider failed");
                }
            }
        }

        TranslationResult::exhausted(text, source, target_lang)
    }

    pub fn detect_language(&self, text: &str) -> &'static str {
        detect_language(text)
    }

    pub async fn get_available_providers(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn get_supported_languages(&self) -> HashMap<String, Vec<String>> {
        self.providers
            .read()
            .await
            .iter()
            .map(|(name, provider)| (name.clone(), provider.supported_languages()))
            .collect()
    }

    /// Preference chain for a language pair, if one is configured.
    pub fn pair_preference(&self, source: &str, target: &str) -> Option<&[String]> {
        self.preferences
            .get(&(source.to_string(), target.to_string()))
            .map(|v| v.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ProviderError;
    use std::sync::atomic::AtomicUsize;

    struct ScriptedTranslator {
        name: &'static str,
        fail: bool,
        calls: AtomicUsize,
    }

    impl ScriptedTranslator {
        fn new(name: &'static str, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                name,
                fail,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl TranslationProvider for ScriptedTranslator {
        fn name(&self) -> &str {
            self.name
        }

        fn supported_languages(&self) -> Vec<String> {
            vec!["ja".to_string(), "en".to_string()]
        }

        async fn translate(
            &self,
            text: &str,
            source: &str,
            target: &str,
            _context: Option<&TaskContext>,
        ) -> ProviderResult<TranslationResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ProviderError::Api(format!("{} is down", self.name)));
            }
            Ok(TranslationResult::new(
                format!("{}:{}", self.name, text),
                source,
                target,
                0.9,
                self.name,
                "api",
            ))
        }
    }

    async fn service() -> TranslationService {
        let service = TranslationService::new(TranslateApiConfig::default());
        service.initialize(&ProviderRegistry::new()).await;
        service
    }

    #[test]
    fn test_detect_language() {
        assert_eq!(detect_language(""), "unknown");
        assert_eq!(detect_language("123 !?"), "unknown");
        assert_eq!(detect_language("hello"), "en");
        assert_eq!(detect_language("こんにちは"), "ja");
        assert_eq!(detect_language("I like すし"), "en");
        assert_eq!(detect_language("すしが好き ok"), "ja");
    }

    #[test]
    fn test_detect_language_threshold_is_exclusive() {
        // 3 kana of 10 letters sits exactly on the threshold.
        assert_eq!(detect_language("abcdefg あいう"), "en");
        assert_eq!(detect_language("abcdef あいうえ"), "ja");
    }

    #[tokio::test]
    async fn test_auto_detect_uses_dictionary() {
        let service = service().await;
        let result = service.translate("こんにちは", "auto", "en", None, None).await;
        assert_eq!(result.translated_text, "Hello");
        assert_eq!(result.source_language, "ja");
    }

    #[tokio::test]
    async fn test_dictionary_round_trip() {
        let service = service().await;
        let there = service.translate("こんにちは", "ja", "en", Some("simple"), None).await;
        let back = service
            .translate(&there.translated_text, "en", "ja", Some("simple"), None)
            .await;
        assert_eq!(back.translated_text, "こんにちは");
    }

    #[tokio::test]
    async fn test_unregistered_provider_falls_back_to_chain() {
        let service = service().await;
        let result = service.translate("ありがとう", "ja", "en", Some("deepl"), None).await;
        assert_eq!(result.translated_text, "Thank you");
        assert_eq!(result.provider, "simple");
    }

    #[tokio::test]
    async fn test_explicit_provider_wins_without_chain() {
        let service = service().await;
        let google = ScriptedTranslator::new("google", false);
        let anthropic = ScriptedTranslator::new("anthropic", false);
        service.register(google.clone()).await;
        service.register(anthropic.clone()).await;

        let result = service.translate("猫", "ja", "en", Some("anthropic"), None).await;
        assert_eq!(result.provider, "anthropic");
        assert_eq!(anthropic.calls.load(Ordering::SeqCst), 1);
        assert_eq!(google.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failing_explicit_provider_walks_chain() {
        let service = service().await;
        let anthropic = ScriptedTranslator::new("anthropic", true);
        let google = ScriptedTranslator::new("google", true);
        service.register(anthropic.clone()).await;
        service.register(google.clone()).await;

        let result = service.translate("はい", "ja", "en", Some("anthropic"), None).await;
        assert_eq!(result.translated_text, "Yes");
        // Once as the explicit request, once more in the chain.
        assert_eq!(anthropic.calls.load(Ordering::SeqCst), 2);
        assert_eq!(google.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhausted_chain_returns_marker() {
        let service = TranslationService::new(TranslateApiConfig::default());
        // Replace the dictionary so every backend in the chain fails.
        service.initialize(&ProviderRegistry::new()).await;
        service.register(ScriptedTranslator::new("simple", true)).await;

        let result = service.translate("犬", "ja", "en", None, None).await;
        assert_eq!(result.translated_text, "[Translation failed for '犬']");
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.provider, "none");
        assert_eq!(result.method, "error");
    }

    #[tokio::test]
    async fn test_lazy_dictionary_without_initialize() {
        let service = TranslationService::new(TranslateApiConfig::default());
        let result = service.translate("hello", "en", "ja", None, None).await;
        assert_eq!(result.translated_text, "こんにちは");
        assert_eq!(service.get_available_providers().await, vec!["simple".to_string()]);
    }

    #[tokio::test]
    async fn test_supported_languages_per_provider() {
        let service = service().await;
        let languages = service.get_supported_languages().await;
        assert_eq!(languages.get("simple"), Some(&vec!["ja".to_string(), "en".to_string()]));
    }
}
