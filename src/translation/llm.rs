use super::*;
use crate::providers::{GenerationOptions, LLMProvider};

fn language_name(code: &str) -> &str {
    match code {
        "ja" => "Japanese",
        "en" => "English",
        "zh" => "Chinese",
        "ko" => "Korean",
        "es" => "Spanish",
        "fr" => "French",
        "de" => "German",
        "it" => "Italian",
        "pt" => "Portuguese",
        "ru" => "Russian",
        other => other,
    }
}

/// Uses a general language model as a translation backend.
pub struct LlmTranslator {
    provider: Arc<dyn LLMProvider>,
    name: String,
}

impl LlmTranslator {
    /// Registered under the wrapped provider's name so pair chains can refer to it.
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        let name = provider.name().to_string();
        Self { provider, name }
    }

    fn build_prompt(text: &str, source: &str, target: &str, context: Option<&TaskContext>) -> String {
        let source_name = language_name(source);
        let target_name = language_name(target);

        match context.and_then(|c| c.analysis_context()) {
            Some(analysis) => format!(
                "Please translate the following {} text to {}.\n\
                 The text has been analyzed and contains the following linguistic information: {}\n\
                 Provide only the translation, no explanations or additional text.\n\n\
                 Text to translate: {}\n\nTranslation:",
                source_name, target_name, analysis, text
            ),
            None => format!(
                "Please translate the following text from {} to {}.\n\
                 Provide only the translation, no explanations or additional text.\n\n\
                 Text to translate: {}\n\nTranslation:",
                source_name, target_name, text
            ),
        }
    }
}

#[async_trait]
impl TranslationProvider for LlmTranslator {
    fn name(&self) -> &str {
        &self.name
    }

    fn supported_languages(&self) -> Vec<String> {
        ["ja", "en", "zh", "ko", "es", "fr", "de", "it", "pt", "ru"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
        context: Option<&TaskContext>,
    ) -> ProviderResult<TranslationResult> {
        let prompt = Self::build_prompt(text, source, target, context);
        let options = GenerationOptions {
            temperature: Some(0.3),
            max_tokens: None,
        };
        let translated = self.provider.generate(&prompt, None, &options).await?;

        Ok(TranslationResult::new(
            translated.trim(),
            source,
            target,
            LLM_CONFIDENCE,
            format!("llm_{}", self.name),
            "llm_generation",
        ))
    }
}
