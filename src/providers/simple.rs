use super::*;
use async_trait::async_trait;

/// Canned replies for common phrases, checked in order.
const PHRASE_REPLIES: &[(&str, &str)] = &[
    ("こんにちは", "Hello! How can I help you with Japanese?"),
    ("ありがとう", "You're welcome! 😊"),
    ("おはよう", "Good morning!"),
    ("こんばんは", "Good evening!"),
    ("はい", "I understand!"),
    ("いいえ", "I see."),
    ("すみません", "No problem!"),
    ("さようなら", "Goodbye! またね！"),
];

/// Built-in responder that works without any model. Always available.
pub struct SimpleProvider {
    initialized: bool,
}

impl SimpleProvider {
    pub fn new() -> Self {
        Self { initialized: false }
    }

    fn find_response(&self, input: &str) -> String {
        for (phrase, reply) in PHRASE_REPLIES {
            if input.contains(phrase) {
                return reply.to_string();
            }
        }

        let input_lower = input.to_lowercase();
        if input_lower.contains("translate") {
            "I can help with basic translation, but please configure a proper AI model for better results."
                .to_string()
        } else if input_lower.contains("grammar") || input_lower.contains("explain") {
            "I can provide basic grammar help, but an AI model would give much better explanations."
                .to_string()
        } else if input_lower.contains("analyze") {
            "Text analysis is available through the Japanese processor. For AI insights, please configure an AI model."
                .to_string()
        } else {
            "I'm a simple responder. Please configure an AI model (like Ollama) for full functionality."
                .to_string()
        }
    }
}

impl Default for SimpleProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LLMProvider for SimpleProvider {
    fn name(&self) -> &str {
        "simple"
    }

    fn capabilities(&self) -> CapabilityScores {
        CapabilityScores::new(1.0, 0.2, 0.4, 1.0)
    }

    async fn initialize(&mut self, _model_hint: Option<&str>) -> ProviderResult<()> {
        self.initialized = true;
        tracing::info!("Simple provider initialized");
        Ok(())
    }

    async fn generate(
        &self,
        prompt: &str,
        context: Option<&str>,
        _options: &GenerationOptions,
    ) -> ProviderResult<String> {
        if !self.initialized {
            return Err(ProviderError::NotInitialized(self.name().to_string()));
        }
        let full_prompt = match context {
            Some(ctx) => format!("{}\n{}", ctx, prompt),
            None => prompt.to_string(),
        };
        Ok(self.find_response(&full_prompt))
    }

    fn is_ready(&self) -> bool {
        self.initialized
    }
}
