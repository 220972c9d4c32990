use super::*;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{env_value, HostedModelConfig, ANTHROPIC_API_KEY_VAR};

// Anthropic API structures
#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    messages: Vec<AnthropicMessage>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    system: &'a str,
}

#[derive(Debug, Serialize, Deserialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: String,
}

/// Hosted Claude backend. Needs `ANTHROPIC_API_KEY`.
pub struct AnthropicProvider {
    config: HostedModelConfig,
    defaults: GenerationOptions,
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
}

impl AnthropicProvider {
    pub fn new(config: HostedModelConfig, defaults: GenerationOptions) -> ProviderResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        let model = config.model.clone();

        Ok(Self {
            config,
            defaults,
            client,
            api_key: None,
            model,
        })
    }
}

#[async_trait]
impl LLMProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn capabilities(&self) -> CapabilityScores {
        CapabilityScores::new(0.8, 0.9, 0.85, 0.2)
    }

    async fn initialize(&mut self, model_hint: Option<&str>) -> ProviderResult<()> {
        let api_key = env_value(ANTHROPIC_API_KEY_VAR)
            .ok_or_else(|| ProviderError::MissingApiKey(ANTHROPIC_API_KEY_VAR.to_string()))?;

        self.api_key = Some(api_key);
        if let Some(model) = model_hint {
            self.model = model.to_string();
        }
        tracing::info!(model = %self.model, "Anthropic provider initialized");
        Ok(())
    }

    async fn generate(
        &self,
        prompt: &str,
        context: Option<&str>,
        options: &GenerationOptions,
    ) -> ProviderResult<String> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| ProviderError::NotInitialized(self.name().to_string()))?;

        let url = format!("{}/messages", self.config.base_url.trim_end_matches('/'));
        let request = AnthropicRequest {
            model: &self.model,
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: compose_prompt(prompt, context),
            }],
            max_tokens: options.max_tokens_or(self.defaults.max_tokens_or(500)),
            temperature: options.temperature.or(self.defaults.temperature),
            system: TUTOR_PREAMBLE,
        };

        let response = self
            .client
            .post(&url)
            .header("x-api-key", api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;
        let response = error_for_status(response).await?;
        let body: AnthropicResponse = response.json().await?;

        let content = body
            .content
            .iter()
            .filter(|block| block.content_type == "text")
            .map(|block| block.text.as_str())
            .collect::<Vec<_>>()
            .join("");

        if content.is_empty() {
            return Err(ProviderError::MalformedResponse(
                "No text content in Anthropic response".to_string(),
            ));
        }
        Ok(content)
    }

    fn is_ready(&self) -> bool {
        self.api_key.is_some()
    }
}
