use super::*;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{env_value, HostedModelConfig, GROQ_API_KEY_VAR};

// OpenAI-compatible chat completion structures
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Hosted fast-inference backend on the OpenAI-compatible Groq API. Needs `GROQ_API_KEY`.
pub struct GroqProvider {
    config: HostedModelConfig,
    defaults: GenerationOptions,
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
}

impl GroqProvider {
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
impl LLMProvider for GroqProvider {
    fn name(&self) -> &str {
        "groq"
    }

    fn capabilities(&self) -> CapabilityScores {
        CapabilityScores::new(0.95, 0.8, 0.7, 0.9)
    }

    async fn initialize(&mut self, model_hint: Option<&str>) -> ProviderResult<()> {
        let api_key = env_value(GROQ_API_KEY_VAR)
            .ok_or_else(|| ProviderError::MissingApiKey(GROQ_API_KEY_VAR.to_string()))?;

        self.api_key = Some(api_key);
        if let Some(model) = model_hint {
            self.model = model.to_string();
        }
        tracing::info!(model = %self.model, "Groq provider initialized");
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

        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: TUTOR_PREAMBLE.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: compose_prompt(prompt, context),
                },
            ],
            temperature: options.temperature.or(self.defaults.temperature),
            max_tokens: options.max_tokens.or(self.defaults.max_tokens),
            stream: false,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;
        let response = error_for_status(response).await?;
        let body: ChatCompletionResponse = response.json().await?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| ProviderError::MalformedResponse("No choices in response".to_string()))
    }

    fn is_ready(&self) -> bool {
        self.api_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_initialize_requires_credential() {
        std::env::remove_var(GROQ_API_KEY_VAR);
        let mut provider =
            GroqProvider::new(HostedModelConfig::groq(), GenerationOptions::default()).unwrap();
        let err = provider.initialize(None).await.unwrap_err();
        assert_eq!(err, ProviderError::MissingApiKey(GROQ_API_KEY_VAR.to_string()));
        assert!(!provider.is_ready());
    }

    #[test]
    fn test_request_carries_system_message() {
        let request = ChatCompletionRequest {
            model: "m",
            messages: vec![ChatMessage {
                role: "system".to_string(),
                content: TUTOR_PREAMBLE.to_string(),
            }],
            temperature: None,
            max_tokens: Some(10),
            stream: false,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert!(json.get("temperature").is_none());
        assert_eq!(json["max_tokens"], 10);
    }
}
