use super::*;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::OllamaConfig;

// Ollama native API structures
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[derive(Debug, Serialize)]
struct ModelRequest<'a> {
    name: &'a str,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

/// Local model server speaking the Ollama HTTP API.
pub struct OllamaProvider {
    config: OllamaConfig,
    defaults: GenerationOptions,
    client: reqwest::Client,
    model: String,
    initialized: bool,
}

impl OllamaProvider {
    pub fn new(config: OllamaConfig, defaults: GenerationOptions) -> ProviderResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        let model = config.model.clone();

        Ok(Self {
            config,
            defaults,
            client,
            model,
            initialized: false,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    /// Bounded liveness check; also returns the installed model names.
    pub async fn probe(&self) -> ProviderResult<Vec<String>> {
        let url = format!("{}/api/tags", self.base_url());
        let response = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(self.config.probe_timeout_secs))
            .send()
            .await
            .map_err(|e| {
                ProviderError::Unavailable(format!("ollama at {} ({})", self.base_url(), e))
            })?;

        if !response.status().is_success() {
            return Err(ProviderError::Unavailable(format!(
                "ollama at {} returned {}",
                self.base_url(),
                response.status()
            )));
        }

        let tags: TagsResponse = response.json().await?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Pulls the model when the server does not know it. Never fails.
    async fn ensure_model(&self, model: &str) {
        let show_url = format!("{}/api/show", self.base_url());
        let present = match self
            .client
            .post(&show_url)
            .json(&ModelRequest { name: model })
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                tracing::warn!(model, error = %e, "Could not check Ollama model");
                return;
            }
        };

        if present {
            return;
        }

        tracing::info!(model, "Pulling Ollama model");
        let pull_url = format!("{}/api/pull", self.base_url());
        let pulled = self
            .client
            .post(&pull_url)
            .timeout(Duration::from_secs(self.config.pull_timeout_secs))
            .json(&serde_json::json!({ "name": model, "stream": false }))
            .send()
            .await;

        match pulled {
            Ok(resp) if resp.status().is_success() => {
                tracing::info!(model, "Ollama model pulled");
            }
            Ok(resp) => tracing::warn!(model, status = %resp.status(), "Could not pull model"),
            Err(e) => tracing::warn!(model, error = %e, "Could not pull model"),
        }
    }
}

#[async_trait]
impl LLMProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn capabilities(&self) -> CapabilityScores {
        CapabilityScores::new(0.7, 0.8, 0.7, 1.0)
    }

    async fn initialize(&mut self, model_hint: Option<&str>) -> ProviderResult<()> {
        // No retry: an unreachable server keeps this provider out for the session.
        self.probe().await?;

        if let Some(model) = model_hint {
            self.model = model.to_string();
        }
        let model = self.model.clone();
        self.ensure_model(&model).await;

        self.initialized = true;
        tracing::info!(model = %self.model, "Ollama provider initialized");
        Ok(())
    }

    async fn generate(
        &self,
        prompt: &str,
        context: Option<&str>,
        options: &GenerationOptions,
    ) -> ProviderResult<String> {
        if !self.initialized {
            return Err(ProviderError::NotInitialized(self.name().to_string()));
        }

        let full_prompt = compose_prompt(prompt, context);
        let request = GenerateRequest {
            model: &self.model,
            prompt: format!("{}\n\nUser: {}\n\nAssistant:", TUTOR_PREAMBLE, full_prompt),
            stream: false,
            options: GenerateOptions {
                temperature: options.temperature_or(self.defaults.temperature_or(0.7)),
                num_predict: options.max_tokens_or(self.defaults.max_tokens_or(500)),
            },
        };

        let url = format!("{}/api/generate", self.base_url());
        tracing::debug!(model = %self.model, "Sending Ollama generate request");

        let response = self.client.post(&url).json(&request).send().await?;
        let response = error_for_status(response).await?;
        let body: GenerateResponse = response.json().await?;

        let text = body.response.trim();
        if text.is_empty() {
            return Err(ProviderError::MalformedResponse(
                "Empty response from Ollama".to_string(),
            ));
        }
        Ok(text.to_string())
    }

    fn is_ready(&self) -> bool {
        self.initialized
    }
}
