use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ANTHROPIC_API_KEY_VAR: &str = "ANTHROPIC_API_KEY";
pub const GROQ_API_KEY_VAR: &str = "GROQ_API_KEY";
pub const GOOGLE_TRANSLATE_API_KEY_VAR: &str = "GOOGLE_TRANSLATE_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub anthropic: HostedModelConfig,
    #[serde(default = "HostedModelConfig::groq")]
    pub groq: HostedModelConfig,
    #[serde(default)]
    pub google_translate: TranslateApiConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub agent: AgentSettings,
}

/// Local model server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
    /// Deadline for the liveness probe run at startup.
    pub probe_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub pull_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostedModelConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    pub history_capacity: usize,
    pub history_retain: usize,
    pub recent_history_limit: usize,
    pub retrieval_limit: usize,
    pub augmentation_limit: usize,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.1".to_string(),
            probe_timeout_secs: 2,
            request_timeout_secs: 30,
            pull_timeout_secs: 300,
        }
    }
}

impl Default for HostedModelConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.anthropic.com/v1".to_string(),
            model: "claude-3-haiku-20240307".to_string(),
            timeout_secs: 30,
        }
    }
}

impl HostedModelConfig {
    pub fn groq() -> Self {
        Self {
            base_url: "https://api.groq.com/openai/v1".to_string(),
            model: "llama-3.1-8b-instant".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for TranslateApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://translation.googleapis.com/language/translate/v2".to_string(),
            timeout_secs: 15,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 500,
        }
    }
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            history_capacity: 1000,
            history_retain: 500,
            recent_history_limit: 5,
            retrieval_limit: 5,
            augmentation_limit: 3,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            ollama: OllamaConfig::default(),
            anthropic: HostedModelConfig::default(),
            groq: HostedModelConfig::groq(),
            google_translate: TranslateApiConfig::default(),
            generation: GenerationConfig::default(),
            agent: AgentSettings::default(),
        }
    }
}

impl AgentConfig {
    /// Loads the user config, writing the defaults on first run.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_file_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let default_config = Self::default();
            default_config.save()?;
            Ok(default_config)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config at {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Invalid config at {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        Ok(())
    }

    fn config_file_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find home directory"))?;
        Ok(home.join(".config").join("ai-nihongo").join("config.toml"))
    }

    /// `OLLAMA_BASE_URL` and `OLLAMA_MODEL` win over the file.
    pub fn apply_env_overrides(mut self) -> Self {
        if let Some(base_url) = env_value("OLLAMA_BASE_URL") {
            self.ollama.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Some(model) = env_value("OLLAMA_MODEL") {
            self.ollama.model = model;
        }
        self
    }
}

/// Reads an environment variable, treating empty values as absent.
pub fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
