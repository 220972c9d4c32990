pub mod agent;
pub mod analysis;
pub mod classifier;
pub mod config;
pub mod context;
pub mod orchestrator;
pub mod providers;
pub mod retrieval;
pub mod translation;

pub use agent::{AgentResponse, JapaneseAgent, APOLOGY_MESSAGE};
pub use classifier::{classify, TaskCategory, TaskClassifier};
pub use config::AgentConfig;
pub use context::TaskContext;
pub use orchestrator::{Orchestrator, NO_MODELS_MESSAGE_PREFIX};
pub use providers::{LLMProvider, ProviderError, ProviderResult};
pub use translation::{detect_language, TranslationResult, TranslationService};

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

const PROMPT: &str = "> ";

/// Line-oriented chat loop over stdin/stdout. `/quit` exits.
pub async fn run(config: AgentConfig) -> Result<()> {
    let agent = JapaneseAgent::from_config(&config)?;
    agent.initialize().await?;

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let user_id = format!("cli-{}", uuid::Uuid::new_v4());

    stdout
        .write_all(b"AI-Nihongo ready. Type a message, or /quit to exit.\n")
        .await?;
    stdout.write_all(PROMPT.as_bytes()).await?;
    stdout.flush().await?;

    while let Some(line) = lines.next_line().await? {
        let message = line.trim();
        if message == "/quit" {
            break;
        }
        if !message.is_empty() {
            let reply = agent.process_message(message, Some(&user_id)).await;
            let task = reply
                .task_type
                .map(|t| t.to_string())
                .unwrap_or_else(|| "error".to_string());
            let output = format!("[{} via {}]\n{}\n", task, reply.provider_used, reply.response);
            stdout.write_all(output.as_bytes()).await?;
        }
        stdout.write_all(PROMPT.as_bytes()).await?;
        stdout.flush().await?;
    }

    tracing::info!("Session ended");
    Ok(())
}
