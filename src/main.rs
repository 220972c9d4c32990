use anyhow::Result;
use tracing_subscriber::EnvFilter;

use ai_nihongo::AgentConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let loaded = AgentConfig::load();
    let level = loaded
        .as_ref()
        .map(|c| c.log_level.clone())
        .unwrap_or_else(|_| "info".to_string());

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load config, using defaults");
            AgentConfig::default()
        }
    }
    .apply_env_overrides();

    ai_nihongo::run(config).await
}
