//! Shared CLI helpers used across multiple command handlers.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use golem::agent::{AgentLoop, AgentSettings, ContextBuilder};
use golem::bus::MessageBus;
use golem::config::Config;
use golem::providers::{build_model, configured_providers, PROVIDER_PRIORITY};
use golem::session::SessionManager;

/// Create and configure an agent from config.
///
/// A missing model is not fatal: the loop answers "No model configured"
/// until a provider is set up.
pub(crate) async fn create_agent(config: &Config, bus: Arc<MessageBus>) -> Result<Arc<AgentLoop>> {
    let settings =
        AgentSettings::from_config(config).with_context(|| "Invalid workspace configuration")?;
    let workspace = config.workspace_path_checked()?;

    let model = build_model(config).with_context(|| "Failed to build chat model")?;
    match &model {
        Some(_) => info!(model = %config.agents.defaults.model, "Chat model ready"),
        None => warn!("No model configured"),
    }

    let sessions =
        Arc::new(SessionManager::new().with_context(|| "Failed to open session store")?);
    let context_builder = ContextBuilder::new().with_workspace_files(&workspace);

    let agent = AgentLoop::with_context_builder(settings, bus, sessions, model, context_builder);
    agent
        .register_default_tools(&config.tools.exec)
        .await
        .with_context(|| "Failed to register tools")?;
    info!("Registered {} tools", agent.tool_count().await);

    Ok(Arc::new(agent))
}

/// Print a hint to stderr when no provider has credentials.
pub(crate) fn warn_if_no_provider(config: &Config) {
    if configured_providers(config).is_empty() {
        eprintln!("Warning: No AI provider configured. Set GOLEM_PROVIDERS_OPENROUTER_API_KEY");
        eprintln!("or add a provider to {:?}", Config::path());
        eprintln!("Supported providers: {}", PROVIDER_PRIORITY.join(", "));
        eprintln!();
    }
}
