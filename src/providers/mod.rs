//! Providers module - language-model backends
//!
//! This module defines the [`ChatModel`] contract consumed by the agent loop
//! and one implementation, [`OpenAICompatModel`], which covers every backend
//! speaking the Chat Completions API. [`build_model`] picks the backend from
//! configuration.

pub mod openai;
mod types;

use std::sync::Arc;

use tracing::info;

use crate::config::{Config, ProviderConfig};
use crate::error::Result;

pub use crate::session::ToolCall;
pub use openai::OpenAICompatModel;
pub use types::{ChatModel, ToolDefinition};

pub const OPENROUTER_API_BASE: &str = "https://openrouter.ai/api/v1";
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
pub const DEEPSEEK_API_BASE: &str = "https://api.deepseek.com/v1";
pub const OLLAMA_API_BASE: &str = "http://localhost:11434/v1";

/// Provider names in selection order.
pub const PROVIDER_PRIORITY: &[&str] = &["openrouter", "openai", "deepseek", "ollama"];

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Resolves `(api_key, api_base)` for `name` if that provider is configured.
///
/// Keyed providers need an API key. Ollama needs only a base URL.
pub fn resolve_provider(config: &Config, name: &str) -> Option<(String, String)> {
    let (entry, default_base, needs_key): (&ProviderConfig, &str, bool) = match name {
        "openrouter" => (&config.providers.openrouter, OPENROUTER_API_BASE, true),
        "openai" => (&config.providers.openai, OPENAI_API_BASE, true),
        "deepseek" => (&config.providers.deepseek, DEEPSEEK_API_BASE, true),
        "ollama" => (&config.providers.ollama, OLLAMA_API_BASE, false),
        _ => return None,
    };

    let key = non_empty(&entry.api_key);
    let base = non_empty(&entry.base_url);
    if needs_key {
        key.map(|k| (k.to_string(), base.unwrap_or(default_base).to_string()))
    } else {
        base.map(|b| (key.unwrap_or_default().to_string(), b.to_string()))
    }
}

/// Names of every configured provider, in selection order.
pub fn configured_providers(config: &Config) -> Vec<&'static str> {
    PROVIDER_PRIORITY
        .iter()
        .copied()
        .filter(|name| resolve_provider(config, name).is_some())
        .collect()
}

/// Builds the model for the first configured provider.
///
/// Returns `Ok(None)` when no provider is configured; the agent then answers
/// every turn with "No model configured".
pub fn build_model(config: &Config) -> Result<Option<Arc<dyn ChatModel>>> {
    let defaults = &config.agents.defaults;
    for name in PROVIDER_PRIORITY {
        if let Some((api_key, api_base)) = resolve_provider(config, name) {
            info!(provider = %name, model = %defaults.model, base = %api_base, "Using model provider");
            let model = OpenAICompatModel::new(name, &api_key, &api_base, &defaults.model)
                .with_max_tokens(defaults.max_tokens)
                .with_temperature(defaults.temperature);
            return Ok(Some(Arc::new(model)));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_provider_configured() {
        let config = Config::default();
        assert!(build_model(&config).unwrap().is_none());
        assert!(configured_providers(&config).is_empty());
    }

    #[test]
    fn test_openrouter_wins_over_openai() {
        let mut config = Config::default();
        config.providers.openai.api_key = Some("sk-openai".into());
        config.providers.openrouter.api_key = Some("sk-or".into());

        let model = build_model(&config).unwrap().unwrap();
        assert_eq!(model.name(), "openrouter");
        assert_eq!(configured_providers(&config), vec!["openrouter", "openai"]);
    }

    #[test]
    fn test_default_base_urls() {
        let mut config = Config::default();
        config.providers.deepseek.api_key = Some("sk-ds".into());

        let (key, base) = resolve_provider(&config, "deepseek").unwrap();
        assert_eq!(key, "sk-ds");
        assert_eq!(base, DEEPSEEK_API_BASE);
    }

    #[test]
    fn test_blank_key_is_not_configured() {
        let mut config = Config::default();
        config.providers.openai.api_key = Some("   ".into());
        assert!(resolve_provider(&config, "openai").is_none());
    }

    #[test]
    fn test_ollama_needs_base_url_only() {
        let mut config = Config::default();
        assert!(resolve_provider(&config, "ollama").is_none());

        config.providers.ollama.base_url = Some("http://gpu-box:11434/v1".into());
        let (key, base) = resolve_provider(&config, "ollama").unwrap();
        assert!(key.is_empty());
        assert_eq!(base, "http://gpu-box:11434/v1");

        let model = build_model(&config).unwrap().unwrap();
        assert_eq!(model.name(), "ollama");
    }
}
