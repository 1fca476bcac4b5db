//! Configuration management for Golem
//!
//! This module provides configuration loading, saving and workspace resolution.
//! Configuration is loaded from `~/.golem/config.json` with environment variable overrides.

mod types;

pub use types::*;

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{GolemError, Result};

/// Prefix of every environment override
const ENV_PREFIX: &str = "GOLEM_";

impl Config {
    /// Returns the Golem configuration directory path (~/.golem)
    pub fn dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".golem")
    }

    /// Returns the path to the config file (~/.golem/config.json)
    pub fn path() -> PathBuf {
        Self::dir().join("config.json")
    }

    /// Load configuration from the default path with environment overrides.
    ///
    /// If the config file doesn't exist, the defaults are written there first.
    /// Environment variables can override config values using the pattern:
    /// `GOLEM_SECTION_SUBSECTION_KEY`
    pub fn load() -> Result<Self> {
        let path = Self::path();
        if !path.exists() {
            if let Err(e) = Config::default().save_to_path(&path) {
                warn!(path = %path.display(), error = %e, "Could not write default config");
            }
        }
        Self::load_from_path(&path)
    }

    /// Load configuration from a specific path with environment overrides.
    ///
    /// A missing file yields the defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_json::from_str(&content).map_err(|e| {
                GolemError::Config(format!("invalid config file {}: {}", path.display(), e))
            })?
        } else {
            debug!(path = %path.display(), "Config file not found, using defaults");
            Config::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply `GOLEM_*` environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(format!("{}{}", ENV_PREFIX, key)).ok());
    }

    /// Apply overrides from `lookup`, which receives keys without the
    /// `GOLEM_` prefix. Unparsable numbers and booleans are ignored.
    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parsed<T: std::str::FromStr>(value: Option<String>) -> Option<T> {
            value.and_then(|v| v.trim().parse().ok())
        }

        // Agent defaults
        let defaults = &mut self.agents.defaults;
        if let Some(val) = lookup("AGENTS_DEFAULTS_MODEL") {
            defaults.model = val;
        }
        if let Some(val) = lookup("AGENTS_DEFAULTS_WORKSPACE") {
            defaults.workspace = val;
        }
        if let Some(val) = lookup("AGENTS_DEFAULTS_WORKSPACE_MODE") {
            defaults.workspace_mode = val;
        }
        if let Some(v) = parsed(lookup("AGENTS_DEFAULTS_MAX_TOOL_ITERATIONS")) {
            defaults.max_tool_iterations = v;
        }

        // Telegram
        if let Some(val) = lookup("CHANNELS_TELEGRAM_TOKEN") {
            self.channels.telegram.token = val;
        }
        if let Some(v) = parsed(lookup("CHANNELS_TELEGRAM_ENABLED")) {
            self.channels.telegram.enabled = v;
        }

        // Providers
        let providers = [
            ("OPENROUTER", &mut self.providers.openrouter),
            ("OPENAI", &mut self.providers.openai),
            ("DEEPSEEK", &mut self.providers.deepseek),
            ("OLLAMA", &mut self.providers.ollama),
        ];
        for (name, provider) in providers {
            if let Some(val) = lookup(&format!("PROVIDERS_{}_API_KEY", name)) {
                provider.api_key = Some(val);
            }
            if let Some(val) = lookup(&format!("PROVIDERS_{}_BASE_URL", name)) {
                provider.base_url = Some(val);
            }
        }

        // Exec tool
        if let Some(v) = parsed(lookup("TOOLS_EXEC_TIMEOUT")) {
            self.tools.exec.timeout = v;
        }
        if let Some(v) = parsed(lookup("TOOLS_EXEC_RESTRICT_TO_WORKSPACE")) {
            self.tools.exec.restrict_to_workspace = v;
        }
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::path())
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Resolves the workspace directory from `workspace_mode`.
    ///
    /// | mode               | workspace                                   |
    /// |--------------------|---------------------------------------------|
    /// | `default` or empty | `~/.golem/workspace`                        |
    /// | `cwd`              | the current directory                       |
    /// | `path`             | `agents.defaults.workspace`, `~` expanded   |
    ///
    /// Modes are matched case-insensitively.
    ///
    /// # Errors
    /// `GolemError::Config` for an unknown mode, an empty workspace in `path`
    /// mode, or an unreadable current directory.
    pub fn workspace_path_checked(&self) -> Result<PathBuf> {
        let mode = self.agents.defaults.workspace_mode.trim().to_lowercase();
        match mode.as_str() {
            "" | "default" => Ok(Self::dir().join("workspace")),
            "cwd" => std::env::current_dir()
                .map_err(|e| GolemError::Config(format!("failed to resolve cwd: {}", e))),
            "path" => {
                let workspace = self.agents.defaults.workspace.trim();
                if workspace.is_empty() {
                    return Err(GolemError::Config(
                        "workspace is required when workspace_mode=path".into(),
                    ));
                }
                Ok(expand_home(workspace))
            }
            _ => Err(GolemError::Config(format!(
                "unknown workspace_mode: {}",
                self.agents.defaults.workspace_mode.trim()
            ))),
        }
    }

    /// Like [`workspace_path_checked`](Self::workspace_path_checked), falling
    /// back to `~/.golem/workspace` on error.
    pub fn workspace_path(&self) -> PathBuf {
        self.workspace_path_checked()
            .unwrap_or_else(|_| Self::dir().join("workspace"))
    }
}

/// Expand ~ to home directory in a path string
fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix('~') {
        if let Some(home) = dirs::home_dir() {
            let rest = rest.trim_start_matches(['/', '\\']);
            if rest.is_empty() {
                return home;
            }
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn with_env(config: &mut Config, vars: &[(&str, &str)]) {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        config.apply_overrides(|key| vars.get(key).cloned());
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.agents.defaults.max_tokens, 8192);
        assert_eq!(config.agents.defaults.temperature, 0.7);
        assert_eq!(config.agents.defaults.max_tool_iterations, 20);
        assert_eq!(config.agents.defaults.history_limit, 50);
        assert_eq!(config.agents.defaults.workspace_mode, "default");
        assert_eq!(config.gateway.host, "0.0.0.0");
        assert_eq!(config.gateway.port, 18790);
        assert_eq!(config.tools.exec.timeout, 60);
        assert!(!config.tools.exec.restrict_to_workspace);
        assert_eq!(config.bus.capacity, 100);
        assert!(!config.channels.telegram.enabled);
    }

    #[test]
    fn test_config_partial_json() {
        let json = r#"{"gateway": {"port": 9090}, "tools": {"exec": {"timeout": 5}}}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.gateway.port, 9090);
        assert_eq!(config.gateway.host, "0.0.0.0");
        assert_eq!(config.tools.exec.timeout, 5);
        assert_eq!(config.agents.defaults.max_tool_iterations, 20);
    }

    #[test]
    fn test_channel_and_provider_configs() {
        let json = r#"{
            "channels": {
                "telegram": {
                    "enabled": true,
                    "token": "bot123:ABC",
                    "allow_from": ["user1", "user2"]
                }
            },
            "providers": {
                "openrouter": {"api_key": "sk-or"},
                "ollama": {"base_url": "http://localhost:11434/v1"}
            }
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();

        let telegram = &config.channels.telegram;
        assert!(telegram.enabled);
        assert_eq!(telegram.token, "bot123:ABC");
        assert_eq!(telegram.allow_from, vec!["user1", "user2"]);
        assert_eq!(config.providers.openrouter.api_key.as_deref(), Some("sk-or"));
        assert!(config.providers.openai.api_key.is_none());
        assert_eq!(
            config.providers.ollama.base_url.as_deref(),
            Some("http://localhost:11434/v1")
        );
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        with_env(
            &mut config,
            &[
                ("AGENTS_DEFAULTS_MODEL", "gpt-4o"),
                ("AGENTS_DEFAULTS_WORKSPACE_MODE", "cwd"),
                ("AGENTS_DEFAULTS_MAX_TOOL_ITERATIONS", "7"),
                ("CHANNELS_TELEGRAM_TOKEN", "tok"),
                ("CHANNELS_TELEGRAM_ENABLED", "true"),
                ("PROVIDERS_DEEPSEEK_API_KEY", "sk-ds"),
                ("PROVIDERS_OLLAMA_BASE_URL", "http://box:11434/v1"),
                ("TOOLS_EXEC_TIMEOUT", "15"),
                ("TOOLS_EXEC_RESTRICT_TO_WORKSPACE", "true"),
            ],
        );

        assert_eq!(config.agents.defaults.model, "gpt-4o");
        assert_eq!(config.agents.defaults.workspace_mode, "cwd");
        assert_eq!(config.agents.defaults.max_tool_iterations, 7);
        assert_eq!(config.channels.telegram.token, "tok");
        assert!(config.channels.telegram.enabled);
        assert_eq!(config.providers.deepseek.api_key.as_deref(), Some("sk-ds"));
        assert_eq!(
            config.providers.ollama.base_url.as_deref(),
            Some("http://box:11434/v1")
        );
        assert_eq!(config.tools.exec.timeout, 15);
        assert!(config.tools.exec.restrict_to_workspace);
    }

    #[test]
    fn test_env_override_bad_number_ignored() {
        let mut config = Config::default();
        with_env(&mut config, &[("TOOLS_EXEC_TIMEOUT", "soon")]);
        assert_eq!(config.tools.exec.timeout, 60);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/config.json");

        let mut config = Config::default();
        config.agents.defaults.model = "deepseek-chat".into();
        config.providers.deepseek.api_key = Some("sk-ds".into());
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded.agents.defaults.model, "deepseek-chat");
        assert_eq!(loaded.providers.deepseek.api_key.as_deref(), Some("sk-ds"));
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from_path(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config.gateway.port, 18790);
    }

    #[test]
    fn test_load_invalid_json_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = Config::load_from_path(&path).unwrap_err();
        assert!(matches!(err, GolemError::Config(_)));
    }

    #[test]
    fn test_workspace_default_mode() {
        let config = Config::default();
        assert_eq!(
            config.workspace_path_checked().unwrap(),
            Config::dir().join("workspace")
        );
    }

    #[test]
    fn test_workspace_cwd_mode() {
        let mut config = Config::default();
        config.agents.defaults.workspace_mode = "CWD".into();
        assert_eq!(
            config.workspace_path_checked().unwrap(),
            std::env::current_dir().unwrap()
        );
    }

    #[test]
    fn test_workspace_path_mode() {
        let mut config = Config::default();
        config.agents.defaults.workspace_mode = "path".into();
        config.agents.defaults.workspace = "/srv/golem".into();
        assert_eq!(
            config.workspace_path_checked().unwrap(),
            PathBuf::from("/srv/golem")
        );

        config.agents.defaults.workspace = "~/ws".into();
        let home = dirs::home_dir().unwrap();
        assert_eq!(config.workspace_path_checked().unwrap(), home.join("ws"));
    }

    #[test]
    fn test_workspace_path_mode_requires_path() {
        let mut config = Config::default();
        config.agents.defaults.workspace_mode = "path".into();
        config.agents.defaults.workspace = "  ".into();

        let err = config.workspace_path_checked().unwrap_err();
        assert!(err.to_string().contains("workspace is required"));
    }

    #[test]
    fn test_unknown_workspace_mode() {
        let mut config = Config::default();
        config.agents.defaults.workspace_mode = "cloud".into();

        let err = config.workspace_path_checked().unwrap_err();
        assert!(matches!(err, GolemError::Config(_)));
        assert!(err.to_string().contains("unknown workspace_mode: cloud"));
        assert_eq!(config.workspace_path(), Config::dir().join("workspace"));
    }

    #[test]
    fn test_expand_home() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(expand_home("~"), home);
        assert_eq!(expand_home("~/some/path"), home.join("some/path"));
        assert_eq!(expand_home("/absolute/path"), PathBuf::from("/absolute/path"));
        assert_eq!(expand_home("relative/path"), PathBuf::from("relative/path"));
    }
}
