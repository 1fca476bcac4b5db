//! Configuration type definitions for Golem
//!
//! This module defines all configuration structs used throughout the runtime.
//! All types implement serde traits for JSON serialization and have sensible defaults,
//! so a config file only needs the keys it wants to change.

use serde::{Deserialize, Serialize};

/// Main configuration struct for Golem
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Agent configuration (model, tokens, iterations, workspace)
    pub agents: AgentConfig,
    /// Channel configurations
    pub channels: ChannelsConfig,
    /// Model provider configurations
    pub providers: ProvidersConfig,
    /// Server bind settings
    pub gateway: GatewayConfig,
    /// Tools configuration
    pub tools: ToolsConfig,
    /// Message bus configuration
    pub bus: BusConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Agent configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Default agent settings
    pub defaults: AgentDefaults,
}

/// Default agent settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentDefaults {
    /// Workspace directory path, used when `workspace_mode` is `path`
    pub workspace: String,
    /// How the workspace is chosen: `default`, `cwd` or `path`
    pub workspace_mode: String,
    /// Model name sent to the provider
    pub model: String,
    /// Maximum tokens for responses
    pub max_tokens: u32,
    /// Temperature for generation
    pub temperature: f32,
    /// Maximum model calls per turn
    pub max_tool_iterations: usize,
    /// Trailing session entries sent as context
    pub history_limit: usize,
}

impl Default for AgentDefaults {
    fn default() -> Self {
        Self {
            workspace: "~/.golem/workspace".to_string(),
            workspace_mode: "default".to_string(),
            model: "anthropic/claude-sonnet-4-5".to_string(),
            max_tokens: 8192,
            temperature: 0.7,
            max_tool_iterations: 20,
            history_limit: 50,
        }
    }
}

// ============================================================================
// Channel Configurations
// ============================================================================

/// All channel configurations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelsConfig {
    /// Telegram bot configuration
    pub telegram: TelegramConfig,
}

/// Telegram channel configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Whether the channel is enabled
    pub enabled: bool,
    /// Bot token from BotFather
    pub token: String,
    /// Allowlist of user IDs/usernames (empty = allow all)
    pub allow_from: Vec<String>,
}

// ============================================================================
// Provider Configurations
// ============================================================================

/// Model provider configurations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub openrouter: ProviderConfig,
    pub openai: ProviderConfig,
    pub deepseek: ProviderConfig,
    pub ollama: ProviderConfig,
}

/// A single provider's credentials and endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// API key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Override for the API base URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

// ============================================================================
// Gateway, Tools, Bus
// ============================================================================

/// Server bind settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 18790,
        }
    }
}

/// Tools configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Shell tool settings
    pub exec: ExecConfig,
}

/// Shell (`exec`) tool configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecConfig {
    /// Command timeout in seconds
    pub timeout: u64,
    /// Keep the working directory inside the workspace
    pub restrict_to_workspace: bool,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            timeout: 60,
            restrict_to_workspace: false,
        }
    }
}

/// Message bus configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Capacity of each of the inbound and outbound queues
    pub capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            capacity: crate::bus::DEFAULT_BUFFER_SIZE,
        }
    }
}

// ============================================================================
// Logging
// ============================================================================

/// Output format for log lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line human-readable output
    Pretty,
    /// Compact single-line output
    #[default]
    Component,
    /// JSON lines
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Default filter directive; `RUST_LOG` takes precedence
    pub level: String,
    /// Append JSON logs to this file instead of stdout
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: "info".to_string(),
            file: None,
        }
    }
}
