//! OpenAI-compatible chat model
//!
//! One client for every backend that speaks the Chat Completions API:
//! OpenAI itself, OpenRouter, DeepSeek and Ollama's `/v1` endpoint.
//!
//! # Example
//!
//! ```rust,ignore
//! use golem::providers::{ChatModel, OpenAICompatModel};
//! use golem::session::Message;
//!
//! async fn example() {
//!     let model = OpenAICompatModel::new("openai", "sk-xxx", "https://api.openai.com/v1", "gpt-4o");
//!     let reply = model.generate(&[Message::user("Hello!")]).await.unwrap();
//!     println!("{}", reply.content);
//! }
//! ```

use std::sync::RwLock;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{GolemError, Result};
use crate::session::{Message, Role, ToolCall};

use super::{ChatModel, ToolDefinition};

// ============================================================================
// Wire types: request
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    /// Null for an assistant turn that only carries tool calls
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type", default = "function_type")]
    kind: String,
    function: WireFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunctionDef,
}

#[derive(Debug, Serialize)]
struct WireFunctionDef {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

fn function_type() -> String {
    "function".to_string()
}

// ============================================================================
// Wire types: response
// ============================================================================

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

// ============================================================================
// Model
// ============================================================================

/// Chat Completions client with a bound tool set.
pub struct OpenAICompatModel {
    provider: String,
    api_key: Option<String>,
    api_base: String,
    model: String,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    tools: RwLock<Vec<ToolDefinition>>,
    client: Client,
}

impl OpenAICompatModel {
    /// Create a client for `provider` at `api_base`.
    ///
    /// An empty `api_key` sends no `Authorization` header (Ollama).
    ///
    /// # Example
    /// ```
    /// use golem::providers::{ChatModel, OpenAICompatModel};
    ///
    /// let model = OpenAICompatModel::new("openrouter", "sk-or-xxx", "https://openrouter.ai/api/v1/", "gpt-4o");
    /// assert_eq!(model.name(), "openrouter");
    /// assert_eq!(model.api_base(), "https://openrouter.ai/api/v1");
    /// ```
    pub fn new(provider: &str, api_key: &str, api_base: &str, model: &str) -> Self {
        Self {
            provider: provider.to_string(),
            api_key: (!api_key.is_empty()).then(|| api_key.to_string()),
            api_base: api_base.trim_end_matches('/').to_string(),
            model: model.to_string(),
            max_tokens: None,
            temperature: None,
            tools: RwLock::new(Vec::new()),
            client: Client::new(),
        }
    }

    /// Sets the completion token cap (builder pattern).
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Sets the sampling temperature (builder pattern).
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Replaces the HTTP client, e.g. to set timeouts or a proxy.
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Number of tools currently bound.
    pub fn bound_tool_count(&self) -> usize {
        self.tools.read().map(|tools| tools.len()).unwrap_or(0)
    }

    fn build_request(&self, messages: &[Message]) -> ChatRequest {
        let tools = self
            .tools
            .read()
            .map(|tools| convert_tools(&tools))
            .unwrap_or_default();

        ChatRequest {
            model: self.model.clone(),
            messages: convert_messages(messages),
            tools: (!tools.is_empty()).then_some(tools),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}

// ============================================================================
// Conversion
// ============================================================================

fn role_str(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    }
}

fn convert_messages(messages: &[Message]) -> Vec<WireMessage> {
    messages
        .iter()
        .map(|msg| {
            let tool_calls = msg.tool_calls.as_ref().filter(|tcs| !tcs.is_empty()).map(|tcs| {
                tcs.iter()
                    .map(|tc| WireToolCall {
                        id: tc.id.clone(),
                        kind: function_type(),
                        function: WireFunctionCall {
                            name: tc.name.clone(),
                            arguments: tc.arguments.clone(),
                        },
                    })
                    .collect::<Vec<_>>()
            });

            WireMessage {
                role: role_str(msg.role),
                content: if msg.content.is_empty() && tool_calls.is_some() {
                    None
                } else {
                    Some(msg.content.clone())
                },
                tool_calls,
                tool_call_id: msg.tool_call_id.clone(),
            }
        })
        .collect()
}

fn convert_tools(tools: &[ToolDefinition]) -> Vec<WireTool> {
    tools
        .iter()
        .map(|t| WireTool {
            kind: "function",
            function: WireFunctionDef {
                name: t.name.clone(),
                description: t.description.clone(),
                parameters: t.parameters.clone(),
            },
        })
        .collect()
}

fn convert_response(response: ChatResponse) -> Message {
    let Some(choice) = response.choices.into_iter().next() else {
        return Message::assistant("");
    };

    let content = choice.message.content.unwrap_or_default();
    let tool_calls: Vec<ToolCall> = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|tc| ToolCall::new(&tc.id, &tc.function.name, &tc.function.arguments))
        .collect();

    if tool_calls.is_empty() {
        Message::assistant(&content)
    } else {
        Message::assistant_with_tools(&content, tool_calls)
    }
}

// ============================================================================
// ChatModel implementation
// ============================================================================

#[async_trait]
impl ChatModel for OpenAICompatModel {
    async fn generate(&self, messages: &[Message]) -> Result<Message> {
        let request = self.build_request(messages);
        debug!(
            provider = %self.provider,
            model = %self.model,
            messages = request.messages.len(),
            "Sending chat completion request"
        );

        let mut builder = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .json(&request);
        if let Some(ref key) = self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            GolemError::Provider(format!("{} request failed: {}", self.provider, e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&error_text)
                .map(|e| e.error.message)
                .unwrap_or(error_text);
            return Err(GolemError::Provider(format!(
                "{} API error ({}): {}",
                self.provider, status, detail
            )));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            GolemError::Provider(format!("Failed to parse {} response: {}", self.provider, e))
        })?;

        if let Some(ref usage) = parsed.usage {
            info!(
                provider = %self.provider,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Chat completion received"
            );
        }
        Ok(convert_response(parsed))
    }

    async fn bind_tools(&self, tools: Vec<ToolDefinition>) -> Result<()> {
        let mut bound = self
            .tools
            .write()
            .map_err(|_| GolemError::Provider("tool binding lock poisoned".into()))?;
        *bound = tools;
        Ok(())
    }

    fn name(&self) -> &str {
        &self.provider
    }
}
