//! Provider types for Golem
//!
//! The agent loop talks to a language model only through [`ChatModel`]:
//! hand it the conversation, get back one assistant message that may ask for
//! tool calls. Tool schemas are offered once through `bind_tools`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::session::Message;

/// Definition of a tool that can be called by the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDefinition {
    /// The name of the tool (must be unique)
    pub name: String,
    /// Human-readable description of what the tool does
    pub description: String,
    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    /// Create a new tool definition.
    ///
    /// # Example
    /// ```
    /// use golem::providers::ToolDefinition;
    /// use serde_json::json;
    ///
    /// let tool = ToolDefinition::new(
    ///     "list_dir",
    ///     "List the entries of a directory",
    ///     json!({
    ///         "type": "object",
    ///         "properties": {
    ///             "path": { "type": "string" }
    ///         },
    ///         "required": ["path"]
    ///     }),
    /// );
    /// assert_eq!(tool.name, "list_dir");
    /// ```
    pub fn new(name: &str, description: &str, parameters: serde_json::Value) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters,
        }
    }
}

/// Contract for chat models.
///
/// Implementations translate between Golem's [`Message`] and whatever wire
/// format the backing API speaks. A returned message carrying `tool_calls`
/// asks the agent to run those tools and call `generate` again.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Produce the next assistant message for `messages`.
    async fn generate(&self, messages: &[Message]) -> Result<Message>;

    /// Offer tool schemas to the model.
    ///
    /// Models without tool support keep the default, which accepts and
    /// ignores the schemas.
    async fn bind_tools(&self, _tools: Vec<ToolDefinition>) -> Result<()> {
        Ok(())
    }

    /// Short identifier used in logs (e.g. "openrouter").
    fn name(&self) -> &str;
}
