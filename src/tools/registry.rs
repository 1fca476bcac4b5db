//! Tool registry for Golem
//!
//! Tools are registered once at startup and looked up by name while a turn
//! runs. The registry owns argument parsing so every tool sees a JSON object.

use std::collections::HashMap;
use std::time::Instant;

use serde_json::Value;
use tracing::{error, info};

use crate::error::{GolemError, Result};
use crate::providers::ToolDefinition;

use super::{Tool, ToolContext};

/// A registry that holds and dispatches tools by name.
///
/// # Example
///
/// ```rust
/// use golem::tools::{filesystem::ListDirTool, ToolContext, ToolRegistry};
///
/// # tokio_test::block_on(async {
/// let mut registry = ToolRegistry::new();
/// registry.register(Box::new(ListDirTool)).unwrap();
/// assert!(registry.has("list_dir"));
///
/// // A second tool with the same name is rejected.
/// assert!(registry.register(Box::new(ListDirTool)).is_err());
///
/// let missing = registry.execute("nope", "{}", &ToolContext::new()).await;
/// assert!(missing.unwrap_err().to_string().contains("tool not found: nope"));
/// # });
/// ```
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    /// Create a new empty tool registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool under its declared name.
    ///
    /// # Errors
    /// Returns `GolemError::Tool` if a tool with the same name is already
    /// registered. The existing tool is kept.
    pub fn register(&mut self, tool: Box<dyn Tool>) -> Result<()> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(GolemError::Tool(format!("tool already registered: {}", name)));
        }
        info!(tool = %name, "Registering tool");
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Execute a tool by name with the model's raw JSON arguments.
    ///
    /// Empty or whitespace-only arguments are treated as `{}`.
    ///
    /// # Errors
    /// - `GolemError::NotFound` if no tool has that name
    /// - `GolemError::Tool` if the arguments are not valid JSON
    /// - whatever the tool itself returns
    pub async fn execute(&self, name: &str, raw_args: &str, ctx: &ToolContext) -> Result<String> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| GolemError::NotFound(format!("tool not found: {}", name)))?;

        let args: Value = if raw_args.trim().is_empty() {
            Value::Object(Default::default())
        } else {
            serde_json::from_str(raw_args).map_err(|e| {
                GolemError::Tool(format!("invalid arguments for {}: {}", name, e))
            })?
        };

        let start = Instant::now();
        match tool.execute(args, ctx).await {
            Ok(output) => {
                info!(
                    tool = name,
                    duration_ms = start.elapsed().as_millis() as u64,
                    result_len = output.len(),
                    "Tool executed successfully"
                );
                Ok(output)
            }
            Err(e) => {
                error!(
                    tool = name,
                    error = %e,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Tool execution failed"
                );
                Err(e)
            }
        }
    }

    /// Schemas of every registered tool, sorted by name, for binding to the
    /// model.
    pub fn tool_infos(&self) -> Vec<ToolDefinition> {
        let mut infos: Vec<ToolDefinition> = self
            .tools
            .values()
            .map(|t| ToolDefinition::new(t.name(), t.description(), t.parameters()))
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    /// Names of all registered tools, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Echoes `message`, or the whole argument object when absent.
    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echoes back the provided message"
        }

        fn parameters(&self) -> Value {
            serde_json::json!({
                "type": "object",
                "properties": {"message": {"type": "string"}}
            })
        }

        async fn execute(&self, args: Value, _ctx: &ToolContext) -> Result<String> {
            Ok(match args.get("message").and_then(Value::as_str) {
                Some(message) => message.to_string(),
                None => args.to_string(),
            })
        }
    }

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn name(&self) -> &str {
            "fail"
        }

        fn description(&self) -> &str {
            "Always fails"
        }

        fn parameters(&self) -> Value {
            serde_json::json!({"type": "object"})
        }

        async fn execute(&self, _args: Value, _ctx: &ToolContext) -> Result<String> {
            Err(GolemError::Tool("boom".into()))
        }
    }

    #[test]
    fn test_registry_new() {
        let registry = ToolRegistry::default();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_registry_register_and_get() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool)).unwrap();

        assert!(registry.has("echo"));
        assert_eq!(registry.get("echo").unwrap().name(), "echo");
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool)).unwrap();

        let err = registry.register(Box::new(EchoTool)).unwrap_err();
        assert!(err.to_string().contains("tool already registered: echo"));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_execute_parses_arguments() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool)).unwrap();
        let ctx = ToolContext::new().with_channel("telegram", "123456");

        let result = registry
            .execute("echo", r#"{"message": "hello"}"#, &ctx)
            .await
            .unwrap();
        assert_eq!(result, "hello");
    }

    #[tokio::test]
    async fn test_empty_arguments_are_empty_object() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool)).unwrap();

        let result = registry.execute("echo", "  ", &ToolContext::new()).await.unwrap();
        assert_eq!(result, "{}");
    }

    #[tokio::test]
    async fn test_invalid_json_is_tool_error() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool)).unwrap();

        let err = registry
            .execute("echo", "{not json", &ToolContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, GolemError::Tool(_)));
    }

    #[tokio::test]
    async fn test_tool_not_found() {
        let registry = ToolRegistry::new();
        let err = registry
            .execute("nonexistent", "{}", &ToolContext::new())
            .await
            .unwrap_err();

        assert!(matches!(err, GolemError::NotFound(_)));
        assert!(err.to_string().contains("tool not found: nonexistent"));
    }

    #[tokio::test]
    async fn test_tool_error_propagates() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(FailingTool)).unwrap();

        let err = registry.execute("fail", "{}", &ToolContext::new()).await.unwrap_err();
        assert_eq!(err.to_string(), "Tool error: boom");
    }

    #[test]
    fn test_tool_infos_sorted() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(FailingTool)).unwrap();
        registry.register(Box::new(EchoTool)).unwrap();

        let infos = registry.tool_infos();
        assert_eq!(infos.len(), 2);
        assert_eq!(infos[0].name, "echo");
        assert_eq!(infos[0].description, "Echoes back the provided message");
        assert!(infos[0].parameters.is_object());
        assert_eq!(infos[1].name, "fail");

        assert_eq!(registry.names(), vec!["echo", "fail"]);
    }
}
