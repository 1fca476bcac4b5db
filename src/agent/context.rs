//! Context builder for agent conversations
//!
//! This module provides the `ContextBuilder`, which turns a session's history
//! and the incoming user text into the message list sent to the model. It
//! also provides `RuntimeContext` for telling the model where and when it is
//! running.

use std::path::Path;

use tracing::debug;

use crate::session::Message;

const DEFAULT_SYSTEM_PROMPT: &str = r#"You are Golem, a personal AI assistant.

You have access to tools for reading and writing files, listing directories, and running shell commands inside your workspace. Use them when a task needs them.

Be concise but helpful. Focus on completing the user's request efficiently."#;

/// Workspace files folded into the system prompt, in this order.
pub const BOOTSTRAP_FILES: [&str; 4] = ["IDENTITY.md", "SOUL.md", "USER.md", "AGENTS.md"];

/// Runtime facts appended to the system prompt for one turn.
///
/// # Example
/// ```
/// use golem::agent::RuntimeContext;
///
/// let ctx = RuntimeContext::new()
///     .with_channel("telegram")
///     .with_workspace("/home/user/.golem/workspace");
/// let rendered = ctx.render().unwrap();
/// assert!(rendered.contains("Channel: telegram"));
/// assert!(rendered.contains("Workspace: /home/user/.golem/workspace"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct RuntimeContext {
    pub channel: Option<String>,
    pub current_time: Option<String>,
    pub workspace: Option<String>,
}

impl RuntimeContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channel(mut self, channel: &str) -> Self {
        self.channel = Some(channel.to_string());
        self
    }

    /// Stamp with the current local time.
    pub fn with_current_time(mut self) -> Self {
        self.current_time = Some(chrono::Local::now().format("%Y-%m-%d %H:%M (%A)").to_string());
        self
    }

    pub fn with_workspace(mut self, workspace: &str) -> Self {
        self.workspace = Some(workspace.to_string());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_none() && self.current_time.is_none() && self.workspace.is_none()
    }

    /// Render as a markdown section, or `None` when there is nothing to say.
    pub fn render(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }

        let mut parts = Vec::new();
        if let Some(ref time) = self.current_time {
            parts.push(format!("- Current time: {}", time));
        }
        if let Some(ref workspace) = self.workspace {
            parts.push(format!("- Workspace: {}", workspace));
        }
        if let Some(ref channel) = self.channel {
            parts.push(format!("- Channel: {}", channel));
        }

        Some(format!("## Runtime\n\n{}", parts.join("\n")))
    }
}

/// Builds the message list for a model call.
///
/// The list is always: one system message, the trailing history, then the
/// new user message.
///
/// # Example
/// ```
/// use golem::agent::{ContextBuilder, RuntimeContext};
/// use golem::session::{Message, Role};
///
/// let builder = ContextBuilder::new();
/// let history = vec![Message::user("hi"), Message::assistant("hello")];
/// let media = vec!["photo.jpg".to_string()];
///
/// let messages = builder.build_messages(&history, "what is this?", &media, &RuntimeContext::new());
/// assert_eq!(messages.len(), 4);
/// assert_eq!(messages[0].role, Role::System);
/// assert_eq!(messages[3].content, "what is this?\n\n[media: photo.jpg]");
/// ```
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    system_prompt: String,
    /// `(file name, trimmed contents)` of bootstrap files that were found
    bootstrap: Vec<(String, String)>,
}

impl ContextBuilder {
    /// Create a builder with the default identity and no bootstrap files.
    pub fn new() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            bootstrap: Vec::new(),
        }
    }

    /// Replace the default identity.
    pub fn with_system_prompt(mut self, prompt: &str) -> Self {
        self.system_prompt = prompt.to_string();
        self
    }

    /// Load any of [`BOOTSTRAP_FILES`] present in `workspace`.
    ///
    /// Missing, unreadable or blank files are skipped.
    pub fn with_workspace_files(mut self, workspace: &Path) -> Self {
        self.bootstrap.clear();
        for name in BOOTSTRAP_FILES {
            let path = workspace.join(name);
            match std::fs::read_to_string(&path) {
                Ok(content) if !content.trim().is_empty() => {
                    debug!(file = %path.display(), "Loaded bootstrap file");
                    self.bootstrap
                        .push((name.to_string(), content.trim().to_string()));
                }
                _ => {}
            }
        }
        self
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Names of the bootstrap files that were loaded.
    pub fn bootstrap_files(&self) -> Vec<&str> {
        self.bootstrap.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn build_system_message(&self, runtime: &RuntimeContext) -> Message {
        let mut content = self.system_prompt.clone();
        for (name, body) in &self.bootstrap {
            content.push_str("\n\n## ");
            content.push_str(name);
            content.push_str("\n\n");
            content.push_str(body);
        }
        if let Some(rendered) = runtime.render() {
            content.push_str("\n\n");
            content.push_str(&rendered);
        }
        Message::system(&content)
    }

    /// System message, then `history`, then the user message.
    ///
    /// Media references are appended to the user text as `[media: a, b]`.
    pub fn build_messages(
        &self,
        history: &[Message],
        user_input: &str,
        media: &[String],
        runtime: &RuntimeContext,
    ) -> Vec<Message> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(self.build_system_message(runtime));
        messages.extend_from_slice(history);

        let content = if media.is_empty() {
            user_input.to_string()
        } else {
            format!("{}\n\n[media: {}]", user_input, media.join(", "))
        };
        messages.push(Message::user(&content));
        messages
    }
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Role, ToolCall};
    use tempfile::TempDir;

    #[test]
    fn test_context_builder_new() {
        let builder = ContextBuilder::default();
        assert!(builder.system_prompt().contains("Golem"));
        assert!(builder.bootstrap_files().is_empty());
    }

    #[test]
    fn test_custom_system_prompt() {
        let builder = ContextBuilder::new().with_system_prompt("Custom prompt here");
        let system = builder.build_system_message(&RuntimeContext::new());
        assert_eq!(system.role, Role::System);
        assert_eq!(system.content, "Custom prompt here");
    }

    #[test]
    fn test_build_messages_with_history() {
        let builder = ContextBuilder::new();
        let history = vec![
            Message::user("Previous message"),
            Message::assistant("Previous response"),
        ];
        let messages = builder.build_messages(&history, "New message", &[], &RuntimeContext::new());

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].content, "Previous message");
        assert_eq!(messages[2].role, Role::Assistant);
        assert_eq!(messages[3].role, Role::User);
        assert_eq!(messages[3].content, "New message");
    }

    #[test]
    fn test_build_messages_keeps_tool_history() {
        let builder = ContextBuilder::new();
        let history = vec![
            Message::user("List files"),
            Message::assistant_with_tools(
                "",
                vec![ToolCall::new("call_1", "list_dir", r#"{"path": "."}"#)],
            ),
            Message::tool_result("call_1", "[]"),
            Message::assistant("The directory is empty."),
        ];
        let messages = builder.build_messages(&history, "Thanks!", &[], &RuntimeContext::new());

        assert_eq!(messages.len(), 6);
        assert!(messages[2].has_tool_calls());
        assert_eq!(messages[3].tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn test_media_appended_to_user_message() {
        let builder = ContextBuilder::new();
        let media = vec!["a.png".to_string(), "b.ogg".to_string()];
        let messages = builder.build_messages(&[], "look", &media, &RuntimeContext::new());

        assert_eq!(messages[1].content, "look\n\n[media: a.png, b.ogg]");
    }

    #[test]
    fn test_bootstrap_files_in_order() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("SOUL.md"), "Be warm.\n").unwrap();
        std::fs::write(dir.path().join("IDENTITY.md"), "I am Golem.").unwrap();
        std::fs::write(dir.path().join("USER.md"), "   \n").unwrap();

        let builder = ContextBuilder::new().with_workspace_files(dir.path());
        assert_eq!(builder.bootstrap_files(), vec!["IDENTITY.md", "SOUL.md"]);

        let system = builder.build_system_message(&RuntimeContext::new());
        let identity = system.content.find("## IDENTITY.md").unwrap();
        let soul = system.content.find("## SOUL.md\n\nBe warm.").unwrap();
        assert!(identity < soul);
        assert!(!system.content.contains("USER.md"));
    }

    #[test]
    fn test_missing_workspace_is_fine() {
        let builder = ContextBuilder::new().with_workspace_files(Path::new("/definitely/not/here"));
        assert!(builder.bootstrap_files().is_empty());
    }

    #[test]
    fn test_runtime_section_last() {
        let builder = ContextBuilder::new();
        let runtime = RuntimeContext::new()
            .with_channel("cli")
            .with_workspace("/ws")
            .with_current_time();
        let system = builder.build_system_message(&runtime);

        let runtime_pos = system.content.find("## Runtime").unwrap();
        assert!(runtime_pos > system.content.find("Golem").unwrap());
        assert!(system.content.contains("- Channel: cli"));
        assert!(system.content.contains("- Workspace: /ws"));
        assert!(system.content.contains("- Current time: "));
    }

    #[test]
    fn test_runtime_context_empty() {
        let ctx = RuntimeContext::new();
        assert!(ctx.is_empty());
        assert!(ctx.render().is_none());
    }
}
