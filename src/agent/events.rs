//! Tool execution events
//!
//! The agent loop publishes a [`ToolEvent`] before and after every tool call
//! on a broadcast channel. Presentation layers (the `chat` command, tests)
//! subscribe with [`AgentLoop::subscribe_events`](super::AgentLoop::subscribe_events).
//! Publishing never waits: with no subscribers events are dropped, and a
//! lagging subscriber loses the oldest ones.

use serde::Serialize;

/// Capacity of the event channel
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolEvent {
    /// A tool call is about to run
    Started { name: String, arguments: String },
    /// A tool call completed. `result` is what the model sees, so on failure
    /// it carries the `Error: ...` text and `error` carries the bare message.
    Finished {
        name: String,
        result: String,
        error: Option<String>,
    },
}

impl ToolEvent {
    pub fn tool_name(&self) -> &str {
        match self {
            ToolEvent::Started { name, .. } | ToolEvent::Finished { name, .. } => name,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ToolEvent::Finished { error: Some(_), .. })
    }
}
