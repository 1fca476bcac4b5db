//! Golem - personal AI assistant for chat platforms
//!
//! Messages arrive from channels (Telegram) on a [`MessageBus`], the
//! [`agent::AgentLoop`] answers them with a chat model and a small set of
//! sandboxed tools, and the [`channels::ChannelManager`] routes the replies
//! back to where they came from.

pub mod agent;
pub mod bus;
pub mod channels;
pub mod config;
pub mod error;
pub mod providers;
pub mod security;
pub mod session;
pub mod tools;
pub mod utils;

pub use agent::{AgentLoop, AgentSettings, ToolEvent};
pub use bus::{InboundMessage, MessageBus, OutboundMessage};
pub use channels::{Channel, ChannelManager};
pub use config::Config;
pub use error::{GolemError, Result};
pub use providers::{ChatModel, ToolDefinition};
pub use session::{Message, Role, Session, SessionManager, SessionStore, ToolCall};
pub use tools::{Tool, ToolContext, ToolRegistry};
