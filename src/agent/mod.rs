//! Agent module - Core AI agent logic and conversation handling
//!
//! This module provides the core agent loop and context building functionality
//! for Golem. The agent is responsible for:
//!
//! - Processing inbound messages from channels
//! - Building conversation context with system prompts and history
//! - Calling the chat model for responses
//! - Executing tool calls and feeding results back to the model
//! - Managing conversation sessions
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  MessageBus │────>│  AgentLoop  │────>│  ChatModel  │
//! │  (inbound)  │     │             │     │             │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                            │
//!                            ├──────────────────┐
//!                            ▼                  ▼
//!                     ┌─────────────┐     ┌─────────────┐
//!                     │SessionStore │     │    Tools    │
//!                     │             │     │  Registry   │
//!                     └─────────────┘     └─────────────┘
//! ```
//!
//! Tool calls are observable through [`AgentLoop::subscribe_events`].

mod context;
mod events;
mod r#loop;

pub use context::{ContextBuilder, RuntimeContext, BOOTSTRAP_FILES};
pub use events::ToolEvent;
pub use r#loop::{AgentLoop, AgentSettings, FALLBACK_RESPONSE, NO_MODEL_RESPONSE};
