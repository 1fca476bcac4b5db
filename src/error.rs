//! Error types for Golem
//!
//! This module defines the error type shared by every layer of the runtime.
//! Uses `thiserror` for ergonomic error handling with automatic `Display` and
//! `Error` trait implementations. The CLI wraps these in `anyhow` for context.

use thiserror::Error;

/// The primary error type for Golem operations.
#[derive(Error, Debug)]
pub enum GolemError {
    /// Configuration-related errors (unknown workspace mode, missing path, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Model provider errors (API failures, malformed responses, etc.)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Channel errors (startup failures, delivery failures, etc.)
    #[error("Channel error: {0}")]
    Channel(String),

    /// Tool execution errors (invalid arguments, execution failures, etc.)
    #[error("Tool error: {0}")]
    Tool(String),

    /// Standard I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Message bus closed
    #[error("Bus error: channel closed")]
    BusClosed,

    /// Resource not found (tools, channels, sessions)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Sandbox rejections (workspace escapes, blocked commands)
    #[error("Security violation: {0}")]
    SecurityViolation(String),
}

/// A specialized `Result` type for Golem operations.
pub type Result<T> = std::result::Result<T, GolemError>;
