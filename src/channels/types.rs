//! Channel trait and types for Golem
//!
//! This module defines the `Channel` trait that all communication channels
//! must implement, along with supporting types.

use async_trait::async_trait;

use crate::bus::OutboundMessage;
use crate::error::Result;

/// The `Channel` trait defines the interface for all communication channels.
///
/// Channels are responsible for:
/// - Receiving messages from users and publishing them to the message bus
/// - Sending outbound messages from the agent back to users
/// - Managing their connection lifecycle (start/stop)
/// - Enforcing access control via allowlists
///
/// Every method takes `&self` so one adapter can be shared as
/// `Arc<dyn Channel>` between the manager's start, routing and shutdown
/// paths. Implementations keep their mutable state behind atomics or locks.
///
/// # Example Implementation
///
/// ```
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use async_trait::async_trait;
/// use golem::channels::{BaseChannelConfig, Channel};
/// use golem::bus::OutboundMessage;
/// use golem::error::Result;
///
/// struct StdoutChannel {
///     config: BaseChannelConfig,
///     running: AtomicBool,
/// }
///
/// #[async_trait]
/// impl Channel for StdoutChannel {
///     fn name(&self) -> &str {
///         &self.config.name
///     }
///
///     async fn start(&self) -> Result<()> {
///         self.running.store(true, Ordering::SeqCst);
///         Ok(())
///     }
///
///     async fn stop(&self) -> Result<()> {
///         self.running.store(false, Ordering::SeqCst);
///         Ok(())
///     }
///
///     async fn send(&self, msg: OutboundMessage) -> Result<()> {
///         println!("[{}] {}", msg.chat_id, msg.content);
///         Ok(())
///     }
///
///     fn is_running(&self) -> bool {
///         self.running.load(Ordering::SeqCst)
///     }
///
///     fn is_allowed(&self, user_id: &str) -> bool {
///         self.config.is_allowed(user_id)
///     }
/// }
/// ```
#[async_trait]
pub trait Channel: Send + Sync {
    /// Returns the unique name of this channel (e.g., "telegram").
    ///
    /// Outbound messages are routed by matching their `channel` tag against
    /// this name.
    fn name(&self) -> &str;

    /// Starts the channel and begins publishing inbound messages.
    ///
    /// Implementations may either return once their receive loop is running
    /// in the background or run it inline until stopped; the manager calls
    /// this from a dedicated task.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel fails to start (e.g., invalid token,
    /// network failure, etc.).
    async fn start(&self) -> Result<()>;

    /// Stops the channel, cleaning up resources and closing connections.
    async fn stop(&self) -> Result<()>;

    /// Sends an outbound message through this channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the message fails to send (e.g., network failure,
    /// invalid chat ID, rate limiting, etc.).
    async fn send(&self, msg: OutboundMessage) -> Result<()>;

    /// Returns whether the channel is currently running and accepting messages.
    fn is_running(&self) -> bool;

    /// Checks if a sender is allowed to use this channel.
    fn is_allowed(&self, user_id: &str) -> bool;
}

/// Base configuration shared by all channels.
///
/// This struct provides common configuration options that most channels need,
/// including the channel name and an allowlist for access control.
///
/// # Example
///
/// ```
/// use golem::channels::BaseChannelConfig;
///
/// let config = BaseChannelConfig {
///     name: "telegram".to_string(),
///     allowlist: vec!["user123".to_string(), "alice".to_string()],
/// };
///
/// assert!(config.is_allowed("user123"));
/// assert!(config.is_allowed("999|alice"));
/// assert!(!config.is_allowed("user789"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct BaseChannelConfig {
    /// The unique name of this channel
    pub name: String,
    /// List of allowed sender IDs. If empty, all senders are allowed.
    pub allowlist: Vec<String>,
}

impl BaseChannelConfig {
    /// Creates a config with an empty allowlist, which allows everyone.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            allowlist: Vec::new(),
        }
    }

    /// Creates a config with the given allowlist.
    pub fn with_allowlist(name: &str, allowlist: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            allowlist,
        }
    }

    /// Checks if a sender is allowed based on the allowlist.
    ///
    /// If the allowlist is empty, everyone is allowed. Compound sender IDs of
    /// the form `id|username` match when either part is listed.
    pub fn is_allowed(&self, user_id: &str) -> bool {
        if self.allowlist.is_empty() {
            return true;
        }
        let listed = |candidate: &str| self.allowlist.iter().any(|a| a == candidate);
        if listed(user_id) {
            return true;
        }
        match user_id.split_once('|') {
            Some((id, username)) => {
                listed(id) || (!username.is_empty() && listed(username))
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_channel_config_new() {
        let config = BaseChannelConfig::new("telegram");
        assert_eq!(config.name, "telegram");
        assert!(config.allowlist.is_empty());
        assert!(config.is_allowed("anyone"));
    }

    #[test]
    fn test_base_channel_config_with_allowlist() {
        let config = BaseChannelConfig::with_allowlist(
            "telegram",
            vec!["user1".to_string(), "user2".to_string()],
        );
        assert!(config.is_allowed("user1"));
        assert!(config.is_allowed("user2"));
        assert!(!config.is_allowed("user3"));
    }

    #[test]
    fn test_compound_sender_matches_either_part() {
        let config =
            BaseChannelConfig::with_allowlist("telegram", vec!["42".to_string(), "bob".to_string()]);

        assert!(config.is_allowed("42|alice"));
        assert!(config.is_allowed("7|bob"));
        assert!(!config.is_allowed("7|alice"));
        assert!(!config.is_allowed("7|"));
    }

    #[test]
    fn test_allowlist_is_exact_match() {
        let config = BaseChannelConfig::with_allowlist("telegram", vec!["user1".to_string()]);
        assert!(!config.is_allowed("user10"));
        assert!(!config.is_allowed("USER1"));
        assert!(!config.is_allowed(""));
    }
}
