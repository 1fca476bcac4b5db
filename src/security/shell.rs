//! Shell command security utilities
//!
//! Provides the denylist that keeps the `exec` tool from running highly
//! destructive commands.

use crate::error::{GolemError, Result};

/// Command substrings that are never executed.
///
/// Matching is case-insensitive and substring-based, so `sudo rm -rf /` and
/// `RM -RF /home` are both caught by `rm -rf /`.
pub const DEFAULT_BLOCKED_PATTERNS: &[&str] = &[
    // Recursive deletion of root or home
    "rm -rf /",
    "rm -rf ~",
    // Filesystem formatting and raw disk writes
    "mkfs",
    "dd if=",
    // Fork bomb
    ":(){:|:&};:",
    // Windows equivalents
    "format c:",
    "del /f /s /q",
];

/// Configuration for shell command security.
#[derive(Debug, Clone)]
pub struct ShellSecurityConfig {
    /// Patterns that are blocked (commands containing these are rejected)
    pub blocked_patterns: Vec<String>,
    /// Whether to enable security checks (can be disabled for trusted environments)
    pub enabled: bool,
}

impl Default for ShellSecurityConfig {
    fn default() -> Self {
        Self {
            blocked_patterns: DEFAULT_BLOCKED_PATTERNS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            enabled: true,
        }
    }
}

impl ShellSecurityConfig {
    /// Create a new shell security config with default blocked patterns.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a permissive config with no blocked patterns.
    ///
    /// # Warning
    /// This should only be used in trusted environments.
    pub fn permissive() -> Self {
        Self {
            blocked_patterns: Vec::new(),
            enabled: false,
        }
    }

    /// Add a custom blocked pattern.
    pub fn block_pattern(mut self, pattern: &str) -> Self {
        self.blocked_patterns.push(pattern.to_string());
        self
    }

    /// Returns the first blocked pattern contained in `command`, if any.
    ///
    /// # Example
    /// ```
    /// use golem::security::ShellSecurityConfig;
    ///
    /// let config = ShellSecurityConfig::new();
    /// assert_eq!(config.blocked_pattern("sudo MKFS.ext4 /dev/sda1"), Some("mkfs"));
    /// assert_eq!(config.blocked_pattern("ls -la"), None);
    /// ```
    pub fn blocked_pattern(&self, command: &str) -> Option<&str> {
        if !self.enabled {
            return None;
        }

        let command_lower = command.to_lowercase();
        self.blocked_patterns
            .iter()
            .find(|pattern| command_lower.contains(&pattern.to_lowercase()))
            .map(String::as_str)
    }

    /// Check if a command is allowed.
    ///
    /// Returns `Ok(())` if the command is safe to execute,
    /// or `Err(SecurityViolation)` if it matches a blocked pattern.
    pub fn validate_command(&self, command: &str) -> Result<()> {
        match self.blocked_pattern(command) {
            Some(pattern) => Err(GolemError::SecurityViolation(format!(
                "Blocked dangerous command: {}",
                pattern
            ))),
            None => Ok(()),
        }
    }
}
