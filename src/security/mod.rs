//! Security module for Golem
//!
//! Workspace path sandboxing for the filesystem tools and the command
//! denylist for the `exec` tool.

pub mod path;
pub mod shell;

pub use path::{clean_path, validate_path};
pub use shell::ShellSecurityConfig;
