//! Tools module - tool definitions and execution for model function calling
//!
//! - `Tool` trait: the interface every tool implements
//! - `ToolContext`: execution context (channel, chat_id, workspace)
//! - `ToolRegistry`: name-unique registry that parses arguments and dispatches
//!
//! # Built-in Tools
//!
//! - `ReadFileTool` (`read_file`): read a file or a window of its lines
//! - `WriteFileTool` (`write_file`): write a file
//! - `ListDirTool` (`list_dir`): list a directory
//! - `ExecTool` (`exec`): run a shell command
//!
//! # Example
//!
//! ```rust
//! use golem::tools::{default_tools, ToolContext, ToolRegistry};
//! use golem::config::ExecConfig;
//!
//! # tokio_test::block_on(async {
//! let mut registry = ToolRegistry::new();
//! for tool in default_tools(&ExecConfig::default()) {
//!     registry.register(tool).unwrap();
//! }
//! assert_eq!(registry.names(), vec!["exec", "list_dir", "read_file", "write_file"]);
//!
//! let dir = tempfile::tempdir().unwrap();
//! let ctx = ToolContext::new().with_workspace(dir.path().to_str().unwrap());
//! let listing = registry.execute("list_dir", r#"{"path": "."}"#, &ctx).await.unwrap();
//! assert_eq!(listing, "[]");
//! # });
//! ```

pub mod filesystem;
mod registry;
pub mod shell;
mod types;

pub use filesystem::{ListDirTool, ReadFileTool, WriteFileTool};
pub use registry::ToolRegistry;
pub use shell::ExecTool;
pub use types::{Tool, ToolContext};

use crate::config::ExecConfig;

/// The standard tool set: `read_file`, `write_file`, `list_dir` and `exec`.
pub fn default_tools(exec: &ExecConfig) -> Vec<Box<dyn Tool>> {
    vec![
        Box::new(ReadFileTool),
        Box::new(WriteFileTool),
        Box::new(ListDirTool),
        Box::new(ExecTool::from_config(exec)),
    ]
}
