//! Shell tool for Golem
//!
//! `exec` runs a command through the platform shell (`sh -c`, or `cmd /C` on
//! Windows) and reports `{"stdout", "stderr", "exit_code"}`. Failures are
//! reported in that shape too, so the model always gets something to react
//! to:
//!
//! | situation                      | exit_code | stderr                           |
//! |--------------------------------|-----------|----------------------------------|
//! | denylisted command             | 1         | `Blocked dangerous command: ...` |
//! | working dir outside workspace  | 1         | `... access denied ...`          |
//! | shell could not be launched    | 1         | the launch error                 |
//! | timeout (process killed)       | -1        | `Command timed out after Ns`     |

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::ExecConfig;
use crate::error::{GolemError, Result};
use crate::security::{validate_path, ShellSecurityConfig};

use super::{Tool, ToolContext};

/// Result reported by `exec`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl ExecOutput {
    fn failure(stderr: impl Into<String>, exit_code: i32) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code,
        }
    }
}

/// Tool for executing shell commands.
///
/// # Example
/// ```rust
/// use golem::tools::{shell::ExecTool, Tool, ToolContext};
/// use serde_json::json;
///
/// # tokio_test::block_on(async {
/// let tool = ExecTool::new();
/// let out = tool.execute(json!({"command": "rm -rf /"}), &ToolContext::new()).await.unwrap();
/// let out: serde_json::Value = serde_json::from_str(&out).unwrap();
/// assert_eq!(out["exit_code"], 1);
/// assert_eq!(out["stderr"], "Blocked dangerous command: rm -rf /");
/// # });
/// ```
pub struct ExecTool {
    security: ShellSecurityConfig,
    timeout: Duration,
    restrict_to_workspace: bool,
}

impl ExecTool {
    /// Default denylist, 60 second timeout, unrestricted working directory.
    pub fn new() -> Self {
        Self {
            security: ShellSecurityConfig::new(),
            timeout: Duration::from_secs(60),
            restrict_to_workspace: false,
        }
    }

    /// Build from `tools.exec` configuration.
    pub fn from_config(config: &ExecConfig) -> Self {
        Self::new()
            .with_timeout(Duration::from_secs(config.timeout))
            .with_restrict_to_workspace(config.restrict_to_workspace)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Require the working directory to stay inside the workspace.
    pub fn with_restrict_to_workspace(mut self, restrict: bool) -> Self {
        self.restrict_to_workspace = restrict;
        self
    }

    pub fn with_security(mut self, security: ShellSecurityConfig) -> Self {
        self.security = security;
        self
    }

    /// Picks the working directory: explicit argument first, then the
    /// workspace. With the restriction on, the choice must pass the sandbox.
    fn resolve_working_dir(&self, requested: Option<&str>, ctx: &ToolContext) -> Result<Option<PathBuf>> {
        let workspace = ctx.workspace_root();
        let chosen = match requested.filter(|dir| !dir.trim().is_empty()) {
            Some(dir) => dir,
            None if !workspace.is_empty() => workspace,
            None => return Ok(None),
        };

        if self.restrict_to_workspace {
            return validate_path(workspace, chosen).map(Some);
        }
        Ok(Some(PathBuf::from(chosen)))
    }

    async fn run(&self, command: &str, working_dir: Option<PathBuf>) -> ExecOutput {
        let mut cmd = shell_command(command);
        if let Some(ref dir) = working_dir {
            cmd.current_dir(dir);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => return ExecOutput::failure(e.to_string(), 1),
        };

        // Dropping the wait future on timeout kills the child.
        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => ExecOutput {
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                exit_code: output.status.code().unwrap_or(-1),
            },
            Ok(Err(e)) => ExecOutput::failure(e.to_string(), 1),
            Err(_) => {
                warn!(command = %command, timeout_secs = self.timeout.as_secs(), "Command timed out");
                ExecOutput::failure(
                    format!("Command timed out after {}s", self.timeout.as_secs()),
                    -1,
                )
            }
        }
    }
}

impl Default for ExecTool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(windows)]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

#[cfg(not(windows))]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[async_trait]
impl Tool for ExecTool {
    fn name(&self) -> &str {
        "exec"
    }

    fn description(&self) -> &str {
        "Execute a shell command and return its stdout, stderr and exit code"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "Shell command to execute"
                },
                "working_dir": {
                    "type": "string",
                    "description": "Working directory for the command"
                }
            },
            "required": ["command"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<String> {
        let command = args
            .get("command")
            .and_then(Value::as_str)
            .ok_or_else(|| GolemError::Tool("Missing 'command' argument".into()))?;

        let output = if let Some(pattern) = self.security.blocked_pattern(command) {
            warn!(command = %command, pattern = %pattern, "Blocked dangerous command");
            ExecOutput::failure(format!("Blocked dangerous command: {}", pattern), 1)
        } else {
            let requested = args.get("working_dir").and_then(Value::as_str);
            match self.resolve_working_dir(requested, ctx) {
                Ok(dir) => {
                    debug!(command = %command, working_dir = ?dir, "Executing command");
                    self.run(command, dir).await
                }
                Err(e) => {
                    warn!(command = %command, error = %e, "Working directory rejected");
                    ExecOutput::failure(e.to_string(), 1)
                }
            }
        };

        Ok(serde_json::to_string(&output)?)
    }
}
