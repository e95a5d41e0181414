//! run_command: execute a shell command in the workspace

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use super::{truncate_output, Capability, ToolError};

pub struct RunCommandTool {
    workspace: PathBuf,
    timeout_secs: u64,
    max_chars: usize,
}

impl RunCommandTool {
    pub fn new(workspace: PathBuf, timeout_secs: u64, max_chars: usize) -> Self {
        Self {
            workspace,
            timeout_secs,
            max_chars,
        }
    }
}

#[async_trait]
impl Capability for RunCommandTool {
    fn name(&self) -> &str {
        "run_command"
    }

    fn description(&self) -> &str {
        "Run a shell command in the workspace and return its output and exit code."
    }

    fn usage(&self) -> &str {
        "<command>"
    }

    fn timeout(&self) -> Option<Duration> {
        Some(Duration::from_secs(self.timeout_secs))
    }

    async fn invoke(&self, argument: &str) -> Result<String, ToolError> {
        let command = argument.trim();
        if command.is_empty() {
            return Err(ToolError::InvalidArgument("a command is required".into()));
        }

        debug!("◆ EXECUTING: {}", command);
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(command)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if self.workspace.is_dir() {
            cmd.current_dir(&self.workspace);
        }

        let output = cmd.output().await?;

        let mut parts = Vec::new();
        if !output.stdout.is_empty() {
            parts.push(String::from_utf8_lossy(&output.stdout).to_string());
        }
        if !output.stderr.is_empty() {
            parts.push(format!(
                "STDERR:\n{}",
                String::from_utf8_lossy(&output.stderr)
            ));
        }
        if output.status.code() != Some(0) {
            parts.push(format!("EXIT CODE: {}", output.status.code().unwrap_or(-1)));
        }

        let result = if parts.is_empty() {
            "(no output)".to_string()
        } else {
            parts.join("\n")
        };
        Ok(truncate_output(result, self.max_chars))
    }
}
