//! read_file: return the contents of a local text file

use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

use super::path_utils::{resolve_path, validate_workspace_path};
use super::{truncate_output, Capability, ToolError};

pub struct ReadFileTool {
    workspace: PathBuf,
    restrict_to_workspace: bool,
    max_chars: usize,
}

impl ReadFileTool {
    pub fn new(workspace: PathBuf, restrict_to_workspace: bool, max_chars: usize) -> Self {
        Self {
            workspace,
            restrict_to_workspace,
            max_chars,
        }
    }
}

#[async_trait]
impl Capability for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read a text file and return its contents. Relative paths resolve against the workspace."
    }

    fn usage(&self) -> &str {
        "<path>"
    }

    async fn invoke(&self, argument: &str) -> Result<String, ToolError> {
        // Models like to quote paths
        let raw = argument.trim().trim_matches(|c| c == '"' || c == '\'' || c == '`');
        if raw.is_empty() {
            return Err(ToolError::InvalidArgument("a file path is required".into()));
        }

        let path = if self.restrict_to_workspace {
            validate_workspace_path(raw, &self.workspace).await?
        } else {
            resolve_path(raw, &self.workspace)
        };

        debug!("◆ READING FILE: {:?}", path);
        if !path.exists() {
            return Err(ToolError::NotFound(raw.to_string()));
        }
        if !path.is_file() {
            return Err(ToolError::InvalidArgument(format!("{} is not a file", raw)));
        }

        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(truncate_output(content, self.max_chars)),
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                Err(ToolError::PermissionDenied(raw.to_string()))
            }
            Err(e) => Err(ToolError::Io(e)),
        }
    }
}
