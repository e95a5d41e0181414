//! Tool registry and built-in capabilities

pub mod filesystem;
pub mod path_utils;
pub mod shell;
pub mod web;

pub use filesystem::ReadFileTool;
pub use shell::RunCommandTool;
pub use web::{SearchBackend, SearchWebTool};

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use parlance_config::Config;

use crate::AgentError;

/// Capability failures
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("path {path} is outside workspace {workspace}")]
    OutsideWorkspace { path: String, workspace: String },

    #[error("timed out after {0} seconds")]
    Timeout(u64),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for ToolError {
    fn from(e: reqwest::Error) -> Self {
        ToolError::Backend(e.to_string())
    }
}

/// A named external capability taking one free-text argument
#[async_trait]
pub trait Capability: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    /// Argument hint shown in the system prompt, e.g. `<query>`
    fn usage(&self) -> &str;
    async fn invoke(&self, argument: &str) -> Result<String, ToolError>;

    /// Per-capability time limit; `None` uses the executor default
    fn timeout(&self) -> Option<Duration> {
        None
    }
}

/// Catalogue entry for prompts and listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolDescription {
    pub name: String,
    pub description: String,
    pub usage: String,
}

type BoxedCapability = Box<dyn Capability>;

/// Tool registry
///
/// Populated at startup, then shared read-only.
pub struct ToolRegistry {
    tools: HashMap<String, BoxedCapability>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Registry with the built-in tools enabled by `config`
    pub fn from_config(config: &Config) -> Self {
        let mut registry = Self::new();
        register_default_tools(&mut registry, config);
        registry
    }

    pub fn register<T: Capability + 'static>(&mut self, tool: T) {
        let name = tool.name().to_string();
        debug!("Registering tool {}", name);
        self.tools.insert(name, Box::new(tool));
    }

    pub fn get(&self, name: &str) -> Result<&dyn Capability, AgentError> {
        self.tools
            .get(name)
            .map(|t| t.as_ref())
            .ok_or_else(|| AgentError::ToolNotFound(name.to_string()))
    }

    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Catalogue sorted by name
    pub fn descriptions(&self) -> Vec<ToolDescription> {
        let mut descriptions: Vec<ToolDescription> = self
            .tools
            .values()
            .map(|t| ToolDescription {
                name: t.name().to_string(),
                description: t.description().to_string(),
                usage: t.usage().to_string(),
            })
            .collect();
        descriptions.sort_by(|a, b| a.name.cmp(&b.name));
        descriptions
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Register the built-in tools
pub fn register_default_tools(registry: &mut ToolRegistry, config: &Config) {
    let workspace = config.workspace_path();
    let toolkit = &config.toolkit;

    registry.register(SearchWebTool::from_config(config));
    registry.register(ReadFileTool::new(
        workspace.clone(),
        toolkit.restrict_to_workspace,
        toolkit.max_output_chars,
    ));

    if config.exec_enabled() {
        registry.register(RunCommandTool::new(
            workspace,
            toolkit.exec.timeout_secs,
            toolkit.max_output_chars,
        ));
    } else {
        info!("◆ run_command DISABLED BY CONFIG");
    }
}

/// Cut `text` to at most `max_chars` characters, noting how much was dropped
pub(crate) fn truncate_output(text: String, max_chars: usize) -> String {
    let total = text.chars().count();
    if total <= max_chars {
        return text;
    }
    let kept: String = text.chars().take(max_chars).collect();
    format!(
        "{}\n... (output truncated, {} more characters)",
        kept,
        total - max_chars
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_output_short() {
        assert_eq!(truncate_output("abc".to_string(), 10), "abc");
    }

    #[test]
    fn test_truncate_output_char_boundary() {
        let out = truncate_output("ééééé".to_string(), 2);
        assert!(out.starts_with("éé\n"));
        assert!(out.contains("3 more characters"));
    }
}
