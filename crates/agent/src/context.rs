//! Context builder for assembling agent prompts

use chrono::Local;
use std::path::{Path, PathBuf};
use tracing::debug;

use parlance_config::Config;

use crate::executor::{ToolResult, TOOL_MARKER};
use crate::tools::ToolDescription;

/// Builds the system prompt and follow-up prompts
pub struct ContextBuilder {
    name: String,
    system_prompt: String,
    workspace: PathBuf,
}

impl ContextBuilder {
    /// Optional operator notes appended to the system prompt
    const PERSONA_FILE: &'static str = "PERSONA.md";

    pub fn new(
        name: impl Into<String>,
        system_prompt: impl Into<String>,
        workspace: impl AsRef<Path>,
    ) -> Self {
        Self {
            name: name.into(),
            system_prompt: system_prompt.into(),
            workspace: workspace.as_ref().to_path_buf(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.agent.name.clone(),
            config.agent.system_prompt.clone(),
            config.workspace_path(),
        )
    }

    /// System prompt with identity, time, persona notes and the tool catalogue
    pub async fn build_system_prompt(&self, tools: &[ToolDescription]) -> String {
        let mut parts = vec![self.identity()];

        if let Some(persona) = self.load_persona().await {
            parts.push(format!("## {}\n\n{}", Self::PERSONA_FILE, persona));
        }

        if !tools.is_empty() {
            parts.push(Self::tool_catalogue(tools));
        }

        parts.join("\n\n---\n\n")
    }

    fn identity(&self) -> String {
        let now = Local::now().format("%Y-%m-%d %H:%M (%A)");
        format!(
            "# {}\n\n{}\n\n## Current Time\n{}\n\n## Workspace\n{}",
            self.name,
            self.system_prompt,
            now,
            self.workspace.display()
        )
    }

    /// Tool list plus the marker convention
    pub fn tool_catalogue(tools: &[ToolDescription]) -> String {
        let mut lines = vec!["## Tools".to_string(), String::new()];
        for tool in tools {
            lines.push(format!(
                "- {} {}: {}",
                tool.name, tool.usage, tool.description
            ));
        }
        lines.push(String::new());
        lines.push(format!(
            "To use a tool, reply with a single line of the form\n{} <name>: <argument>\n\
             and nothing else. You will receive the tool output and can then answer. \
             Use at most one tool per message. If no tool is needed, answer directly.",
            TOOL_MARKER
        ));
        lines.join("\n")
    }

    /// Prompt for the completion that follows a tool call
    pub fn follow_up_prompt(user_text: &str, result: &ToolResult) -> String {
        let outcome = if result.succeeded {
            format!("The tool {} returned the result above.", result.name)
        } else {
            format!(
                "The tool {} failed: {}",
                result.name,
                result.error.as_deref().unwrap_or("unknown error")
            )
        };
        format!(
            "{}\nUsing it, give the final answer to my original request: {}\n\
             Answer in natural language and do not request another tool.",
            outcome, user_text
        )
    }

    async fn load_persona(&self) -> Option<String> {
        let path = self.workspace.join(Self::PERSONA_FILE);
        if !path.exists() {
            return None;
        }
        match tokio::fs::read_to_string(&path).await {
            Ok(content) if !content.trim().is_empty() => Some(content),
            Ok(_) => None,
            Err(e) => {
                debug!("Failed to read {}: {}", Self::PERSONA_FILE, e);
                None
            }
        }
    }
}
