//! Tool executor
//!
//! Finds a `TOOL: <name>: <argument>` marker in a model reply, resolves the
//! name against the registry and runs the capability under a time limit.
//! Every outcome, including unknown names and failures, comes back as a
//! [`ToolResult`].

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::tools::{ToolError, ToolRegistry};

/// Prefix that introduces a tool request in a model reply
pub const TOOL_MARKER: &str = "TOOL:";

/// A tool request parsed from a reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub name: String,
    pub argument: String,
}

/// Outcome of one invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    pub name: String,
    pub output: String,
    pub succeeded: bool,
    pub error: Option<String>,
}

impl ToolResult {
    pub fn success(name: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            output: output.into(),
            succeeded: true,
            error: None,
        }
    }

    pub fn failure(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            output: String::new(),
            succeeded: false,
            error: Some(error.into()),
        }
    }

    /// Text recorded in the session for this result
    pub fn turn_text(&self) -> String {
        if self.succeeded {
            format!("{} returned:\n{}", self.name, self.output)
        } else {
            format!(
                "{} failed: {}",
                self.name,
                self.error.as_deref().unwrap_or("unknown error")
            )
        }
    }
}

fn marker_regex() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| {
        Regex::new(r"(?m)TOOL:[ \t]*([^:\r\n]*?)[ \t]*(?::[ \t]*([^\r\n]*?))?[ \t\r]*$")
            .expect("tool marker pattern is valid")
    })
}

/// Find the first tool marker in `reply`.
///
/// Only the marker's own line matters: the name runs to the next colon and the
/// argument is the rest of that line. A marker with no second colon carries an
/// empty argument; a marker with no name is ignored.
pub fn parse(reply: &str) -> Option<ToolInvocation> {
    marker_regex().captures_iter(reply).find_map(|caps| {
        let name = caps.get(1).map(|m| m.as_str().trim()).unwrap_or("");
        if name.is_empty() {
            return None;
        }
        let argument = caps.get(2).map(|m| m.as_str().trim()).unwrap_or("");
        Some(ToolInvocation {
            name: name.to_string(),
            argument: argument.to_string(),
        })
    })
}

/// Runs parsed invocations against a frozen registry
#[derive(Clone)]
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    timeout: Duration,
}

impl ToolExecutor {
    pub fn new(registry: Arc<ToolRegistry>, timeout: Duration) -> Self {
        Self { registry, timeout }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Invoke the named capability. Never returns an error.
    pub async fn execute(&self, invocation: &ToolInvocation) -> ToolResult {
        let tool = match self.registry.get(&invocation.name) {
            Ok(tool) => tool,
            Err(e) => {
                warn!("{}", e);
                return ToolResult::failure(
                    &invocation.name,
                    format!(
                        "unknown tool '{}'; available tools: {}",
                        invocation.name,
                        self.registry.names().join(", ")
                    ),
                );
            }
        };

        let limit = tool.timeout().unwrap_or(self.timeout);
        info!("◆ DEPLOYING TOOL: {}", invocation.name);
        debug!("Tool argument: {}", invocation.argument);

        match tokio::time::timeout(limit, tool.invoke(&invocation.argument)).await {
            Ok(Ok(output)) => ToolResult::success(&invocation.name, output),
            Ok(Err(e)) => {
                warn!("Tool {} failed: {}", invocation.name, e);
                ToolResult::failure(&invocation.name, e.to_string())
            }
            Err(_) => {
                let e = ToolError::Timeout(limit.as_secs());
                warn!("Tool {} failed: {}", invocation.name, e);
                ToolResult::failure(&invocation.name, e.to_string())
            }
        }
    }

    /// Parse `reply` and execute its marker; `None` when no tool was requested
    pub async fn run(&self, reply: &str) -> Option<ToolResult> {
        let invocation = parse(reply)?;
        Some(self.execute(&invocation).await)
    }
}
