//! Agent core
//!
//! Tool registry, marker-driven tool executor, prompt assembly and the agent
//! loop that ties a completion provider to a conversation session.

use thiserror::Error;

use parlance_provider::ProviderError;
use parlance_session::SessionError;

pub mod context;
pub mod executor;
pub mod loop_agent;
pub mod tools;

pub use context::ContextBuilder;
pub use executor::{parse, ToolExecutor, ToolInvocation, ToolResult, TOOL_MARKER};
pub use loop_agent::{AgentInfo, AgentLoop, Exchange, LoopState};
pub use tools::{Capability, ToolDescription, ToolError, ToolRegistry};

/// Agent errors
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("◆ TOOL NOT FOUND: {0}")]
    ToolNotFound(String),

    #[error("◆ TOOL FAILED: {0}")]
    ToolExecution(String),

    #[error("◆ COMPLETION FAILED: {0}")]
    Completion(#[from] ProviderError),

    #[error("◆ INVALID INPUT: {0}")]
    InvalidInput(String),

    #[error("◆ SESSION STORE ERROR: {0}")]
    Session(#[from] SessionError),

    #[error("◆ IO ERROR: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AgentError>;
