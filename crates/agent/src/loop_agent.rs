//! Agent loop - core processing engine
//!
//! One exchange: user text in, at most one tool call, final answer out. Turns
//! are staged while the exchange runs and only committed to the session once it
//! succeeds, so a failed completion leaves the session untouched.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use parlance_config::Config;
use parlance_provider::{CompletionRequest, Message, Provider, ProviderError};
use parlance_session::{to_messages, SessionStore, Turn};

use crate::context::ContextBuilder;
use crate::executor::{parse, ToolExecutor, ToolResult};
use crate::tools::ToolRegistry;
use crate::{AgentError, Result};

/// Where an exchange currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    AwaitingUserInput,
    RequestingCompletion,
    ParsingToolMarker,
    ExecutingTool,
    RequestingFinalCompletion,
    Done,
}

/// Result of one exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Exchange {
    /// Session key as stored, after trimming
    pub session_id: String,
    pub response: String,
    pub used_tool: bool,
    pub tool_name: Option<String>,
    pub tool_result: Option<ToolResult>,
}

/// Snapshot of the agent and, optionally, one session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentInfo {
    pub name: String,
    pub model: String,
    /// Present when the snapshot was taken for one session
    pub session_id: Option<String>,
    /// Exchanges in that session, or across all sessions
    pub conversation_count: usize,
    pub session_count: usize,
    pub available_tools: Vec<String>,
}

/// The agent loop drives completions and tool calls for every session
pub struct AgentLoop<P: Provider> {
    provider: P,
    executor: ToolExecutor,
    sessions: Arc<SessionStore>,
    context: ContextBuilder,
    name: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    max_history_turns: usize,
    completion_timeout: Duration,
}

impl<P: Provider> AgentLoop<P> {
    /// Create an agent loop over a frozen registry and a shared session store
    pub fn new(
        provider: P,
        registry: Arc<ToolRegistry>,
        sessions: Arc<SessionStore>,
        config: &Config,
    ) -> Self {
        let model = config
            .model()
            .unwrap_or_else(|| provider.default_model());

        Self {
            provider,
            executor: ToolExecutor::new(
                registry,
                Duration::from_secs(config.toolkit.timeout_secs),
            ),
            sessions,
            context: ContextBuilder::from_config(config),
            name: config.agent.name.clone(),
            model,
            max_tokens: config.agent.max_tokens,
            temperature: config.agent.temperature,
            max_history_turns: config.agent.max_history_turns,
            completion_timeout: Duration::from_secs(config.agent.completion_timeout_secs),
        }
    }

    /// Replace the prompt builder
    pub fn with_context(mut self, context: ContextBuilder) -> Self {
        self.context = context;
        self
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn registry(&self) -> &ToolRegistry {
        self.executor.registry()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run one exchange for `session_key`
    pub async fn process(&self, session_key: &str, text: &str) -> Result<Exchange> {
        let mut state = LoopState::AwaitingUserInput;

        let session_key = session_key.trim();
        if session_key.is_empty() {
            return Err(AgentError::InvalidInput(
                "session key must not be empty".into(),
            ));
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(AgentError::InvalidInput("message must not be empty".into()));
        }

        info!("◆ INCOMING [{}]: {}", session_key, preview(text));

        let shared = self.sessions.get_or_create(session_key).await;
        // Held for the whole exchange so turns from concurrent requests on the
        // same key never interleave.
        let mut session = shared.lock().await;

        let history = to_messages(session.recent(self.max_history_turns));
        let system_prompt = self
            .context
            .build_system_prompt(&self.registry().descriptions())
            .await;

        let mut staged = vec![Turn::user(text)];

        advance(&mut state, LoopState::RequestingCompletion);
        let reply = self
            .complete(&system_prompt, history.clone(), text.to_string())
            .await
            .inspect_err(|e| error!("◆ EXCHANGE ABORTED [{}]: {}", session_key, e))?;

        advance(&mut state, LoopState::ParsingToolMarker);
        let exchange = match parse(&reply) {
            None => {
                staged.push(Turn::agent(reply.clone()));
                Exchange {
                    session_id: session_key.to_string(),
                    response: reply,
                    used_tool: false,
                    tool_name: None,
                    tool_result: None,
                }
            }
            Some(invocation) => {
                advance(&mut state, LoopState::ExecutingTool);
                let result = self.executor.execute(&invocation).await;
                let tool_text = result.turn_text();
                staged.push(Turn::tool(result.name.clone(), tool_text.clone()));

                advance(&mut state, LoopState::RequestingFinalCompletion);
                let mut follow_up_history = history;
                follow_up_history.push(Message::user(text));
                follow_up_history.push(Message::tool(result.name.clone(), tool_text));

                let final_reply = self
                    .complete(
                        &system_prompt,
                        follow_up_history,
                        ContextBuilder::follow_up_prompt(text, &result),
                    )
                    .await
                    .inspect_err(|e| error!("◆ EXCHANGE ABORTED [{}]: {}", session_key, e))?;

                staged.push(Turn::agent(final_reply.clone()));
                Exchange {
                    session_id: session_key.to_string(),
                    response: final_reply,
                    used_tool: true,
                    tool_name: Some(result.name.clone()),
                    tool_result: Some(result),
                }
            }
        };

        session.extend(staged);
        if let Err(e) = self.sessions.save(&session).await {
            warn!("Failed to persist session {}: {}", session_key, e);
        }

        advance(&mut state, LoopState::Done);
        info!(
            "◆ RESPONSE [{}]{}: {}",
            session_key,
            exchange
                .tool_name
                .as_deref()
                .map(|t| format!(" via {}", t))
                .unwrap_or_default(),
            preview(&exchange.response)
        );

        Ok(exchange)
    }

    /// Describe the agent, scoped to `session_key` when given.
    ///
    /// Never creates a session; an unknown key reports zero exchanges.
    pub async fn info(&self, session_key: Option<&str>) -> AgentInfo {
        let summaries = self.sessions.summaries().await;
        let session_key = session_key.map(str::trim).filter(|k| !k.is_empty());

        let conversation_count = match session_key {
            Some(key) => summaries
                .iter()
                .find(|s| s.key == key)
                .map(|s| s.exchanges)
                .unwrap_or(0),
            None => summaries.iter().map(|s| s.exchanges).sum(),
        };

        AgentInfo {
            name: self.name.clone(),
            model: self.model.clone(),
            session_id: session_key.map(str::to_string),
            conversation_count,
            session_count: summaries.len(),
            available_tools: self.registry().names(),
        }
    }

    /// Run one exchange and return only the answer text
    pub async fn process_direct(&self, session_key: &str, text: &str) -> Result<String> {
        Ok(self.process(session_key, text).await?.response)
    }

    async fn complete(
        &self,
        system_prompt: &str,
        history: Vec<Message>,
        prompt: String,
    ) -> Result<String> {
        let request = CompletionRequest {
            model: self.model.clone(),
            system_prompt: Some(system_prompt.to_string()),
            history,
            prompt,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        debug!(
            "Requesting completion: model={}, history={}",
            request.model,
            request.history.len()
        );

        match tokio::time::timeout(self.completion_timeout, self.provider.complete(request)).await
        {
            Ok(Ok(response)) => Ok(response.text),
            Ok(Err(e)) => Err(AgentError::Completion(e)),
            Err(_) => Err(AgentError::Completion(ProviderError::Timeout(
                self.completion_timeout.as_secs(),
            ))),
        }
    }
}

fn advance(state: &mut LoopState, next: LoopState) {
    debug!("State {:?} -> {:?}", state, next);
    *state = next;
}

fn preview(text: &str) -> String {
    const MAX: usize = 80;
    if text.chars().count() > MAX {
        format!("{}...", text.chars().take(MAX).collect::<String>())
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_truncates() {
        assert_eq!(preview("short"), "short");
        let long = "x".repeat(100);
        assert_eq!(preview(&long).len(), 83);
    }

    #[test]
    fn test_advance() {
        let mut state = LoopState::AwaitingUserInput;
        advance(&mut state, LoopState::Done);
        assert_eq!(state, LoopState::Done);
    }
}
