//! Completion clients
//!
//! One outbound request per call to a hosted model, reply text returned verbatim.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use thiserror::Error;

pub mod gemini;
pub mod openai;

pub use gemini::GeminiProvider;
pub use openai::OpenAiCompatProvider;

/// Completion errors
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("REQUEST FAILED: {0}")]
    Request(#[from] reqwest::Error),

    #[error("MALFORMED JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API REJECTED: {0}")]
    Api(String),

    #[error("NO API KEY CONFIGURED")]
    NoApiKey,

    #[error("INVALID RESPONSE: {0}")]
    InvalidResponse(String),

    #[error("RATE LIMITED")]
    RateLimited,

    #[error("TIMED OUT AFTER {0} SECONDS")]
    Timeout(u64),
}

pub type Result<T> = std::result::Result<T, ProviderError>;

/// A prior message handed to the model as context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// system, user, assistant or tool
    pub role: String,
    pub content: String,
    /// Tool name for tool messages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
            name: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
            name: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
            name: None,
        }
    }

    pub fn tool(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: "tool".to_string(),
            content: content.into(),
            name: Some(name.into()),
        }
    }

    pub fn is_tool(&self) -> bool {
        self.role == "tool"
    }

    /// Text form of a tool message for backends without a tool role
    pub fn tool_text(&self) -> String {
        match &self.name {
            Some(name) => format!("[tool result: {}]\n{}", name, self.content),
            None => format!("[tool result]\n{}", self.content),
        }
    }
}

/// Token accounting
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// One completion call
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub system_prompt: Option<String>,
    /// Prior conversation, oldest first
    pub history: Vec<Message>,
    /// Newest user text
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for CompletionRequest {
    fn default() -> Self {
        Self {
            model: String::new(),
            system_prompt: None,
            history: Vec::new(),
            prompt: String::new(),
            max_tokens: 4096,
            temperature: 0.7,
        }
    }
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.history = history;
        self
    }

    /// System prompt, history and prompt flattened in send order
    pub fn messages(&self) -> Vec<Message> {
        let mut messages = Vec::with_capacity(self.history.len() + 2);
        if let Some(system) = &self.system_prompt {
            messages.push(Message::system(system.clone()));
        }
        messages.extend(self.history.iter().cloned());
        messages.push(Message::user(self.prompt.clone()));
        messages
    }
}

/// Model reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub text: String,
    #[serde(default)]
    pub finish_reason: String,
    #[serde(default)]
    pub usage: Usage,
}

impl CompletionResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            finish_reason: "stop".to_string(),
            usage: Usage::default(),
        }
    }
}

/// Completion client
#[async_trait]
pub trait Provider: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;
    fn default_model(&self) -> String;
    fn is_configured(&self) -> bool;
}

#[async_trait]
impl<P: Provider + ?Sized> Provider for std::sync::Arc<P> {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        (**self).complete(request).await
    }

    fn default_model(&self) -> String {
        (**self).default_model()
    }

    fn is_configured(&self) -> bool {
        (**self).is_configured()
    }
}

/// Pull a human-readable message out of an API error body
pub(crate) fn error_message(json: &serde_json::Value) -> String {
    json["error"]["message"]
        .as_str()
        .or_else(|| json["error"].as_str())
        .unwrap_or("UNKNOWN ERROR")
        .to_string()
}

/// Classify a transport failure; client-side timeouts become `Timeout`
pub(crate) fn request_error(e: reqwest::Error, timeout_secs: u64) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(timeout_secs)
    } else {
        ProviderError::Request(e)
    }
}

/// Read a reply body, classifying by status before parsing anything
pub(crate) async fn response_json(
    response: reqwest::Response,
    timeout_secs: u64,
) -> Result<serde_json::Value> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| request_error(e, timeout_secs))?;

    if status.as_u16() == 429 {
        return Err(ProviderError::RateLimited);
    }
    if !status.is_success() {
        let message = match serde_json::from_str::<serde_json::Value>(&body) {
            Ok(json) => error_message(&json),
            Err(_) => {
                let text: String = body.trim().chars().take(200).collect();
                if text.is_empty() {
                    format!("HTTP {}", status.as_u16())
                } else {
                    format!("HTTP {}: {}", status.as_u16(), text)
                }
            }
        };
        return Err(ProviderError::Api(message));
    }

    Ok(serde_json::from_str(&body)?)
}
