//! OpenAI-compatible `/chat/completions` client
//!
//! Works with OpenAI, OpenRouter, vLLM and anything else speaking the same API.

use crate::*;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, trace};

/// OpenAI-compatible completion client
pub struct OpenAiCompatProvider {
    client: Client,
    api_key: String,
    api_base: String,
    default_model: String,
    timeout_secs: u64,
    is_openrouter: bool,
}

impl OpenAiCompatProvider {
    pub fn new(
        api_key: impl Into<String>,
        api_base: Option<String>,
        default_model: Option<String>,
    ) -> Self {
        Self::with_timeout(api_key, api_base, default_model, Duration::from_secs(120))
    }

    pub fn with_timeout(
        api_key: impl Into<String>,
        api_base: Option<String>,
        default_model: Option<String>,
        timeout: Duration,
    ) -> Self {
        let api_key = api_key.into();
        let is_openrouter = api_key.starts_with("sk-or-")
            || api_base
                .as_ref()
                .map(|b| b.contains("openrouter"))
                .unwrap_or(false);

        let api_base = api_base
            .unwrap_or_else(|| {
                if is_openrouter {
                    "https://openrouter.ai/api/v1".to_string()
                } else {
                    "https://api.openai.com/v1".to_string()
                }
            })
            .trim_end_matches('/')
            .to_string();

        let default_model = default_model.unwrap_or_else(|| {
            if is_openrouter {
                "google/gemini-pro-1.5".to_string()
            } else {
                "gpt-4o-mini".to_string()
            }
        });

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            api_key,
            api_base,
            default_model,
            timeout_secs: timeout.as_secs(),
            is_openrouter,
        }
    }

    pub fn is_openrouter(&self) -> bool {
        self.is_openrouter
    }

    fn build_request(&self, request: &CompletionRequest) -> serde_json::Value {
        let model = if request.model.is_empty() {
            self.default_model.clone()
        } else {
            request.model.clone()
        };

        // Tool output goes back as plain user text; there is no tool_call_id to pair it with.
        let messages: Vec<serde_json::Value> = request
            .messages()
            .iter()
            .map(|m| {
                if m.is_tool() {
                    json!({ "role": "user", "content": m.tool_text() })
                } else {
                    json!({ "role": &m.role, "content": &m.content })
                }
            })
            .collect();

        json!({
            "model": model,
            "messages": messages,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
        })
    }

    fn parse_response(&self, json: serde_json::Value) -> Result<CompletionResponse> {
        let choice = json["choices"]
            .get(0)
            .ok_or_else(|| ProviderError::InvalidResponse("no choices".to_string()))?;

        let text = choice["message"]["content"]
            .as_str()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ProviderError::InvalidResponse("empty reply".to_string()))?
            .to_string();

        let finish_reason = choice["finish_reason"]
            .as_str()
            .unwrap_or("stop")
            .to_string();

        let usage = if let Some(usage) = json["usage"].as_object() {
            Usage {
                prompt_tokens: usage["prompt_tokens"].as_u64().unwrap_or(0) as u32,
                completion_tokens: usage["completion_tokens"].as_u64().unwrap_or(0) as u32,
                total_tokens: usage["total_tokens"].as_u64().unwrap_or(0) as u32,
            }
        } else {
            Usage::default()
        };

        Ok(CompletionResponse {
            text,
            finish_reason,
            usage,
        })
    }
}

#[async_trait::async_trait]
impl Provider for OpenAiCompatProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        if self.api_key.is_empty() {
            return Err(ProviderError::NoApiKey);
        }

        trace!("◆ CHAT COMPLETION REQUEST TO {}", self.api_base);

        let url = format!("{}/chat/completions", self.api_base);
        let body = self.build_request(&request);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| request_error(e, self.timeout_secs))?;

        let json = response_json(response, self.timeout_secs).await?;

        let parsed = self.parse_response(json)?;
        debug!(
            "◆ CHAT COMPLETION REPLY: {} CHARS, FINISH {}",
            parsed.text.len(),
            parsed.finish_reason
        );
        Ok(parsed)
    }

    fn default_model(&self) -> String {
        self.default_model.clone()
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}
