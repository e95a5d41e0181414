//! Google Gemini `generateContent` client

use crate::*;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, trace};

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-1.5-pro";

/// Gemini completion client
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    api_base: String,
    default_model: String,
    timeout_secs: u64,
}

impl GeminiProvider {
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
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            api_key: api_key.into(),
            api_base: api_base
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
            default_model: default_model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            timeout_secs: timeout.as_secs(),
        }
    }

    fn endpoint(&self, model: &str) -> String {
        let model = if model.is_empty() {
            self.default_model.as_str()
        } else {
            model
        };
        let model = model.strip_prefix("models/").unwrap_or(model);
        format!("{}/models/{}:generateContent", self.api_base, model)
    }

    fn build_request(&self, request: &CompletionRequest) -> serde_json::Value {
        let mut contents: Vec<serde_json::Value> = request
            .history
            .iter()
            .filter(|m| m.role != "system")
            .map(|m| {
                let (role, text) = match m.role.as_str() {
                    "assistant" => ("model", m.content.clone()),
                    "tool" => ("user", m.tool_text()),
                    _ => ("user", m.content.clone()),
                };
                json!({ "role": role, "parts": [{ "text": text }] })
            })
            .collect();

        contents.push(json!({ "role": "user", "parts": [{ "text": &request.prompt }] }));

        let mut body = json!({
            "contents": contents,
            "generationConfig": {
                "maxOutputTokens": request.max_tokens,
                "temperature": request.temperature,
            }
        });

        let mut system_parts: Vec<String> = request
            .history
            .iter()
            .filter(|m| m.role == "system")
            .map(|m| m.content.clone())
            .collect();
        if let Some(system) = &request.system_prompt {
            system_parts.insert(0, system.clone());
        }
        if !system_parts.is_empty() {
            body["systemInstruction"] = json!({ "parts": [{ "text": system_parts.join("\n\n") }] });
        }

        body
    }

    fn parse_response(&self, json: serde_json::Value) -> Result<CompletionResponse> {
        if let Some(reason) = json["promptFeedback"]["blockReason"].as_str() {
            return Err(ProviderError::InvalidResponse(format!(
                "prompt blocked: {}",
                reason
            )));
        }

        let candidate = json["candidates"]
            .get(0)
            .ok_or_else(|| ProviderError::InvalidResponse("no candidates".to_string()))?;

        let parts = candidate["content"]["parts"]
            .as_array()
            .ok_or_else(|| ProviderError::InvalidResponse("candidate has no parts".to_string()))?;

        let text: String = parts
            .iter()
            .filter_map(|p| p["text"].as_str())
            .collect::<Vec<_>>()
            .join("");

        if text.is_empty() {
            return Err(ProviderError::InvalidResponse("empty reply".to_string()));
        }

        let finish_reason = candidate["finishReason"]
            .as_str()
            .unwrap_or("STOP")
            .to_lowercase();

        let usage = &json["usageMetadata"];
        let usage = Usage {
            prompt_tokens: usage["promptTokenCount"].as_u64().unwrap_or(0) as u32,
            completion_tokens: usage["candidatesTokenCount"].as_u64().unwrap_or(0) as u32,
            total_tokens: usage["totalTokenCount"].as_u64().unwrap_or(0) as u32,
        };

        Ok(CompletionResponse {
            text,
            finish_reason,
            usage,
        })
    }
}

#[async_trait::async_trait]
impl Provider for GeminiProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        if self.api_key.is_empty() {
            return Err(ProviderError::NoApiKey);
        }

        let url = self.endpoint(&request.model);
        trace!("◆ GEMINI REQUEST TO {}", url);
        let body = self.build_request(&request);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| request_error(e, self.timeout_secs))?;

        let json = response_json(response, self.timeout_secs).await?;

        let parsed = self.parse_response(json)?;
        debug!(
            "◆ GEMINI REPLY: {} CHARS, {} TOKENS",
            parsed.text.len(),
            parsed.usage.total_tokens
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn provider() -> GeminiProvider {
        GeminiProvider::new("g-key", None, None)
    }

    #[test]
    fn test_new_defaults() {
        let p = provider();
        assert_eq!(p.api_base, DEFAULT_API_BASE);
        assert_eq!(p.default_model(), "gemini-1.5-pro");
        assert!(p.is_configured());
        assert!(!GeminiProvider::new("", None, None).is_configured());
    }

    #[test]
    fn test_endpoint() {
        let p = GeminiProvider::new("k", Some("http://local/v1beta/".to_string()), None);
        assert_eq!(
            p.endpoint("gemini-2.0-flash"),
            "http://local/v1beta/models/gemini-2.0-flash:generateContent"
        );
        assert_eq!(
            p.endpoint("models/gemini-pro"),
            "http://local/v1beta/models/gemini-pro:generateContent"
        );
        assert_eq!(
            p.endpoint(""),
            "http://local/v1beta/models/gemini-1.5-pro:generateContent"
        );
    }

    #[test]
    fn test_build_request_maps_roles() {
        let request = CompletionRequest::new("gemini-1.5-pro", "And Spain?")
            .with_system_prompt("be brief")
            .with_history(vec![
                Message::user("Capital of France?"),
                Message::assistant("Paris."),
                Message::tool("search_web", "Madrid is the capital of Spain."),
            ]);

        let body = provider().build_request(&request);
        let contents = body["contents"].as_array().unwrap();

        assert_eq!(contents.len(), 4);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[1]["parts"][0]["text"], "Paris.");
        assert_eq!(contents[2]["role"], "user");
        assert!(contents[2]["parts"][0]["text"]
            .as_str()
            .unwrap()
            .starts_with("[tool result: search_web]"));
        assert_eq!(contents[3]["parts"][0]["text"], "And Spain?");

        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "be brief");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 4096);
    }

    #[test]
    fn test_build_request_without_system() {
        let request = CompletionRequest::new("m", "hi");
        let body = provider().build_request(&request);
        assert!(body.get("systemInstruction").is_none());
    }

    #[test]
    fn test_parse_response_joins_parts() {
        let json = json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "A capital " }, { "text": "é Paris." }] },
                "finishReason": "STOP"
            }],
            "usageMetadata": { "promptTokenCount": 7, "candidatesTokenCount": 5, "totalTokenCount": 12 }
        });

        let response = provider().parse_response(json).unwrap();
        assert_eq!(response.text, "A capital é Paris.");
        assert_eq!(response.finish_reason, "stop");
        assert_eq!(response.usage.total_tokens, 12);
    }

    #[test]
    fn test_parse_response_no_candidates() {
        let result = provider().parse_response(json!({ "candidates": [] }));
        assert!(matches!(result, Err(ProviderError::InvalidResponse(_))));
    }

    #[test]
    fn test_parse_response_blocked() {
        let result =
            provider().parse_response(json!({ "promptFeedback": { "blockReason": "SAFETY" } }));
        match result {
            Err(ProviderError::InvalidResponse(msg)) => assert!(msg.contains("SAFETY")),
            other => panic!("Expected InvalidResponse, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_response_empty_text() {
        let json = json!({ "candidates": [{ "content": { "parts": [{ "text": "" }] } }] });
        assert!(provider().parse_response(json).is_err());
    }

    #[tokio::test]
    async fn test_complete_without_key() {
        let p = GeminiProvider::new("", None, None);
        let result = p.complete(CompletionRequest::new("m", "hi")).await;
        assert!(matches!(result, Err(ProviderError::NoApiKey)));
    }
}
