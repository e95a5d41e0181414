//! search_web: DuckDuckGo Instant Answer or Brave Search

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use parlance_config::{Config, SearchBackendKind};

use super::{Capability, ToolError};

const DUCKDUCKGO_API_BASE: &str = "https://api.duckduckgo.com";
const BRAVE_API_BASE: &str = "https://api.search.brave.com";
const USER_AGENT: &str = concat!("parlance/", env!("CARGO_PKG_VERSION"));

/// Which search service answers queries
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchBackend {
    DuckDuckGo,
    Brave { api_key: String },
}

pub struct SearchWebTool {
    client: reqwest::Client,
    backend: SearchBackend,
    api_base: String,
    max_results: u32,
}

impl SearchWebTool {
    pub fn new(backend: SearchBackend, max_results: u32) -> Self {
        let api_base = match backend {
            SearchBackend::DuckDuckGo => DUCKDUCKGO_API_BASE,
            SearchBackend::Brave { .. } => BRAVE_API_BASE,
        }
        .to_string();

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();

        Self {
            client,
            backend,
            api_base,
            max_results: max_results.clamp(1, 10),
        }
    }

    pub fn duckduckgo() -> Self {
        Self::new(SearchBackend::DuckDuckGo, 5)
    }

    /// Point the tool at a different endpoint
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn from_config(config: &Config) -> Self {
        let search = &config.toolkit.search;
        let backend = match (&search.backend, config.brave_api_key()) {
            (SearchBackendKind::Brave, Some(api_key)) => SearchBackend::Brave { api_key },
            (SearchBackendKind::Brave, None) => {
                warn!("Brave search selected without an API key, using DuckDuckGo");
                SearchBackend::DuckDuckGo
            }
            (SearchBackendKind::DuckDuckGo, _) => SearchBackend::DuckDuckGo,
        };

        let tool = Self::new(backend, search.max_results);
        match &search.api_base {
            Some(base) if !base.is_empty() => tool.with_api_base(base.clone()),
            _ => tool,
        }
    }

    pub fn backend(&self) -> &SearchBackend {
        &self.backend
    }

    async fn search_duckduckgo(&self, query: &str) -> Result<String, ToolError> {
        let response = self
            .client
            .get(format!("{}/", self.api_base))
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::Backend(format!("search API returned {}", status)));
        }

        // Served as application/x-javascript, so decode by hand
        let body = response.text().await?;
        let data: Value = serde_json::from_str(&body)
            .map_err(|e| ToolError::Backend(format!("unreadable search response: {}", e)))?;

        Ok(summarize_duckduckgo(&data, query, self.max_results as usize))
    }

    async fn search_brave(&self, query: &str, api_key: &str) -> Result<String, ToolError> {
        let count = self.max_results.to_string();
        let response = self
            .client
            .get(format!("{}/res/v1/web/search", self.api_base))
            .query(&[("q", query), ("count", count.as_str())])
            .header("Accept", "application/json")
            .header("X-Subscription-Token", api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::Backend(format!("search API returned {}", status)));
        }

        let data: Value = response.json().await?;
        let results = data
            .get("web")
            .and_then(|w| w.get("results"))
            .and_then(|r| r.as_array())
            .filter(|r| !r.is_empty());

        let Some(results) = results else {
            return Ok(format!("No results for: {}", query));
        };

        let mut lines = vec![format!("Results for: {}", query)];
        for (i, item) in results.iter().take(self.max_results as usize).enumerate() {
            let title = item.get("title").and_then(|t| t.as_str()).unwrap_or("");
            let url = item.get("url").and_then(|u| u.as_str()).unwrap_or("");
            let desc = item
                .get("description")
                .and_then(|d| d.as_str())
                .unwrap_or("");
            lines.push(format!("{}. {}", i + 1, title));
            lines.push(format!("   {}", url));
            if !desc.is_empty() {
                lines.push(format!("   {}", desc));
            }
        }
        Ok(lines.join("\n"))
    }
}

#[async_trait]
impl Capability for SearchWebTool {
    fn name(&self) -> &str {
        "search_web"
    }

    fn description(&self) -> &str {
        "Search the web and return a short summary of what was found."
    }

    fn usage(&self) -> &str {
        "<query>"
    }

    async fn invoke(&self, argument: &str) -> Result<String, ToolError> {
        let query = argument.trim();
        if query.is_empty() {
            return Err(ToolError::InvalidArgument("a search query is required".into()));
        }

        debug!("◆ SEARCHING: {}", query);
        match &self.backend {
            SearchBackend::DuckDuckGo => self.search_duckduckgo(query).await,
            SearchBackend::Brave { api_key } => self.search_brave(query, api_key).await,
        }
    }
}

/// Abstract first, then a direct answer, then related topic snippets
fn summarize_duckduckgo(data: &Value, query: &str, max_results: usize) -> String {
    let field = |name: &str| {
        data.get(name)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    };

    if let Some(text) = field("AbstractText") {
        return match field("AbstractURL") {
            Some(url) => format!("{}\nSource: {}", text, url),
            None => text.to_string(),
        };
    }

    if let Some(answer) = field("Answer") {
        return answer.to_string();
    }

    let mut snippets = Vec::new();
    if let Some(topics) = data.get("RelatedTopics").and_then(|t| t.as_array()) {
        collect_topics(topics, &mut snippets, max_results);
    }

    if snippets.is_empty() {
        format!("No results found for: {}", query)
    } else {
        let mut lines = vec![format!("Results for: {}", query)];
        for (i, snippet) in snippets.iter().enumerate() {
            lines.push(format!("{}. {}", i + 1, snippet));
        }
        lines.join("\n")
    }
}

// Topics may be grouped one level deep under "Topics"
fn collect_topics(topics: &[Value], out: &mut Vec<String>, max: usize) {
    for topic in topics {
        if out.len() >= max {
            return;
        }
        if let Some(text) = topic.get("Text").and_then(|t| t.as_str()) {
            if !text.trim().is_empty() {
                out.push(text.trim().to_string());
            }
        } else if let Some(nested) = topic.get("Topics").and_then(|t| t.as_array()) {
            collect_topics(nested, out, max);
        }
    }
}
