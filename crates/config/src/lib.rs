//! Configuration management for Parlance
//!
//! Loads and saves agent, provider, toolkit and gateway settings as JSON.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod paths;

pub use paths::{config_path, data_dir, sessions_dir, workspace_path};

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("CONFIG IO ERROR: {0}")]
    Io(#[from] std::io::Error),

    #[error("CONFIG PARSE FAILED: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Agent behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_agent_name")]
    pub name: String,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Turns of history sent to the model per completion
    #[serde(default = "default_max_history_turns")]
    pub max_history_turns: usize,
    #[serde(default = "default_completion_timeout_secs")]
    pub completion_timeout_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            system_prompt: default_system_prompt(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            max_history_turns: default_max_history_turns(),
            completion_timeout_secs: default_completion_timeout_secs(),
        }
    }
}

fn default_agent_name() -> String {
    "Parlance".to_string()
}

fn default_system_prompt() -> String {
    "You are an AI agent that helps users by reasoning clearly, \
     calling tools when needed, and giving structured answers."
        .to_string()
}

/// Model written into a fresh config
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-pro";

fn default_model() -> String {
    DEFAULT_GEMINI_MODEL.to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_history_turns() -> usize {
    40
}

fn default_completion_timeout_secs() -> u64 {
    60
}

/// Which completion backend to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Gemini,
    #[serde(alias = "openrouter")]
    OpenAi,
}

/// Completion provider credentials
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProviderConfig {
    #[serde(default)]
    pub kind: ProviderKind,
    #[serde(default)]
    pub api_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
}

/// Search backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchBackendKind {
    #[default]
    DuckDuckGo,
    Brave,
}

/// Web search capability
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub backend: SearchBackendKind,
    #[serde(default)]
    pub api_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    #[serde(default = "default_max_results")]
    pub max_results: u32,
}

fn default_max_results() -> u32 {
    5
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            backend: SearchBackendKind::default(),
            api_key: String::new(),
            api_base: None,
            max_results: default_max_results(),
        }
    }
}

/// Command execution capability. Off unless deployment policy turns it on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_exec_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_exec_timeout_secs() -> u64 {
    60
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            timeout_secs: default_exec_timeout_secs(),
        }
    }
}

/// Tool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolkitConfig {
    #[serde(default = "default_workspace")]
    pub workspace: String,
    #[serde(default = "default_true")]
    pub restrict_to_workspace: bool,
    /// Upper bound for a single capability call
    #[serde(default = "default_tool_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_output_chars")]
    pub max_output_chars: usize,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub exec: ExecConfig,
}

impl Default for ToolkitConfig {
    fn default() -> Self {
        Self {
            workspace: default_workspace(),
            restrict_to_workspace: true,
            timeout_secs: default_tool_timeout_secs(),
            max_output_chars: default_max_output_chars(),
            search: SearchConfig::default(),
            exec: ExecConfig::default(),
        }
    }
}

fn default_workspace() -> String {
    "~/.parlance/workspace".to_string()
}

fn default_true() -> bool {
    true
}

fn default_tool_timeout_secs() -> u64 {
    30
}

fn default_max_output_chars() -> usize {
    10_000
}

/// Session storage
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SessionsConfig {
    #[serde(default)]
    pub persist: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

/// HTTP gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

/// Root configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub toolkit: ToolkitConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
}

impl Config {
    /// Load from the default location, then apply environment overrides
    pub async fn load() -> Result<Self> {
        let path = config_path();
        let mut config = Self::load_from(&path).await?;
        config.apply_env();
        Ok(config)
    }

    /// Load from a specific location. A missing file yields defaults.
    pub async fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("◆ NO CONFIG AT {:?}, USING DEFAULTS", path);
            return Ok(Config::default());
        }

        debug!("◆ LOADING CONFIG FROM {:?}", path);
        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save to the default location
    pub async fn save(&self) -> Result<()> {
        let path = config_path();
        self.save_to(&path).await
    }

    /// Save to a specific location
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        debug!("◆ WRITING CONFIG TO {:?}", path);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_from(|name| std::env::var(name).ok());
    }

    /// Apply overrides using `lookup` to resolve variable names
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let key = match self.provider.kind {
            ProviderKind::Gemini => get("GOOGLE_API_KEY").or_else(|| get("GEMINI_API_KEY")),
            ProviderKind::OpenAi => get("OPENAI_API_KEY").or_else(|| get("OPENROUTER_API_KEY")),
        };
        if let Some(key) = key {
            self.provider.api_key = key;
        }

        if let Some(model) = get("PARLANCE_MODEL").or_else(|| get("GEMINI_MODEL")) {
            self.agent.model = model;
        }

        if let Some(key) = get("BRAVE_API_KEY") {
            if self.toolkit.search.api_key.is_empty() {
                self.toolkit.search.api_key = key;
            }
        }
    }

    /// Workspace directory with `~` expanded
    pub fn workspace_path(&self) -> PathBuf {
        expand_home(&self.toolkit.workspace)
    }

    /// Directory for persisted sessions
    pub fn sessions_path(&self) -> PathBuf {
        match &self.sessions.dir {
            Some(dir) if !dir.is_empty() => expand_home(dir),
            _ => sessions_dir(),
        }
    }

    /// Provider API key, if one is set
    pub fn api_key(&self) -> Option<String> {
        let key = self.provider.api_key.trim();
        if key.is_empty() {
            None
        } else {
            Some(key.to_string())
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key().is_some()
    }

    /// Provider base URL override
    pub fn api_base(&self) -> Option<String> {
        self.provider
            .api_base
            .as_ref()
            .filter(|b| !b.is_empty())
            .cloned()
    }

    /// Model to request, or `None` to use the provider's own default.
    ///
    /// The stock Gemini model name is dropped for non-Gemini providers.
    pub fn model(&self) -> Option<String> {
        let model = self.agent.model.trim();
        if model.is_empty() {
            return None;
        }
        if self.provider.kind != ProviderKind::Gemini && model == DEFAULT_GEMINI_MODEL {
            return None;
        }
        Some(model.to_string())
    }

    /// Brave key, only meaningful for the Brave backend
    pub fn brave_api_key(&self) -> Option<String> {
        let key = &self.toolkit.search.api_key;
        if key.is_empty() {
            None
        } else {
            Some(key.clone())
        }
    }

    pub fn exec_enabled(&self) -> bool {
        self.toolkit.exec.enabled
    }

    pub fn gateway_addr(&self) -> String {
        format!("{}:{}", self.gateway.host, self.gateway.port)
    }
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    } else if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

/// Write a default config (if none exists) and create the workspace
pub async fn init() -> Result<Config> {
    let config_path = config_path();

    if config_path.exists() {
        warn!("◆ CONFIG ALREADY EXISTS AT {:?}", config_path);
    } else {
        let config = Config::default();
        config.save().await?;
        info!("◆ CONFIG WRITTEN TO {:?}", config_path);
    }

    let config = Config::load().await?;
    let workspace = config.workspace_path();
    tokio::fs::create_dir_all(&workspace).await?;
    info!("◆ WORKSPACE READY AT {:?}", workspace);

    Ok(config)
}
