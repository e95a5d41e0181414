//! Parlance command implementations

use anyhow::{Context, Result};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use parlance_agent::{AgentLoop, ToolRegistry};
use parlance_config::{self, Config, ProviderKind};
use parlance_gateway::SharedAgent;
use parlance_provider::{GeminiProvider, OpenAiCompatProvider, Provider};
use parlance_session::SessionStore;

use crate::repl::{parse_input, ReplInput, HELP};

const PERSONA_MD: &str = "\
# Persona

Notes added here are appended to the agent's system prompt.
";

/// Build the completion client selected in config
fn build_provider(config: &Config) -> Result<Arc<dyn Provider>> {
    let api_key = config.api_key().context(match config.provider.kind {
        ProviderKind::Gemini => {
            "No API key configured. Set GOOGLE_API_KEY or provider.api_key in ~/.parlance/config.json"
        }
        ProviderKind::OpenAi => {
            "No API key configured. Set OPENAI_API_KEY or provider.api_key in ~/.parlance/config.json"
        }
    })?;

    let timeout = Duration::from_secs(config.agent.completion_timeout_secs);
    let model = config.model();

    let provider: Arc<dyn Provider> = match config.provider.kind {
        ProviderKind::Gemini => Arc::new(GeminiProvider::with_timeout(
            api_key,
            config.api_base(),
            model,
            timeout,
        )),
        ProviderKind::OpenAi => Arc::new(OpenAiCompatProvider::with_timeout(
            api_key,
            config.api_base(),
            model,
            timeout,
        )),
    };
    debug!("Provider ready: {:?}", config.provider.kind);
    Ok(provider)
}

fn build_store(config: &Config) -> SessionStore {
    if config.sessions.persist {
        SessionStore::persistent(config.sessions_path())
    } else {
        SessionStore::in_memory()
    }
}

/// Wire provider, tools and sessions into an agent loop
fn build_agent(config: &Config) -> Result<SharedAgent> {
    let provider = build_provider(config)?;
    let registry = Arc::new(ToolRegistry::from_config(config));
    let sessions = Arc::new(build_store(config));
    Ok(Arc::new(AgentLoop::new(provider, registry, sessions, config)))
}

/// Initialize config and workspace
pub async fn init_command() -> Result<()> {
    println!("◆ Initializing Parlance...");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config = parlance_config::init()
        .await
        .context("Failed to write default config")?;

    let workspace = config.workspace_path();
    let persona = workspace.join("PERSONA.md");
    if !persona.exists() {
        tokio::fs::write(&persona, PERSONA_MD)
            .await
            .with_context(|| format!("Failed to write {}", persona.display()))?;
        println!("  Created {}", persona.display());
    }

    println!("\n◆ Parlance initialized");
    println!("  Config:    {}", parlance_config::config_path().display());
    println!("  Workspace: {}", workspace.display());
    println!("\nNext steps:");
    println!("  1. Export GOOGLE_API_KEY or add it to the config file");
    println!("  2. Start chatting: parlance chat -m \"Hello!\"");

    Ok(())
}

/// One-shot or interactive chat
pub async fn chat_command(message: Option<String>, session: Option<String>) -> Result<()> {
    let config = Config::load().await.context("Failed to load config")?;
    let agent = build_agent(&config)?;
    let session_key = session.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    if let Some(message) = message {
        let exchange = agent.process(&session_key, &message).await?;
        println!("\n◆ {}", exchange.response);
        return Ok(());
    }

    println!("◆ Interactive mode, session {}", session_key);
    println!("  Type /help for commands, 'exit' to quit");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    loop {
        print!("◆ ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if std::io::stdin().read_line(&mut line)? == 0 {
            // EOF
            println!();
            break;
        }

        match parse_input(&line) {
            ReplInput::Empty => continue,
            ReplInput::Quit => break,
            ReplInput::Help => println!("{}", HELP),
            ReplInput::Tools => print_tools(agent.registry()),
            ReplInput::Info => print_info(&agent, &session_key).await,
            ReplInput::Clear => {
                agent.sessions().clear(&session_key).await?;
                println!("✓ History cleared");
            }
            ReplInput::History(count) => print_history(&agent, &session_key, count).await,
            ReplInput::Unknown(command) => {
                println!("✗ Unknown command /{} (try /help)", command);
            }
            ReplInput::Message(text) => match agent.process(&session_key, &text).await {
                Ok(exchange) => {
                    if let Some(tool) = &exchange.tool_name {
                        println!("  (used {})", tool);
                    }
                    println!("\n◆ {}\n", exchange.response);
                }
                Err(e) => println!("✗ {}\n", e),
            },
        }
    }

    println!("◆ Goodbye");
    Ok(())
}

async fn print_history(agent: &SharedAgent, session_key: &str, count: usize) {
    let Some(shared) = agent.sessions().get(session_key).await else {
        println!("(no history)");
        return;
    };
    let session = shared.lock().await;
    if session.is_empty() {
        println!("(no history)");
        return;
    }
    for turn in session.recent(count) {
        println!(
            "[{}] {}: {}",
            turn.timestamp.format("%H:%M:%S"),
            turn.role,
            turn.text
        );
    }
}

async fn print_info(agent: &SharedAgent, session_key: &str) {
    let info = agent.info(Some(session_key)).await;
    println!("Agent:     {}", info.name);
    println!("Model:     {}", info.model);
    println!("Session:   {}", session_key);
    println!("Exchanges: {}", info.conversation_count);
    println!("Sessions:  {}", info.session_count);
    println!("Tools:     {}", info.available_tools.join(", "));
}

fn print_tools(registry: &ToolRegistry) {
    for tool in registry.descriptions() {
        println!("  {} {}", tool.name, tool.usage);
        println!("      {}", tool.description);
    }
}

/// Start the HTTP gateway
pub async fn serve_command(host: Option<String>, port: Option<u16>) -> Result<()> {
    let mut config = Config::load().await.context("Failed to load config")?;
    if let Some(host) = host {
        config.gateway.host = host;
    }
    if let Some(port) = port {
        config.gateway.port = port;
    }

    let agent = build_agent(&config)?;
    let addr = config.gateway_addr();

    println!("◆ Parlance gateway on http://{}", addr);
    info!(
        "Tools: {}",
        agent.registry().names().join(", ")
    );

    parlance_gateway::serve(agent, &addr)
        .await
        .with_context(|| format!("Gateway failed on {}", addr))
}

/// Show system status
pub async fn status_command() -> Result<()> {
    let config_path = parlance_config::config_path();

    println!("◆ Parlance Status");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!(
        "Config:    {} {}",
        config_path.display(),
        if config_path.exists() {
            "[OK]"
        } else {
            "[Missing]"
        }
    );

    let config = Config::load().await.context("Failed to load config")?;
    let workspace = config.workspace_path();
    println!(
        "Workspace: {} {}",
        workspace.display(),
        if workspace.exists() {
            "[OK]"
        } else {
            "[Missing]"
        }
    );
    println!("Provider:  {:?}", config.provider.kind);
    println!(
        "Model:     {}",
        config
            .model()
            .unwrap_or_else(|| "(provider default)".to_string())
    );
    println!(
        "API Key:   {}",
        if config.has_api_key() {
            "[Set]"
        } else {
            "[Missing]"
        }
    );
    println!("Search:    {:?}", config.toolkit.search.backend);
    println!(
        "Commands:  {}",
        if config.exec_enabled() {
            "[Enabled]"
        } else {
            "[Disabled]"
        }
    );
    println!(
        "Sessions:  {}",
        if config.sessions.persist {
            format!("persisted to {}", config.sessions_path().display())
        } else {
            "in memory".to_string()
        }
    );
    println!("Gateway:   {}", config.gateway_addr());

    println!("\n◆ Ready");
    Ok(())
}

/// List the tools the agent can call
pub async fn tools_command() -> Result<()> {
    let config = Config::load().await.context("Failed to load config")?;
    let registry = ToolRegistry::from_config(&config);

    println!("◆ Available tools");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    print_tools(&registry);
    if !config.exec_enabled() {
        println!("\n  run_command is disabled (toolkit.exec.enabled = false)");
    }
    Ok(())
}
