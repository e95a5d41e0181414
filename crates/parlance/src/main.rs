//! Parlance - a conversational agent for your terminal

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

mod commands;
mod repl;

use commands::{chat_command, init_command, serve_command, status_command, tools_command};

/// Parlance - conversational agent with tool dispatch
#[derive(Parser)]
#[command(name = "parlance")]
#[command(about = "◆ A conversational agent that calls tools on request")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config and workspace
    Init,
    /// Chat with the agent
    Chat {
        /// Message to send (omit for interactive mode)
        #[arg(short, long)]
        message: Option<String>,
        /// Session ID (a new one is generated when omitted)
        #[arg(short, long)]
        session: Option<String>,
        /// Verbose logging
        #[arg(short, long)]
        verbose: bool,
    },
    /// Start the HTTP gateway
    Serve {
        /// Address to bind (overrides config)
        #[arg(long)]
        host: Option<String>,
        /// Port to bind (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
        /// Verbose logging
        #[arg(short, long)]
        verbose: bool,
    },
    /// Show system status
    Status,
    /// List available tools
    Tools,
}

fn init_tracing(command: &Commands) {
    let verbose = matches!(
        command,
        Commands::Serve { verbose: true, .. } | Commands::Chat { verbose: true, .. }
    );

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        let default_level = match command {
            Commands::Serve { .. } => "info",
            _ => "warn",
        };
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.command);

    let result = match cli.command {
        Commands::Init => init_command().await,
        Commands::Chat {
            message, session, ..
        } => chat_command(message, session).await,
        Commands::Serve { host, port, .. } => serve_command(host, port).await,
        Commands::Status => status_command().await,
        Commands::Tools => tools_command().await,
    };

    if let Err(e) = result {
        error!("{:#}", e);
        eprintln!("✗ {:#}", e);
        std::process::exit(1);
    }
}
