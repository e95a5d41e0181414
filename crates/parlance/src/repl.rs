//! Interactive chat input handling

/// Turns shown by `/history` when no count is given
pub const DEFAULT_HISTORY: usize = 10;

/// What a line typed at the prompt asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplInput {
    Empty,
    Quit,
    Help,
    History(usize),
    Tools,
    Info,
    Clear,
    Unknown(String),
    Message(String),
}

/// Classify one line of input
pub fn parse_input(line: &str) -> ReplInput {
    let line = line.trim();
    if line.is_empty() {
        return ReplInput::Empty;
    }
    if ["exit", "quit", "sair"]
        .iter()
        .any(|word| line.eq_ignore_ascii_case(word))
    {
        return ReplInput::Quit;
    }

    let Some(command) = line.strip_prefix('/') else {
        return ReplInput::Message(line.to_string());
    };

    let mut parts = command.split_whitespace();
    match parts.next().unwrap_or("").to_lowercase().as_str() {
        "quit" | "exit" | "sair" => ReplInput::Quit,
        "help" => ReplInput::Help,
        "tools" => ReplInput::Tools,
        "info" => ReplInput::Info,
        "clear" => ReplInput::Clear,
        "history" => {
            let count = parts
                .next()
                .and_then(|n| n.parse::<usize>().ok())
                .unwrap_or(DEFAULT_HISTORY);
            ReplInput::History(count)
        }
        other => ReplInput::Unknown(other.to_string()),
    }
}

pub const HELP: &str = "\
Commands:
  /help          Show this help
  /history [n]   Show the last n turns (default 10)
  /tools         List available tools
  /info          Show agent name, model, session and tools
  /clear         Clear this session's history
  /quit, /exit   Leave (plain 'exit', 'quit' and 'sair' work too)";
