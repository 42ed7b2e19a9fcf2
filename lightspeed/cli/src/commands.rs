//! Interactive command parsing
//!
//! Lines starting with `/` are commands; anything else is a message.

use std::path::PathBuf;

use lightspeed_core::DisplayMode;

/// One line of interactive input
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Send a message
    Send(String),
    /// Attach a file to the next message
    Attach(PathBuf),
    /// Remove an attachment (1-based, as listed)
    Detach(usize),
    /// List pending attachments
    Attachments,
    /// List models
    Models,
    /// Select a model
    Model(String),
    /// Change the display mode
    Mode(DisplayMode),
    /// List conversations, optionally filtered
    History(Option<String>),
    /// Load a conversation
    Open(String),
    /// Delete a conversation
    Delete(String),
    /// Start a new chat
    New,
    /// Show help
    Help,
    /// Leave
    Quit,
    /// Blank line
    Empty,
}

/// Help text for the interactive loop
pub const HELP: &str = "\
Commands:
  /attach <path>      Attach a file to the next message
  /detach <n>         Remove attachment number n
  /files              List pending attachments
  /models             List available models
  /model <id>         Select a model
  /mode <mode>        Display mode: overlay, docked, fullscreen
  /history [filter]   List conversations
  /open <id>          Load a conversation
  /delete <id>        Delete a conversation
  /new                Start a new chat
  /help               Show this help
  /quit               Exit
Anything else is sent as a message.";

/// Parse one input line
///
/// # Errors
///
/// Returns a message for unknown commands and missing or bad arguments.
pub fn parse(line: &str) -> Result<Command, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Command::Empty);
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Command::Send(line.to_string()));
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };
    let required = |what: &str| {
        if arg.is_empty() {
            Err(format!("/{name} needs {what}"))
        } else {
            Ok(arg.to_string())
        }
    };

    match name {
        "attach" => required("a file path").map(|p| Command::Attach(PathBuf::from(p))),
        "detach" => {
            let n = required("an attachment number")?;
            match n.parse::<usize>() {
                Ok(n) if n > 0 => Ok(Command::Detach(n)),
                _ => Err(format!("'{n}' is not an attachment number")),
            }
        }
        "files" => Ok(Command::Attachments),
        "models" => Ok(Command::Models),
        "model" => required("a model identifier").map(Command::Model),
        "mode" => required("a display mode")?.parse().map(Command::Mode),
        "history" => Ok(Command::History((!arg.is_empty()).then(|| arg.to_string()))),
        "open" => required("a conversation ID").map(Command::Open),
        "delete" => required("a conversation ID").map(Command::Delete),
        "new" => Ok(Command::New),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" | "q" => Ok(Command::Quit),
        other => Err(format!("Unknown command /{other} (try /help)")),
    }
}
