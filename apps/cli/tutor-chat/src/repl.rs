//! Console command parsing.
//!
//! Lines starting with `/` are commands; anything else is chat text. A leading
//! `//` sends the rest of the line as text starting with `/`.

use crate::error::TutorChatError;

use common::ErrorLocation;

use std::panic::Location;
use std::path::PathBuf;

pub const HELP_TEXT: &str = "\
Commands:
  <text>              send a chat message
  /audio <file.wav>   send a recorded voice message
  /connect            open the channel again
  /disconnect         close the channel
  /status             show the channel state
  /help               show this help
  /quit               leave";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Say(String),
    Audio(PathBuf),
    Connect,
    Disconnect,
    Status,
    Help,
    Quit,
}

impl ReplCommand {
    /// Parse one input line. Blank lines yield `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`TutorChatError::Command`] for unknown commands and for
    /// `/audio` without a path.
    #[track_caller]
    pub fn parse(line: &str) -> Result<Option<Self>, TutorChatError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        if let Some(escaped) = line.strip_prefix("//") {
            return Ok(Some(ReplCommand::Say(format!("/{escaped}"))));
        }

        let Some(command) = line.strip_prefix('/') else {
            return Ok(Some(ReplCommand::Say(line.to_string())));
        };

        let (name, argument) = match command.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (command, ""),
        };

        let parsed = match name.to_ascii_lowercase().as_str() {
            "audio" => {
                if argument.is_empty() {
                    return Err(TutorChatError::Command {
                        message: String::from("/audio needs a WAV file path"),
                        location: ErrorLocation::from(Location::caller()),
                    });
                }
                ReplCommand::Audio(PathBuf::from(argument))
            }
            "connect" => ReplCommand::Connect,
            "disconnect" => ReplCommand::Disconnect,
            "status" => ReplCommand::Status,
            "help" | "?" => ReplCommand::Help,
            "quit" | "exit" => ReplCommand::Quit,
            other => {
                return Err(TutorChatError::Command {
                    message: format!("Unknown command: /{other} (try /help)"),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        };

        Ok(Some(parsed))
    }
}
