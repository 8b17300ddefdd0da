//! Chat input grammar.
//!
//! A chat bridge hands the race one line per chat message in the form
//! `<user>: <message>`. Messages starting with `!` may be race commands.

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const COMMAND_PREFIX: char = '!';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatLineParseError {
    #[error("missing `:` between user and message")]
    MissingSeparator,

    #[error("empty user name")]
    EmptyUser,
}

/// A single chat message attributed to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatLine {
    pub user: CompactString,
    pub message: String,
}

impl ChatLine {
    pub fn parse(line: &str) -> Result<Self, ChatLineParseError> {
        let (user, message) = line
            .split_once(':')
            .ok_or(ChatLineParseError::MissingSeparator)?;
        let user = user.trim();
        if user.is_empty() {
            return Err(ChatLineParseError::EmptyUser);
        }
        Ok(Self {
            user: user.into(),
            message: message.trim().to_string(),
        })
    }

    pub fn command(&self) -> Option<ChatCommand> {
        ChatCommand::parse(&self.message)
    }
}

/// Race commands a chatter can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatCommand {
    Join,
    Leave,
    DropItem,
}

impl ChatCommand {
    /// Parse the first word of a message. Case-insensitive; anything after
    /// the command word is ignored.
    pub fn parse(message: &str) -> Option<Self> {
        let word = message.split_whitespace().next()?;
        let name = word.strip_prefix(COMMAND_PREFIX)?;
        match name.to_ascii_lowercase().as_str() {
            "join" => Some(ChatCommand::Join),
            "leave" => Some(ChatCommand::Leave),
            "banana" | "drop" => Some(ChatCommand::DropItem),
            _ => None,
        }
    }
}
