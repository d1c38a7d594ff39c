//! Chat transport seam
//!
//! The conversation only sees [`Inbound`] messages and talks back through
//! [`ChatTransport`]. The Telegram client is the production implementation.

use std::path::Path;

use async_trait::async_trait;

use crate::error::TelegramError;

/// Telegram user identifier
pub type UserId = i64;

/// Telegram chat identifier
pub type ChatId = i64;

/// Bot commands the conversation reacts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Cancel,
    /// Any other `/command`; never handled
    Other(String),
}

impl Command {
    /// Parse a leading `/command` (with optional `@botname` suffix).
    /// Returns None when the text is not a command.
    pub fn parse(text: &str) -> Option<Command> {
        let word = text.strip_prefix('/')?.split(char::is_whitespace).next()?;
        let name = word.split('@').next().unwrap_or(word);
        if name.is_empty() {
            return None;
        }

        match name.to_ascii_lowercase().as_str() {
            "start" => Some(Command::Start),
            "cancel" => Some(Command::Cancel),
            other => Some(Command::Other(other.to_string())),
        }
    }
}

/// One resolution of an uploaded photo
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoVariant {
    pub file_id: String,
    pub width: u32,
    pub height: u32,
    pub file_size: Option<u64>,
}

impl PhotoVariant {
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// What the user sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundKind {
    Command(Command),
    Text(String),
    /// All resolutions Telegram offers for a single photo
    Photo(Vec<PhotoVariant>),
    /// Stickers, documents, voice and the like
    Other,
}

/// A message from a user, stripped of transport details
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    pub user_id: UserId,
    pub chat_id: ChatId,
    pub kind: InboundKind,
}

impl Inbound {
    /// Classify plain text as either a command or free text
    pub fn text(user_id: UserId, chat_id: ChatId, text: &str) -> Self {
        let kind = match Command::parse(text) {
            Some(command) => InboundKind::Command(command),
            None => InboundKind::Text(text.to_string()),
        };
        Self {
            user_id,
            chat_id,
            kind,
        }
    }

    pub fn photo(user_id: UserId, chat_id: ChatId, variants: Vec<PhotoVariant>) -> Self {
        Self {
            user_id,
            chat_id,
            kind: InboundKind::Photo(variants),
        }
    }
}

/// Reply keyboard with fixed button labels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyKeyboard {
    pub rows: Vec<Vec<String>>,
    /// Hide the keyboard after one press
    pub one_time: bool,
    /// Shrink the keyboard to fit its buttons
    pub resize: bool,
}

impl ReplyKeyboard {
    /// A single row of buttons, hidden after use
    pub fn single_row(labels: &[&str]) -> Self {
        Self {
            rows: vec![labels.iter().map(|l| l.to_string()).collect()],
            one_time: true,
            resize: true,
        }
    }
}

/// Outbound side of the chat transport
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send a text reply, optionally with a reply keyboard
    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: Option<&ReplyKeyboard>,
    ) -> Result<(), TelegramError>;

    /// Upload a photo from disk
    async fn send_photo(&self, chat_id: ChatId, path: &Path) -> Result<(), TelegramError>;

    /// Download an uploaded file to `dest`, overwriting it
    async fn download_file(&self, file_id: &str, dest: &Path) -> Result<(), TelegramError>;
}
