//! Telegram Bot API wire types
//!
//! Only the fields the bot reads or writes are modelled; everything else
//! in Telegram's payloads is ignored on deserialization.

use serde::{Deserialize, Serialize};

use crate::chat::{Inbound, InboundKind, PhotoVariant, ReplyKeyboard};

/// Envelope around every Bot API result
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
    pub error_code: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

impl Update {
    /// Convert to an [`Inbound`] message. Updates without a message or a
    /// sender (channel posts, service updates) yield None.
    pub fn into_inbound(self) -> Option<Inbound> {
        let message = self.message?;
        let user_id = message.from?.id;
        let chat_id = message.chat.id;

        if let Some(text) = message.text {
            return Some(Inbound::text(user_id, chat_id, &text));
        }
        if !message.photo.is_empty() {
            let variants = message.photo.into_iter().map(PhotoVariant::from).collect();
            return Some(Inbound::photo(user_id, chat_id, variants));
        }
        Some(Inbound {
            user_id,
            chat_id,
            kind: InboundKind::Other,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub from: Option<User>,
    pub chat: Chat,
    pub text: Option<String>,
    #[serde(default)]
    pub photo: Vec<PhotoSize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
    pub width: u32,
    pub height: u32,
    pub file_size: Option<u64>,
}

impl From<PhotoSize> for PhotoVariant {
    fn from(p: PhotoSize) -> Self {
        PhotoVariant {
            file_id: p.file_id,
            width: p.width,
            height: p.height,
            file_size: p.file_size,
        }
    }
}

/// Result of getFile
#[derive(Debug, Clone, Deserialize)]
pub struct File {
    pub file_path: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GetUpdatesRequest {
    pub offset: i64,
    pub timeout: u64,
    pub allowed_updates: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct SendMessageRequest<'a> {
    pub chat_id: i64,
    pub text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<KeyboardMarkup>,
}

#[derive(Debug, Serialize)]
pub struct GetFileRequest<'a> {
    pub file_id: &'a str,
}

#[derive(Debug, Serialize)]
pub struct KeyboardMarkup {
    pub keyboard: Vec<Vec<KeyboardButton>>,
    pub one_time_keyboard: bool,
    pub resize_keyboard: bool,
}

#[derive(Debug, Serialize)]
pub struct KeyboardButton {
    pub text: String,
}

impl From<&ReplyKeyboard> for KeyboardMarkup {
    fn from(kb: &ReplyKeyboard) -> Self {
        KeyboardMarkup {
            keyboard: kb
                .rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|label| KeyboardButton {
                            text: label.clone(),
                        })
                        .collect()
                })
                .collect(),
            one_time_keyboard: kb.one_time,
            resize_keyboard: kb.resize,
        }
    }
}
