//! Error types shared across the bot

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Telegram Bot API errors
#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("telegram API error {code}: {description}")]
    Api { code: i64, description: String },

    #[error("file {0} has no download path")]
    MissingFilePath(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Generation backend errors
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("prediction failed: {0}")]
    Failed(String),

    #[error("prediction timed out after {0:?}")]
    Timeout(Duration),

    #[error("prediction returned no images")]
    NoOutput,

    #[error("prediction is missing a poll URL")]
    MissingPollUrl,
}

/// Errors raised while handling a conversation step
#[derive(Debug, Error)]
pub enum BotError {
    #[error("telegram: {0}")]
    Telegram(#[from] TelegramError),

    #[error("generation: {0}")]
    Generation(#[from] GenerationError),

    #[error("reference image missing: {}", .0.display())]
    MissingReference(PathBuf),

    #[error("photo message carried no sizes")]
    EmptyPhoto,

    #[error("generation limiter closed")]
    LimiterClosed,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
