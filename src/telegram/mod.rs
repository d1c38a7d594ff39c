//! Telegram Bot API client
//!
//! Provides:
//! - Long polling via getUpdates
//! - Text replies with reply keyboards, photo uploads
//! - File downloads for user-sent photos

mod types;

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Serialize;
use tracing::debug;

use crate::chat::{ChatId, ChatTransport, ReplyKeyboard};
use crate::error::TelegramError;
pub use types::{File, Update};
use types::{ApiResponse, GetFileRequest, GetUpdatesRequest, KeyboardMarkup, SendMessageRequest};

/// Extra time allowed on top of the long-poll timeout before the HTTP
/// request itself gives up
const HTTP_GRACE: Duration = Duration::from_secs(30);

/// Telegram Bot API client
#[derive(Debug, Clone)]
pub struct TelegramClient {
    client: Client,
    api_url: String,
    token: String,
    poll_timeout: Duration,
}

impl TelegramClient {
    /// Create a client for `api_url` (normally https://api.telegram.org)
    pub fn new(
        api_url: &str,
        token: &str,
        poll_timeout: Duration,
    ) -> Result<Self, TelegramError> {
        let client = Client::builder().timeout(poll_timeout + HTTP_GRACE).build()?;
        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            poll_timeout,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_url, self.token, method)
    }

    fn file_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{}", self.api_url, self.token, file_path)
    }

    /// Unwrap the `{ok, result}` envelope. Telegram reports failures with
    /// a non-2xx status and `ok: false`, so the body is read either way.
    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, TelegramError> {
        let status = response.status();
        let body: ApiResponse<T> = response.json().await?;

        match (body.ok, body.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(TelegramError::Api {
                code: body.error_code.unwrap_or(status.as_u16() as i64),
                description: body
                    .description
                    .unwrap_or_else(|| "no description".to_string()),
            }),
        }
    }

    async fn call<B: Serialize, T: DeserializeOwned>(
        &self,
        method: &str,
        body: &B,
    ) -> Result<T, TelegramError> {
        debug!("Calling Telegram method {}", method);
        let response = self
            .client
            .post(self.method_url(method))
            .json(body)
            .send()
            .await?;
        Self::decode(response).await
    }

    /// Fetch updates after `offset`, waiting up to the poll timeout
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>, TelegramError> {
        let request = GetUpdatesRequest {
            offset,
            timeout: self.poll_timeout.as_secs(),
            allowed_updates: vec!["message"],
        };
        self.call("getUpdates", &request).await
    }

    /// Resolve a file id to its download path
    pub async fn get_file(&self, file_id: &str) -> Result<File, TelegramError> {
        self.call("getFile", &GetFileRequest { file_id }).await
    }
}

#[async_trait]
impl ChatTransport for TelegramClient {
    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: Option<&ReplyKeyboard>,
    ) -> Result<(), TelegramError> {
        let request = SendMessageRequest {
            chat_id,
            text,
            reply_markup: keyboard.map(KeyboardMarkup::from),
        };
        let _: IgnoredAny = self.call("sendMessage", &request).await?;
        Ok(())
    }

    async fn send_photo(&self, chat_id: ChatId, path: &Path) -> Result<(), TelegramError> {
        let data = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("photo.jpg")
            .to_string();

        debug!("Uploading {} ({} bytes) to chat {}", file_name, data.len(), chat_id);

        let part = Part::bytes(data)
            .file_name(file_name)
            .mime_str("image/jpeg")?;
        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .part("photo", part);

        let response = self
            .client
            .post(self.method_url("sendPhoto"))
            .multipart(form)
            .send()
            .await?;
        let _: IgnoredAny = Self::decode(response).await?;
        Ok(())
    }

    async fn download_file(&self, file_id: &str, dest: &Path) -> Result<(), TelegramError> {
        let file = self.get_file(file_id).await?;
        let file_path = file
            .file_path
            .ok_or_else(|| TelegramError::MissingFilePath(file_id.to_string()))?;

        let data = self
            .client
            .get(self.file_url(&file_path))
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        tokio::fs::write(dest, &data).await?;
        debug!("Downloaded {} ({} bytes) to {}", file_id, data.len(), dest.display());
        Ok(())
    }
}
