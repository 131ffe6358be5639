// src/services/telegram.rs

//! Telegram Bot API channel.

use std::path::Path;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Serialize;

use crate::error::Result;
use crate::models::TelegramConfig;
use crate::services::notify::ChatChannel;
use crate::utils::http;

const CHANNEL: &str = "telegram";

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
}

/// Bot posting alerts into a single chat.
pub struct TelegramBot {
    api_url: String,
    chat_id: i64,
    client: Client,
}

impl TelegramBot {
    pub fn new(config: &TelegramConfig, client: Client) -> Self {
        Self {
            api_url: format!(
                "{}/bot{}",
                config.api_base.trim_end_matches('/'),
                config.token
            ),
            chat_id: config.chat_id,
            client,
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.api_url, method)
    }
}

#[async_trait]
impl ChatChannel for TelegramBot {
    fn name(&self) -> &'static str {
        CHANNEL
    }

    async fn send_short_alert(&self, text: &str) -> Result<()> {
        let payload = SendMessage {
            chat_id: self.chat_id,
            text,
        };
        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&payload)
            .send()
            .await?;
        http::ensure_success(CHANNEL, response).await
    }

    async fn send_photo(&self, path: &Path) -> Result<()> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "photo.png".to_string());

        let form = Form::new()
            .text("chat_id", self.chat_id.to_string())
            .part("photo", Part::bytes(bytes).file_name(file_name));

        let response = self
            .client
            .post(self.method_url("sendPhoto"))
            .multipart(form)
            .send()
            .await?;
        http::ensure_success(CHANNEL, response).await
    }
}
