//! Telegram 渠道（Bot API sendMessage）

use crate::notification::channel::{ChannelKind, ChannelSender, DEFAULT_PACING};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

fn default_api_base() -> String {
    TELEGRAM_API_BASE.to_string()
}

/// Telegram 渠道配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot token
    #[serde(default)]
    pub bot_token: String,
    /// Chat ID（频道可以是 `@name`）
    #[serde(default)]
    pub chat_id: String,
    /// Bot API 地址，测试时可替换
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

impl TelegramConfig {
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
            api_base: default_api_base(),
        }
    }

    /// token 和 chat id 都存在才注册渠道
    pub fn is_configured(&self) -> bool {
        !self.bot_token.trim().is_empty() && !self.chat_id.trim().is_empty()
    }

    pub fn send_message_url(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.api_base.trim_end_matches('/'),
            self.bot_token
        )
    }
}

/// sendMessage 请求体
#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

/// Telegram 渠道
pub struct TelegramSender {
    client: Client,
    config: TelegramConfig,
    pacing: Duration,
}

impl TelegramSender {
    /// `client` 由调度器持有，这里只借用其克隆
    pub fn new(client: Client, config: TelegramConfig) -> Self {
        Self {
            client,
            config,
            pacing: DEFAULT_PACING,
        }
    }

    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    fn request<'a>(&'a self, body: &'a str) -> SendMessageRequest<'a> {
        SendMessageRequest {
            chat_id: &self.config.chat_id,
            text: body,
            parse_mode: "MarkdownV2",
            disable_web_page_preview: true,
        }
    }
}

#[async_trait]
impl ChannelSender for TelegramSender {
    fn name(&self) -> &str {
        "telegram"
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::Telegram
    }

    fn pacing(&self) -> Duration {
        self.pacing
    }

    async fn send_one(&self, body: &str) -> Result<()> {
        let response = self
            .client
            .post(self.config.send_message_url())
            .json(&self.request(body))
            .send()
            .await
            .context("Telegram request failed")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!("Telegram returned HTTP {}: {}", status.as_u16(), text);
        }
        Ok(())
    }
}
