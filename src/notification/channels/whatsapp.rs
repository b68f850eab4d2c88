//! WhatsApp 渠道（HTTP 网关）

use crate::notification::channel::{ChannelKind, ChannelSender, DEFAULT_PACING};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const WHATSAPP_API_URL: &str = "https://gate.whapi.cloud/messages/text";

fn default_api_url() -> String {
    WHATSAPP_API_URL.to_string()
}

/// WhatsApp 渠道配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhatsAppConfig {
    /// 网关发送接口
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Bearer token
    #[serde(default)]
    pub auth_token: String,
    /// 接收者（手机号或群组 ID）
    #[serde(default)]
    pub recipient: String,
}

impl WhatsAppConfig {
    pub fn new(auth_token: impl Into<String>, recipient: impl Into<String>) -> Self {
        Self {
            api_url: default_api_url(),
            auth_token: auth_token.into(),
            recipient: recipient.into(),
        }
    }

    /// token 和接收者都存在才注册渠道
    pub fn is_configured(&self) -> bool {
        !self.auth_token.trim().is_empty() && !self.recipient.trim().is_empty()
    }
}

/// 网关请求载荷
#[derive(Debug, Serialize)]
struct TextMessage<'a> {
    typing_time: u32,
    to: &'a str,
    body: &'a str,
}

/// WhatsApp 渠道
pub struct WhatsAppSender {
    client: Client,
    config: WhatsAppConfig,
    pacing: Duration,
}

impl WhatsAppSender {
    pub fn new(client: Client, config: WhatsAppConfig) -> Self {
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

    fn payload<'a>(&'a self, body: &'a str) -> TextMessage<'a> {
        TextMessage {
            typing_time: 0,
            to: &self.config.recipient,
            body,
        }
    }
}

#[async_trait]
impl ChannelSender for WhatsAppSender {
    fn name(&self) -> &str {
        "whatsapp"
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::WhatsApp
    }

    fn pacing(&self) -> Duration {
        self.pacing
    }

    async fn send_one(&self, body: &str) -> Result<()> {
        let response = self
            .client
            .post(&self.config.api_url)
            .header(header::ACCEPT, "application/json")
            .bearer_auth(&self.config.auth_token)
            .json(&self.payload(body))
            .send()
            .await
            .context("WhatsApp request failed")?;

        if response.status() != StatusCode::OK {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            bail!("WhatsApp returned HTTP {}: {}", status, text);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whatsapp_config_requires_token_and_recipient() {
        assert!(WhatsAppConfig::new("token", "919900000000").is_configured());
        assert!(!WhatsAppConfig::new("", "919900000000").is_configured());
        assert!(!WhatsAppConfig::new("token", "").is_configured());
    }

    #[test]
    fn test_payload_shape() {
        let sender = WhatsAppSender::new(Client::new(), WhatsAppConfig::new("t", "120363@g.us"));
        let value = serde_json::to_value(sender.payload("📢 New Alert!")).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"typing_time": 0, "to": "120363@g.us", "body": "📢 New Alert!"})
        );
    }

    #[test]
    fn test_config_defaults_api_url() {
        let config: WhatsAppConfig =
            serde_json::from_str(r#"{"auth_token": "t", "recipient": "r"}"#).unwrap();
        assert_eq!(config.api_url, WHATSAPP_API_URL);
        assert!(config.is_configured());
    }

    #[test]
    fn test_pacing_override() {
        let sender = WhatsAppSender::new(Client::new(), WhatsAppConfig::new("t", "r"))
            .with_pacing(Duration::from_millis(50));
        assert_eq!(sender.pacing(), Duration::from_millis(50));
        assert_eq!(sender.kind(), ChannelKind::WhatsApp);
    }
}
