//! 通知系统构建器 - 根据配置注册渠道

use super::channel::DEFAULT_PACING;
use super::channels::{TelegramConfig, TelegramSender, WhatsAppConfig, WhatsAppSender};
use super::dispatcher::NotificationDispatcher;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// 通知系统构建器
///
/// 只有凭据完整的渠道才会被注册。
pub struct NotificationBuilder {
    client: Client,
    pacing: Duration,
    dry_run: bool,
    telegram: Option<TelegramConfig>,
    whatsapp: Option<WhatsAppConfig>,
}

impl NotificationBuilder {
    /// `client` 为共享的 HTTP 客户端
    pub fn new(client: Client) -> Self {
        Self {
            client,
            pacing: DEFAULT_PACING,
            dry_run: false,
            telegram: None,
            whatsapp: None,
        }
    }

    /// 设置消息间隔
    pub fn pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    /// 设置 dry-run 模式
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn telegram(mut self, config: Option<TelegramConfig>) -> Self {
        self.telegram = config;
        self
    }

    pub fn whatsapp(mut self, config: Option<WhatsAppConfig>) -> Self {
        self.whatsapp = config;
        self
    }

    /// 构建 NotificationDispatcher
    pub fn build(self) -> NotificationDispatcher {
        let mut dispatcher = NotificationDispatcher::new().with_dry_run(self.dry_run);

        // 1. Telegram
        if let Some(config) = self.telegram.filter(TelegramConfig::is_configured) {
            info!(channel = "telegram", target = %config.chat_id, "Detected Telegram channel");
            let sender = TelegramSender::new(self.client.clone(), config).with_pacing(self.pacing);
            dispatcher.register_channel(Arc::new(sender));
        }

        // 2. WhatsApp
        if let Some(config) = self.whatsapp.filter(WhatsAppConfig::is_configured) {
            info!(channel = "whatsapp", target = %config.recipient, "Detected WhatsApp channel");
            let sender = WhatsAppSender::new(self.client.clone(), config).with_pacing(self.pacing);
            dispatcher.register_channel(Arc::new(sender));
        }

        if dispatcher.channel_count() == 0 {
            info!("No notification channels configured");
        }

        dispatcher
    }
}
