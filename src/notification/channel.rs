//! 通知渠道 trait 定义

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info};

/// 相邻两条消息之间的默认间隔
pub const DEFAULT_PACING: Duration = Duration::from_millis(700);

/// 渠道类型，决定使用哪种消息渲染
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    /// MarkdownV2 渲染
    Telegram,
    /// 纯文本渲染
    WhatsApp,
}

impl ChannelKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChannelKind::Telegram => "telegram",
            ChannelKind::WhatsApp => "whatsapp",
        }
    }

    /// 是否需要 markdown 转义
    pub fn is_markdown(self) -> bool {
        matches!(self, ChannelKind::Telegram)
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 一次 `send_items` 调用的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendSummary {
    pub attempted: usize,
    pub sent: usize,
    pub failed: usize,
}

/// 渠道发送结果
#[derive(Debug, Clone, PartialEq)]
pub enum SendResult {
    /// 已尝试发送全部消息
    Sent(SendSummary),
    /// 跳过（dry-run 或没有消息）
    Skipped(String),
    /// 整个渠道失败
    Failed(String),
}

/// 通知渠道 trait
///
/// 实现者只需提供单条消息的发送；[`send_items`](ChannelSender::send_items)
/// 负责按顺序逐条发送并在相邻消息之间等待 [`pacing`](ChannelSender::pacing)。
#[async_trait]
pub trait ChannelSender: Send + Sync {
    /// 渠道名称（用于日志）
    fn name(&self) -> &str;

    fn kind(&self) -> ChannelKind;

    /// 相邻消息之间的最小间隔
    fn pacing(&self) -> Duration {
        DEFAULT_PACING
    }

    /// 发送一条消息，非成功响应返回错误
    async fn send_one(&self, body: &str) -> Result<()>;

    /// 按顺序发送所有消息
    ///
    /// 单条失败只记录日志，不影响后续消息，也不重试。
    async fn send_items(&self, messages: &[String]) -> Result<SendSummary> {
        info!(channel = self.name(), count = messages.len(), "Sending messages");
        let mut summary = SendSummary::default();

        for (index, message) in messages.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.pacing()).await;
            }

            summary.attempted += 1;
            match self.send_one(message).await {
                Ok(()) => {
                    summary.sent += 1;
                    debug!(channel = self.name(), index, "Message sent successfully");
                }
                Err(e) => {
                    summary.failed += 1;
                    error!(channel = self.name(), index, error = %e, "Failed to send message");
                }
            }
        }

        Ok(summary)
    }
}
