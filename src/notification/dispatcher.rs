//! 通知分发器 - 为增量渲染消息并交给所有已注册渠道

use super::channel::{ChannelKind, ChannelSender, SendResult};
use super::formatter::MessageFormatter;
use crate::model::Delta;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// 一次分发中各渠道的结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchReport {
    pub results: Vec<(String, SendResult)>,
}

impl DispatchReport {
    /// 实际被调用的渠道数量
    pub fn invoked(&self) -> usize {
        self.results
            .iter()
            .filter(|(_, r)| !matches!(r, SendResult::Skipped(_)))
            .count()
    }

    pub fn result_for(&self, channel: &str) -> Option<&SendResult> {
        self.results
            .iter()
            .find(|(name, _)| name == channel)
            .map(|(_, r)| r)
    }
}

/// 通知分发器 - 管理多个渠道并路由消息
pub struct NotificationDispatcher {
    /// 所有注册的渠道
    channels: Vec<Arc<dyn ChannelSender>>,
    formatter: MessageFormatter,
    /// 是否为 dry-run 模式
    dry_run: bool,
}

impl NotificationDispatcher {
    /// 创建新的分发器
    pub fn new() -> Self {
        Self {
            channels: Vec::new(),
            formatter: MessageFormatter::new(),
            dry_run: false,
        }
    }

    /// 设置 dry-run 模式
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// 注册渠道
    pub fn register_channel(&mut self, channel: Arc<dyn ChannelSender>) {
        info!(channel = channel.name(), kind = %channel.kind(), "Registering notification channel");
        self.channels.push(channel);
    }

    /// 按分类顺序、条目顺序为每种渠道渲染消息
    fn render(&self, delta: &Delta) -> BTreeMap<ChannelKind, Vec<String>> {
        let mut rendered: BTreeMap<ChannelKind, Vec<String>> = BTreeMap::new();
        for channel in &self.channels {
            rendered.entry(channel.kind()).or_default();
        }

        for (kind, messages) in rendered.iter_mut() {
            messages.extend(
                delta
                    .entries()
                    .map(|(category, item)| self.formatter.format(category, item, *kind)),
            );
        }
        rendered
    }

    /// 将增量发送到所有渠道
    ///
    /// 每个渠道最多调用一次；某个渠道失败不影响其他渠道，也不会向上返回错误。
    pub async fn dispatch(&self, delta: &Delta) -> DispatchReport {
        let rendered = self.render(delta);
        let mut report = DispatchReport::default();

        for channel in &self.channels {
            let name = channel.name().to_string();
            let messages = rendered
                .get(&channel.kind())
                .map(Vec::as_slice)
                .unwrap_or(&[]);

            if messages.is_empty() {
                report
                    .results
                    .push((name, SendResult::Skipped("no messages".to_string())));
                continue;
            }

            if self.dry_run {
                for message in messages {
                    info!(channel = %name, message = %message, "[DRY-RUN] Would send");
                }
                report
                    .results
                    .push((name, SendResult::Skipped("dry-run".to_string())));
                continue;
            }

            let result = match channel.send_items(messages).await {
                Ok(summary) => {
                    info!(
                        channel = %name,
                        sent = summary.sent,
                        failed = summary.failed,
                        "Channel finished sending"
                    );
                    SendResult::Sent(summary)
                }
                Err(e) => {
                    warn!(channel = %name, error = %e, "Channel send failed");
                    SendResult::Failed(e.to_string())
                }
            };
            report.results.push((name, result));
        }

        report
    }

    /// 获取已注册的渠道数量
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// 获取已注册的渠道名称
    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name()).collect()
    }
}

impl Default for NotificationDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
