//! 通知层 - 渲染新增公告并发送到各消息渠道
//!
//! # 设计目标
//! 1. 统一接口：所有渠道实现 `ChannelSender` trait
//! 2. 渠道解耦：每个渠道独立发送，一个渠道失败不影响其他渠道
//! 3. 按配置注册：`NotificationBuilder` 只注册凭据完整的渠道
//! 4. 限速：同一渠道内逐条发送，相邻消息之间固定间隔
//!
//! # 使用示例
//! ```ignore
//! use notice_monitor::notification::NotificationBuilder;
//!
//! let dispatcher = NotificationBuilder::new(reqwest::Client::new())
//!     .telegram(Some(TelegramConfig::new(token, "@notices")))
//!     .build();
//!
//! let report = dispatcher.dispatch(&delta).await;
//! ```

pub mod builder;
pub mod channel;
pub mod channels;
pub mod dispatcher;
pub mod formatter;

pub use builder::NotificationBuilder;
pub use channel::{ChannelKind, ChannelSender, SendResult, SendSummary, DEFAULT_PACING};
pub use channels::{TelegramConfig, TelegramSender, WhatsAppConfig, WhatsAppSender};
pub use dispatcher::{DispatchReport, NotificationDispatcher};
pub use formatter::MessageFormatter;
