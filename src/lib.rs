//! Notice Monitor - 监控公告页面并把新增公告推送到消息渠道
//!
//! 每轮检查：抓取页面 → [`parser`] 提取分类条目 → [`detector`] 与上次状态比较 →
//! [`notification`] 渲染并分发 → [`store`] 保存新状态。[`scheduler`] 负责循环和停机。

pub mod cli;
pub mod config;
pub mod detector;
pub mod fetcher;
pub mod model;
pub mod notification;
pub mod parser;
pub mod scheduler;
pub mod store;

pub use config::Config;
pub use detector::diff;
pub use fetcher::{FetchResponse, Fetcher, HttpFetcher};
pub use model::{Category, Delta, Item, ItemProfile, Snapshot};
pub use notification::{
    ChannelKind, ChannelSender, DispatchReport, MessageFormatter, NotificationBuilder,
    NotificationDispatcher, SendResult, SendSummary,
};
pub use parser::{clean_text, ContentParser};
pub use scheduler::{CycleOutcome, LifecycleState, PollCycle, Scheduler};
pub use store::{JsonFileStore, MemoryStore, StateStore};
