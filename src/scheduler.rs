//! 调度器 - 周期性执行 抓取 → 解析 → 比较 → 分发 → 保存
//!
//! 生命周期：`Idle → Running → Stopping → Stopped`。
//! 取消只在两次检查之间的等待处生效；正在进行的抓取或分发会执行完。
//! 停机顺序：后台循环 → 网络客户端 → 状态存储，每一步都会尝试，前一步失败不影响后一步。

use crate::config::Config;
use crate::detector::diff;
use crate::fetcher::{Fetcher, HttpFetcher};
use crate::notification::{DispatchReport, NotificationBuilder, NotificationDispatcher};
use crate::parser::ContentParser;
use crate::store::{JsonFileStore, MemoryStore, StateStore};
use anyhow::{anyhow, bail, Context, Result};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use std::path::Path;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// 调度器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    Running,
    Stopping,
    Stopped,
}

/// 单次检查的结果
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// 抓取失败（非 200 或网络错误），不分发也不保存
    FetchFailed,
    /// 无法读取上次状态，本轮跳过
    StateUnavailable,
    /// 没有新增条目
    NoChanges,
    /// 已分发
    Dispatched {
        new_items: usize,
        report: DispatchReport,
        saved: bool,
    },
}

/// 一轮检查所需的全部协作者
pub struct PollCycle {
    fetcher: Arc<dyn Fetcher>,
    store: Arc<dyn StateStore>,
    parser: ContentParser,
    dispatcher: NotificationDispatcher,
    /// 同一时间只允许一轮检查
    in_flight: Mutex<()>,
}

impl PollCycle {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        store: Arc<dyn StateStore>,
        dispatcher: NotificationDispatcher,
    ) -> Result<Self> {
        Ok(Self {
            fetcher,
            store,
            parser: ContentParser::new()?,
            dispatcher,
            in_flight: Mutex::new(()),
        })
    }

    pub fn dispatcher(&self) -> &NotificationDispatcher {
        &self.dispatcher
    }

    /// 执行一轮检查，所有错误都在这里记录并恢复
    ///
    /// 并发调用会排队，上一轮保存完成后才开始下一轮。
    pub async fn run(&self) -> CycleOutcome {
        let _guard = self.in_flight.lock().await;

        let body = match self.fetcher.fetch().await {
            Ok(response) if response.is_success() => response.body.unwrap_or_default(),
            Ok(response) => {
                error!(status = response.status, "HTTP error fetching source page");
                return CycleOutcome::FetchFailed;
            }
            Err(e) => {
                error!(error = %e, "Fetch error");
                return CycleOutcome::FetchFailed;
            }
        };

        let current = self.parser.parse(&body);

        let previous = match self.store.load_state().await {
            Ok(previous) => previous,
            Err(e) => {
                error!(error = %e, "Failed to load previous state, skipping cycle");
                return CycleOutcome::StateUnavailable;
            }
        };

        let delta = diff(&current, &previous);
        if delta.is_empty() {
            debug!(items = current.total_items(), "No new notifications");
            return CycleOutcome::NoChanges;
        }

        let new_items = delta.total_items();
        info!(new_items, "Found new notifications");
        let report = self.dispatcher.dispatch(&delta).await;

        let saved = match self.store.save_state(&current).await {
            Ok(()) => {
                info!(
                    total = current.total_items(),
                    sections = current.categories().count(),
                    "Saved state"
                );
                true
            }
            Err(e) => {
                error!(error = %e, "Failed to save state");
                false
            }
        };

        CycleOutcome::Dispatched {
            new_items,
            report,
            saved,
        }
    }
}

/// 周期调度器，独占网络客户端和状态存储
pub struct Scheduler {
    cycle: Arc<PollCycle>,
    fetcher: Arc<dyn Fetcher>,
    store: Arc<dyn StateStore>,
    interval: Duration,
    state: LifecycleState,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl Scheduler {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        store: Arc<dyn StateStore>,
        dispatcher: NotificationDispatcher,
        interval: Duration,
    ) -> Result<Self> {
        let cycle = PollCycle::new(fetcher.clone(), store.clone(), dispatcher)?;
        Ok(Self::with_cycle(cycle, fetcher, store, interval))
    }

    fn with_cycle(
        cycle: PollCycle,
        fetcher: Arc<dyn Fetcher>,
        store: Arc<dyn StateStore>,
        interval: Duration,
    ) -> Self {
        Self {
            cycle: Arc::new(cycle),
            fetcher,
            store,
            interval,
            state: LifecycleState::Idle,
            cancel: CancellationToken::new(),
            task: None,
        }
    }

    /// 根据配置创建 HTTP 客户端、抓取器、状态存储并注册渠道
    pub fn from_config(config: &Config, dry_run: bool) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!("notice-monitor/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(client.clone(), &config.source_url));
        let store = open_store(&config.state_path, dry_run)?;
        let dispatcher = NotificationBuilder::new(client)
            .pacing(config.pacing())
            .dry_run(dry_run)
            .telegram(config.telegram())
            .whatsapp(config.whatsapp())
            .build();

        let cycle = PollCycle::new(fetcher.clone(), store.clone(), dispatcher)?;
        Ok(Self::with_cycle(cycle, fetcher, store, config.check_interval()))
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.cycle.dispatcher().channel_names()
    }

    /// 立即执行一轮检查（不经过后台循环）
    ///
    /// 后台循环正在检查时会等它结束再执行。
    pub async fn run_cycle(&self) -> CycleOutcome {
        self.cycle.run().await
    }

    /// 启动后台循环
    pub fn start(&mut self) -> Result<()> {
        if self.state != LifecycleState::Idle {
            bail!("scheduler cannot start from {:?}", self.state);
        }

        let cycle = self.cycle.clone();
        let cancel = self.cancel.clone();
        let interval = self.interval;
        self.task = Some(tokio::spawn(run_loop(cycle, interval, cancel)));
        self.state = LifecycleState::Running;

        info!(interval_secs = interval.as_secs(), "Scheduler started");
        Ok(())
    }

    /// 停机：取消循环并等待其结束，然后关闭网络客户端和状态存储
    ///
    /// 每一步都会执行；返回遇到的第一个错误。重复调用无副作用。
    pub async fn shutdown(&mut self) -> Result<()> {
        if self.state == LifecycleState::Stopped {
            return Ok(());
        }
        self.state = LifecycleState::Stopping;
        info!("Scheduler stopping");

        let mut first_error: Option<anyhow::Error> = None;

        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Poll loop ended abnormally");
                first_error.get_or_insert(anyhow!("poll loop: {}", e));
            }
        }

        if let Err(e) = self.fetcher.close().await {
            warn!(error = %e, "Failed to close HTTP client");
            first_error.get_or_insert(e.context("close HTTP client"));
        }

        if let Err(e) = self.store.close().await {
            warn!(error = %e, "Failed to close state store");
            first_error.get_or_insert(e.context("close state store"));
        }

        self.state = LifecycleState::Stopped;
        info!("Scheduler stopped");

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// 打开状态存储
///
/// dry-run 使用以状态文件内容为初始值的内存存储，状态文件不会被改写。
fn open_store(path: &Path, dry_run: bool) -> Result<Arc<dyn StateStore>> {
    if !dry_run {
        return Ok(Arc::new(JsonFileStore::new(path)));
    }

    let previous = JsonFileStore::read_snapshot(path)?;
    info!(
        path = %path.display(),
        items = previous.total_items(),
        "[DRY-RUN] State kept in memory"
    );
    Ok(Arc::new(MemoryStore::with_state(previous)))
}

/// 后台循环：检查一轮后等待 `interval`，等待期间可被取消
async fn run_loop(cycle: Arc<PollCycle>, interval: Duration, cancel: CancellationToken) {
    loop {
        let outcome = cycle.run().await;
        debug!(?outcome, "Cycle finished");

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Poll loop cancelled");
                break;
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }
}
