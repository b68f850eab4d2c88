//! 状态存储 - 保存上一次成功分发时的快照

use crate::model::Snapshot;
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tracing::debug;

/// 快照存储
#[async_trait]
pub trait StateStore: Send + Sync {
    /// 读取上次保存的快照；首次运行返回空快照
    async fn load_state(&self) -> Result<Snapshot>;

    async fn save_state(&self, snapshot: &Snapshot) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

/// 状态文件内容
#[derive(Debug, Serialize, Deserialize)]
struct StateFile {
    saved_at: DateTime<Utc>,
    sections: Snapshot,
}

/// 本地 JSON 文件存储（带文件锁，原子替换）
pub struct JsonFileStore {
    path: PathBuf,
    closed: AtomicBool,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            closed: AtomicBool::new(false),
        }
    }

    /// 默认路径 ~/.config/notice-monitor/state.json
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("notice-monitor")
            .join("state.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            bail!("state store is closed");
        }
        Ok(())
    }

    /// 同步读取状态文件，文件不存在时返回空快照
    pub(crate) fn read_snapshot(path: &Path) -> Result<Snapshot> {
        if !path.exists() {
            debug!(path = %path.display(), "No previous state, starting empty");
            return Ok(Snapshot::empty());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let state: StateFile = serde_json::from_str(&content)
            .with_context(|| format!("Corrupt state file {}", path.display()))?;
        Ok(state.sections)
    }

    fn write(path: &Path, snapshot: Snapshot) -> Result<()> {
        use fs2::FileExt;

        // 确保目录存在
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let lock_path = path.with_extension("lock");
        let lock = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)?;
        lock.lock_exclusive()?;

        let state = StateFile {
            saved_at: Utc::now(),
            sections: snapshot,
        };

        // 写入临时文件后原子替换
        let temp_path = path.with_extension("tmp");
        let result = (|| -> Result<()> {
            let mut temp_file = File::create(&temp_path)?;
            temp_file.write_all(serde_json::to_string_pretty(&state)?.as_bytes())?;
            temp_file.sync_all()?;
            fs::rename(&temp_path, path)?;
            Ok(())
        })();

        FileExt::unlock(&lock)?;
        result
    }
}

#[async_trait]
impl StateStore for JsonFileStore {
    async fn load_state(&self) -> Result<Snapshot> {
        self.ensure_open()?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || Self::read_snapshot(&path))
            .await
            .map_err(|e| anyhow!("state load task failed: {}", e))?
    }

    async fn save_state(&self, snapshot: &Snapshot) -> Result<()> {
        self.ensure_open()?;
        let path = self.path.clone();
        let snapshot = snapshot.clone();
        tokio::task::spawn_blocking(move || Self::write(&path, snapshot))
            .await
            .map_err(|e| anyhow!("state save task failed: {}", e))?
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// 内存存储（dry-run 和测试使用）
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<Option<Snapshot>>,
    saves: Mutex<usize>,
    closed: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以已有快照作为上次状态
    pub fn with_state(snapshot: Snapshot) -> Self {
        Self {
            state: Mutex::new(Some(snapshot)),
            ..Self::default()
        }
    }

    /// 当前保存的快照
    pub fn snapshot(&self) -> Option<Snapshot> {
        self.state.lock().ok().and_then(|s| s.clone())
    }

    pub fn save_count(&self) -> usize {
        self.saves.lock().map(|n| *n).unwrap_or(0)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn load_state(&self) -> Result<Snapshot> {
        if self.is_closed() {
            bail!("state store is closed");
        }
        let state = self.state.lock().map_err(|_| anyhow!("state lock poisoned"))?;
        Ok(state.clone().unwrap_or_default())
    }

    async fn save_state(&self, snapshot: &Snapshot) -> Result<()> {
        if self.is_closed() {
            bail!("state store is closed");
        }
        *self.state.lock().map_err(|_| anyhow!("state lock poisoned"))? = Some(snapshot.clone());
        *self.saves.lock().map_err(|_| anyhow!("state lock poisoned"))? += 1;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
