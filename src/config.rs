//! 配置 - 默认值 → JSON 配置文件 → 环境变量

use crate::notification::{TelegramConfig, WhatsAppConfig, DEFAULT_PACING};
use crate::store::JsonFileStore;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

const DEFAULT_CHECK_INTERVAL_SECS: u64 = 300;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// 运行配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 公告页面地址
    pub source_url: String,
    /// 两次检查之间的间隔（秒）
    pub check_interval_secs: u64,
    /// 同一渠道相邻消息之间的间隔（毫秒）
    pub pacing_ms: u64,
    /// HTTP 超时（秒）
    pub request_timeout_secs: u64,
    /// 状态文件路径
    pub state_path: PathBuf,
    pub telegram: Option<TelegramConfig>,
    pub whatsapp: Option<WhatsAppConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_url: String::new(),
            check_interval_secs: DEFAULT_CHECK_INTERVAL_SECS,
            pacing_ms: DEFAULT_PACING.as_millis() as u64,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            state_path: JsonFileStore::default_path(),
            telegram: None,
            whatsapp: None,
        }
    }
}

impl Config {
    /// 默认配置文件 ~/.config/notice-monitor/config.json
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("notice-monitor")
            .join("config.json")
    }

    /// 加载配置
    ///
    /// 显式指定的文件必须存在；默认位置的文件不存在时只使用默认值和环境变量。
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => {
                let default_path = Self::default_path();
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    debug!("No config file, using defaults");
                    Self::default()
                }
            }
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    /// 应用 `NMON_*` 环境变量覆盖
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = var("NMON_SOURCE_URL") {
            self.source_url = url;
        }
        if let Some(secs) = var("NMON_CHECK_INTERVAL") {
            self.check_interval_secs = secs
                .trim()
                .parse()
                .with_context(|| format!("NMON_CHECK_INTERVAL is not a number: {}", secs))?;
        }
        if let Some(ms) = var("NMON_PACING_MS") {
            self.pacing_ms = ms
                .trim()
                .parse()
                .with_context(|| format!("NMON_PACING_MS is not a number: {}", ms))?;
        }
        if let Some(path) = var("NMON_STATE_PATH") {
            self.state_path = PathBuf::from(path);
        }

        let token = var("NMON_TELEGRAM_BOT_TOKEN");
        let chat = var("NMON_TELEGRAM_CHAT_ID");
        if token.is_some() || chat.is_some() {
            let telegram = self
                .telegram
                .get_or_insert_with(|| TelegramConfig::new("", ""));
            if let Some(token) = token {
                telegram.bot_token = token;
            }
            if let Some(chat) = chat {
                telegram.chat_id = chat;
            }
        }

        let api_url = var("NMON_WHATSAPP_API_URL");
        let auth = var("NMON_WHATSAPP_AUTH_TOKEN");
        let recipient = var("NMON_WHATSAPP_RECIPIENT");
        if api_url.is_some() || auth.is_some() || recipient.is_some() {
            let whatsapp = self
                .whatsapp
                .get_or_insert_with(|| WhatsAppConfig::new("", ""));
            if let Some(url) = api_url {
                whatsapp.api_url = url;
            }
            if let Some(auth) = auth {
                whatsapp.auth_token = auth;
            }
            if let Some(recipient) = recipient {
                whatsapp.recipient = recipient;
            }
        }

        Ok(())
    }

    /// 校验必填项
    pub fn validate(&self) -> Result<()> {
        let url = self.source_url.trim();
        if url.is_empty() {
            bail!("source_url is required (set NMON_SOURCE_URL or config file)");
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            bail!("source_url must be an http(s) URL: {}", url);
        }
        if self.check_interval_secs == 0 {
            bail!("check_interval_secs must be greater than 0");
        }
        Ok(())
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// 已配置完整凭据的 Telegram
    pub fn telegram(&self) -> Option<TelegramConfig> {
        self.telegram.clone().filter(TelegramConfig::is_configured)
    }

    /// 已配置完整凭据的 WhatsApp
    pub fn whatsapp(&self) -> Option<WhatsAppConfig> {
        self.whatsapp.clone().filter(WhatsAppConfig::is_configured)
    }
}
