// src/cli/run.rs
//! Run / Check 命令 - 启动周期检查或只检查一次

use super::output::format_json;
use crate::config::Config;
use crate::notification::{DispatchReport, SendResult};
use crate::scheduler::{CycleOutcome, Scheduler};
use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

/// Run 命令参数
#[derive(Args)]
pub struct RunArgs {
    /// 配置文件路径（默认 ~/.config/notice-monitor/config.json）
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// 覆盖检查间隔（秒）
    #[arg(long, short)]
    pub interval: Option<u64>,

    /// 只打印消息，不发送也不保存状态
    #[arg(long)]
    pub dry_run: bool,
}

/// Check 命令参数
#[derive(Args)]
pub struct CheckArgs {
    /// 配置文件路径
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// 只打印消息，不发送也不保存状态
    #[arg(long)]
    pub dry_run: bool,

    /// 输出 JSON 格式
    #[arg(long)]
    pub json: bool,
}

/// 单个渠道的结果
#[derive(Debug, Serialize)]
pub struct ChannelOutput {
    pub channel: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sent: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Check 命令输出
#[derive(Debug, Serialize)]
pub struct CheckOutput {
    pub outcome: &'static str,
    pub new_items: usize,
    pub saved: bool,
    pub channels: Vec<ChannelOutput>,
}

impl CheckOutput {
    pub fn from_outcome(outcome: &CycleOutcome) -> Self {
        match outcome {
            CycleOutcome::FetchFailed => Self::empty("fetch_failed"),
            CycleOutcome::StateUnavailable => Self::empty("state_unavailable"),
            CycleOutcome::NoChanges => Self::empty("no_changes"),
            CycleOutcome::Dispatched {
                new_items,
                report,
                saved,
            } => Self {
                outcome: "dispatched",
                new_items: *new_items,
                saved: *saved,
                channels: channel_outputs(report),
            },
        }
    }

    fn empty(outcome: &'static str) -> Self {
        Self {
            outcome,
            new_items: 0,
            saved: false,
            channels: Vec::new(),
        }
    }
}

fn channel_outputs(report: &DispatchReport) -> Vec<ChannelOutput> {
    report
        .results
        .iter()
        .map(|(name, result)| match result {
            SendResult::Sent(summary) => ChannelOutput {
                channel: name.clone(),
                status: "sent",
                sent: Some(summary.sent),
                failed: Some(summary.failed),
                detail: None,
            },
            SendResult::Skipped(reason) => ChannelOutput {
                channel: name.clone(),
                status: "skipped",
                sent: None,
                failed: None,
                detail: Some(reason.clone()),
            },
            SendResult::Failed(error) => ChannelOutput {
                channel: name.clone(),
                status: "failed",
                sent: None,
                failed: None,
                detail: Some(error.clone()),
            },
        })
        .collect()
}

/// 处理 run 命令：启动后台循环，Ctrl-C 后按顺序停机
pub async fn handle_run(args: RunArgs) -> Result<()> {
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(interval) = args.interval {
        config.check_interval_secs = interval;
    }

    let mut scheduler = Scheduler::from_config(&config, args.dry_run)?;
    info!(
        url = %config.source_url,
        interval_secs = scheduler.interval().as_secs(),
        channels = ?scheduler.channel_names(),
        "Monitor started. Press Ctrl+C to stop."
    );
    scheduler.start()?;

    if let Err(e) = wait_for_ctrl_c(tokio::signal::ctrl_c()).await {
        // 无法监听信号时仍然释放资源，但把错误交给调用方
        if let Err(close_err) = scheduler.shutdown().await {
            warn!(error = %close_err, "Shutdown after signal error failed");
        }
        return Err(e);
    }

    scheduler.shutdown().await
}

/// 等待 Ctrl-C；注册信号失败时返回错误
async fn wait_for_ctrl_c<F>(signal: F) -> Result<()>
where
    F: std::future::Future<Output = std::io::Result<()>>,
{
    signal.await.context("Failed to listen for Ctrl+C")
}

/// 处理 check 命令：执行一轮检查后退出
pub async fn handle_check(args: CheckArgs) -> Result<()> {
    let config = Config::load(args.config.as_deref())?;
    let mut scheduler = Scheduler::from_config(&config, args.dry_run)?;

    let outcome = scheduler.run_cycle().await;
    let output = CheckOutput::from_outcome(&outcome);

    if args.json {
        println!("{}", format_json(&output));
    } else {
        println!("{}: {} new item(s)", output.outcome, output.new_items);
        for channel in &output.channels {
            match (channel.sent, channel.failed) {
                (Some(sent), Some(failed)) => {
                    println!("  {} {} (sent {}, failed {})", channel.channel, channel.status, sent, failed)
                }
                _ => println!(
                    "  {} {} ({})",
                    channel.channel,
                    channel.status,
                    channel.detail.as_deref().unwrap_or("")
                ),
            }
        }
    }

    scheduler.shutdown().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::SendSummary;

    #[tokio::test]
    async fn test_ctrl_c_registration_error_is_returned() {
        let signal = async { Err::<(), _>(std::io::Error::other("signal driver unavailable")) };
        let err = wait_for_ctrl_c(signal).await.unwrap_err();
        assert!(format!("{:#}", err).contains("signal driver unavailable"));

        assert!(wait_for_ctrl_c(async { Ok::<(), std::io::Error>(()) }).await.is_ok());
    }

    #[test]
    fn test_check_output_no_changes() {
        let output = CheckOutput::from_outcome(&CycleOutcome::NoChanges);
        assert_eq!(output.outcome, "no_changes");
        assert!(output.channels.is_empty());
    }

    #[test]
    fn test_check_output_dispatched() {
        let report = DispatchReport {
            results: vec![
                (
                    "telegram".to_string(),
                    SendResult::Sent(SendSummary {
                        attempted: 2,
                        sent: 1,
                        failed: 1,
                    }),
                ),
                ("whatsapp".to_string(), SendResult::Failed("timeout".to_string())),
            ],
        };
        let output = CheckOutput::from_outcome(&CycleOutcome::Dispatched {
            new_items: 2,
            report,
            saved: true,
        });

        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["outcome"], "dispatched");
        assert_eq!(json["channels"][0]["sent"], 1);
        assert_eq!(json["channels"][1]["status"], "failed");
        assert!(json["channels"][1].get("sent").is_none());
    }
}
