//! Notice Monitor CLI
//!
//! 监控公告页面，把新增公告推送到 Telegram / WhatsApp

use anyhow::Result;
use clap::{Parser, Subcommand};
use notice_monitor::cli::{
    handle_check, handle_parse, handle_run, handle_state, CheckArgs, ParseArgs, RunArgs,
    StateArgs,
};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "nmon")]
#[command(about = "Notice Monitor - 监控公告页面并推送新增公告")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 周期检查并推送，Ctrl+C 停止
    Run(RunArgs),
    /// 只检查一次
    Check(CheckArgs),
    /// 解析本地保存的页面
    Parse(ParseArgs),
    /// 查看已保存的状态
    State(StateArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化 tracing 日志系统
    // 通过 RUST_LOG 环境变量控制日志级别，默认为 info
    // 例如: RUST_LOG=debug nmon run
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("notice_monitor=info,nmon=info"));

    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => handle_run(args).await,
        Commands::Check(args) => handle_check(args).await,
        Commands::Parse(args) => handle_parse(args),
        Commands::State(args) => handle_state(args).await,
    }
}
