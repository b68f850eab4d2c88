// src/cli/inspect.rs
//! Parse / State 命令 - 查看解析结果和已保存的状态

use super::output::{format_counts, format_json};
use crate::config::Config;
use crate::parser::ContentParser;
use crate::store::{JsonFileStore, StateStore};
use anyhow::{Context, Result};
use clap::Args;
use std::fs;
use std::path::PathBuf;

/// Parse 命令参数
#[derive(Args)]
pub struct ParseArgs {
    /// 保存下来的公告页面 HTML
    pub file: PathBuf,

    /// 输出 JSON 格式
    #[arg(long)]
    pub json: bool,
}

/// State 命令参数
#[derive(Args)]
pub struct StateArgs {
    /// 配置文件路径
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// 输出 JSON 格式
    #[arg(long)]
    pub json: bool,
}

/// 处理 parse 命令
pub fn handle_parse(args: ParseArgs) -> Result<()> {
    let content = fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let snapshot = ContentParser::new()?.parse(&content);

    if args.json {
        println!("{}", format_json(&snapshot));
    } else {
        println!("{}", format_counts(&snapshot));
    }
    Ok(())
}

/// 处理 state 命令
pub async fn handle_state(args: StateArgs) -> Result<()> {
    let config = Config::load(args.config.as_deref())?;
    let store = JsonFileStore::new(&config.state_path);
    let snapshot = store.load_state().await?;
    store.close().await?;

    if args.json {
        println!("{}", format_json(&snapshot));
    } else {
        println!("{}", store.path().display());
        println!("{}", format_counts(&snapshot));
    }
    Ok(())
}
