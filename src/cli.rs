//! 命令行参数

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Parser;

use crate::config::Config;

/// arXiv cs.IR 新论文 → 每日摘要与播客台本
#[derive(Debug, Parser)]
#[command(name = "arxiv-podcast", version)]
pub struct Cli {
    /// 运行日期（YYYYMMDD 或 YYYY-MM-DD），默认今天
    #[arg(long, value_parser = parse_run_date)]
    pub date: Option<NaiveDate>,

    /// 输出根目录
    #[arg(long)]
    pub output_root: Option<PathBuf>,

    /// 最多处理的论文数量
    #[arg(long)]
    pub max_papers: Option<usize>,

    /// 为每篇台本合成音频
    #[arg(long)]
    pub audio: bool,

    /// 同时处理的论文数量
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// 保留最近几天的输出
    #[arg(long)]
    pub keep_days: Option<u32>,

    /// TOML 配置文件
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// 显示详细日志
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// 命令行参数优先于配置文件和环境变量
    pub fn apply_to(&self, mut config: Config) -> Config {
        if let Some(root) = &self.output_root {
            config.output_root = root.clone();
        }
        if let Some(n) = self.concurrency {
            config.max_concurrent_papers = n;
        }
        if let Some(days) = self.keep_days {
            config.keep_days = Some(days);
        }
        if self.verbose {
            config.verbose_logging = true;
        }
        config
    }

    pub fn run_date(&self) -> NaiveDate {
        self.date
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }
}

/// 解析运行日期
pub fn parse_run_date(value: &str) -> Result<NaiveDate, String> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y%m%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y-%m-%d"))
        .map_err(|_| format!("无效的日期 '{}'，应为 YYYYMMDD 或 YYYY-MM-DD", value))
}
