/// 日志工具模块
///
/// 提供日志初始化和格式化输出的辅助函数
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::models::{RunContext, RunOutcome, RunResult};

/// 初始化 tracing 订阅者
///
/// 设置了 `RUST_LOG` 时以其为准；否则默认 info，`verbose` 时为 debug。
/// 重复调用不会报错
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(ctx: &RunContext, max_concurrent: usize) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - arXiv 论文播客生成");
    info!("📅 运行日期: {}", ctx.run_date());
    info!("📁 输出目录: {}", ctx.run_dir().display());
    info!("📊 最大并发数: {}", max_concurrent);
    if let Some(max) = ctx.max_papers() {
        info!("🔢 最多处理: {} 篇", max);
    }
    if ctx.synthesize_audio() {
        info!("🔊 已启用语音合成");
    }
    info!("{}", "=".repeat(60));
}

/// 打印最终统计信息
pub fn print_final_stats(result: &RunResult) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));

    if let Some(path) = &result.summary_path {
        info!("📝 摘要: {}", path.display());
    }
    info!(
        "✅ 台本: {}/{}",
        result.scripts_written.len(),
        result.selected_papers.len()
    );
    for (identifier, path) in &result.scripts_written {
        info!("   {} → {}", identifier, path.display());
    }
    if !result.audio_written.is_empty() {
        info!("🔊 音频: {}", result.audio_written.len());
        for (identifier, path) in &result.audio_written {
            info!("   {} → {}", identifier, path.display());
        }
    }

    for warning in &result.warnings {
        warn!("⚠️ {}", warning);
    }

    match result.outcome() {
        RunOutcome::Success => info!("🎉 运行成功"),
        RunOutcome::PartialSuccess => {
            warn!("⚠️ 部分论文处理失败: {} 条", result.failures.len());
            for failure in &result.failures {
                warn!("   {}", failure);
            }
        }
        RunOutcome::Fatal => {
            if let Some(failure) = result.fatal_failure() {
                error!("❌ 运行中止: {}", failure);
            }
        }
    }
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
