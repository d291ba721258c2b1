use std::process::ExitCode;

use anyhow::{Context, Result};
use arxiv_podcast::cli::Cli;
use arxiv_podcast::models::{RunContext, RunOutcome};
use arxiv_podcast::utils::logging;
use arxiv_podcast::{App, Config};
use clap::Parser;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(RunOutcome::Fatal) => ExitCode::FAILURE,
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ 启动失败: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<RunOutcome> {
    // 读取 .env（可选）
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // 加载配置
    let config = Config::load(cli.config.as_deref())
        .await
        .context("无法加载配置")?;
    let config = cli.apply_to(config);

    // 初始化日志
    logging::init(config.verbose_logging);

    let ctx = RunContext::new(cli.run_date(), config.output_root.clone())
        .with_max_papers(cli.max_papers)
        .with_audio(cli.audio);

    // 初始化并运行应用
    let app = App::initialize(config).await?;
    let result = app.run(&ctx).await;

    Ok(result.outcome())
}
