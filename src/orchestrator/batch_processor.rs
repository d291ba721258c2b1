//! 应用入口 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：校验配置、加载提示词、创建网络客户端
//! 2. **资源管理**：唯一持有抓取、生成、语音合成能力的模块
//! 3. **运行前清理**：配置了 `keep_days` 时删除过期的日期目录
//! 4. **全局统计**：运行结束后输出写入的产物和失败明细
//!
//! 具体的阶段顺序和失败策略由 `pipeline` 负责

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::{Config, Prompts};
use crate::infrastructure::{
    GeminiSpeech, HttpFetcher, OpenAiGenerator, SpeechSynthesizer, TextFetcher, TextGenerator,
};
use crate::models::{RunContext, RunResult};
use crate::orchestrator::pipeline::Pipeline;
use crate::services::OutputStore;
use crate::utils::logging::{log_startup, print_final_stats};
use crate::workflow::{
    AudioSynthesis, GenerationSettings, ListingFetch, PaperFetch, PaperFlow, RetryPolicy,
    ScriptGenerate, StageRunner, SummarizeSelect,
};

/// 外部能力集合
///
/// 真实运行时由 `App::initialize` 创建，测试时可注入替身
#[derive(Clone)]
pub struct Capabilities {
    pub fetcher: Arc<dyn TextFetcher>,
    pub generator: Arc<dyn TextGenerator>,
    pub speech: Option<Arc<dyn SpeechSynthesizer>>,
}

/// 应用主结构
pub struct App {
    config: Config,
    store: OutputStore,
    pipeline: Pipeline,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        config.validate().context("配置校验失败")?;

        let prompts = config.load_prompts().await;

        let fetcher = HttpFetcher::new(config.http_timeout()).context("无法创建 HTTP 客户端")?;
        let generator = OpenAiGenerator::new(&config.llm_api_key, &config.llm_api_base_url);
        let speech = GeminiSpeech::new(
            &config.llm_api_key,
            &config.tts_api_base_url,
            &config.tts_model,
            config.llm_timeout(),
        )
        .context("无法创建语音合成客户端")?;

        let capabilities = Capabilities {
            fetcher: Arc::new(fetcher),
            generator: Arc::new(generator),
            speech: Some(Arc::new(speech)),
        };

        Ok(Self::with_capabilities(config, prompts, capabilities))
    }

    /// 用给定的能力组装应用
    pub fn with_capabilities(config: Config, prompts: Prompts, capabilities: Capabilities) -> Self {
        let base_policy = RetryPolicy {
            max_attempts: config.max_attempts,
            initial_backoff: config.initial_backoff(),
            max_backoff: config.max_backoff(),
            timeout: config.http_timeout(),
        };
        let fetch_runner = StageRunner::new(base_policy.clone());
        let llm_runner = StageRunner::new(base_policy.with_timeout(config.llm_timeout()));

        let store = OutputStore::new();

        let listing_fetch = ListingFetch::new(capabilities.fetcher.clone(), fetch_runner.clone());
        let summarize_select = SummarizeSelect::new(
            capabilities.generator.clone(),
            llm_runner.clone(),
            GenerationSettings {
                system_prompt: prompts.summary,
                model: config.summary_model.clone(),
                temperature: config.summary_temperature,
            },
        );
        let paper_fetch = PaperFetch::new(capabilities.fetcher, fetch_runner);
        let script_generate = ScriptGenerate::new(
            capabilities.generator,
            llm_runner.clone(),
            GenerationSettings {
                system_prompt: prompts.podcast,
                model: config.script_model.clone(),
                temperature: config.script_temperature,
            },
        );
        let audio = capabilities
            .speech
            .map(|speech| AudioSynthesis::new(speech, llm_runner, config.tts_model.clone()));

        let paper_flow = PaperFlow::new(paper_fetch, script_generate, audio, store.clone());
        let pipeline = Pipeline::new(
            listing_fetch,
            summarize_select,
            paper_flow,
            store.clone(),
            config.listing_url.clone(),
            config.max_concurrent_papers,
        );

        Self {
            config,
            store,
            pipeline,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 运行应用主逻辑
    pub async fn run(&self, ctx: &RunContext) -> RunResult {
        log_startup(ctx, self.config.max_concurrent_papers);

        if let Some(keep_days) = self.config.keep_days {
            self.prune(ctx, keep_days).await;
        }

        let result = self.pipeline.run(ctx).await;

        // 输出最终统计
        print_final_stats(&result);

        result
    }

    /// 清理过期目录，失败只记警告
    async fn prune(&self, ctx: &RunContext, keep_days: u32) {
        info!("🧹 清理 {} 天前的输出...", keep_days);
        match self
            .store
            .prune_old_runs(ctx.output_root(), ctx.run_date(), keep_days)
            .await
        {
            Ok(removed) if removed.is_empty() => info!("✓ 没有需要清理的目录"),
            Ok(removed) => info!("✓ 已清理 {} 个过期目录", removed.len()),
            Err(e) => warn!("⚠️ 清理过期目录失败: {}", e),
        }
    }
}
